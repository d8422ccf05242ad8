//! Export module for Instagram "Download Your Information" data
//!
//! This module provides functionality for:
//! - Reading ZIP archives and single JSON files from the data export
//! - Normalizing legacy flat lists and keyed `string_list_data` records
//! - Producing the same follower/following sets as the live path

pub mod parser;

pub use parser::{ExportKind, ExportParser};
