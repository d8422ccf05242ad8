//! Instagram module for the automated acquisition path
//!
//! This module provides functionality for:
//! - The typed boundary to the Instagram private API capability
//! - A reqwest-backed web adapter for that capability
//! - The shared, lazily authenticated session routed through the proxy pool

pub mod client;
pub mod session;
pub mod web;

pub use client::{ClientError, Credentials, InstagramApi, InstagramConnector, UserProfile};
pub use session::{InstagramService, SessionConfig};
pub use web::{WebClientConfig, WebInstagramConnector};
