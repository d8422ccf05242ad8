//! Parser for Instagram data-export ZIP archives and JSON files

use crate::error::CheckError;
use crate::resolver::{CheckResult, FollowSets, UsernameSet};
use serde_json::Value;
use std::io::{Cursor, Read};
use tracing::{debug, error};
use zip::result::ZipError;
use zip::ZipArchive;

/// Nested record list used by current export schemas
const STRING_LIST_KEY: &str = "string_list_data";

/// Kind of uploaded export file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Zip,
    Json,
}

impl ExportKind {
    /// Detect the kind from a file name extension (case-insensitive)
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".zip") {
            Some(ExportKind::Zip)
        } else if lower.ends_with(".json") {
            Some(ExportKind::Json)
        } else {
            None
        }
    }
}

/// Which accumulator an entry or key contributes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    Followers,
    Following,
}

/// Parser for export payloads
pub struct ExportParser;

impl ExportParser {
    /// Parse an upload of the given kind and compare the result
    pub fn parse(bytes: &[u8], kind: ExportKind) -> CheckResult {
        match kind {
            ExportKind::Zip => Self::parse_archive(bytes),
            ExportKind::Json => Self::parse_single_file(bytes),
        }
    }

    /// Parse a full ZIP archive
    pub fn parse_archive(bytes: &[u8]) -> CheckResult {
        Ok(Self::archive_sets(bytes)?.resolve())
    }

    /// Parse a single JSON file
    pub fn parse_single_file(bytes: &[u8]) -> CheckResult {
        Ok(Self::single_file_sets(bytes)?.resolve())
    }

    /// Read follower/following sets from a ZIP archive.
    ///
    /// Entries are matched by file name: anything containing `followers` and
    /// ending in `.json` feeds the followers side, anything containing
    /// `following` feeds the following side.
    pub fn archive_sets(bytes: &[u8]) -> Result<FollowSets, CheckError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
            debug!("Rejecting archive: {}", e);
            CheckError::BadArchive
        })?;

        let mut followers_data = Vec::new();
        let mut following_data = Vec::new();

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index).map_err(archive_error)?;
            let lower = entry.name().to_lowercase();
            // match on the file name only; exports nest both lists under
            // a `followers_and_following/` directory
            let file_name = lower.rsplit('/').next().unwrap_or_default();
            if !file_name.ends_with(".json") {
                continue;
            }

            let relation = if file_name.contains("followers") {
                Relation::Followers
            } else if file_name.contains("following") {
                Relation::Following
            } else {
                continue;
            };

            let mut raw = Vec::new();
            entry
                .read_to_end(&mut raw)
                .map_err(|e| archive_error(ZipError::Io(e)))?;
            let payload: Value = serde_json::from_slice(&raw).map_err(|e| {
                debug!("Invalid JSON in archive entry {}: {}", lower, e);
                CheckError::InvalidPayload
            })?;

            let target = match relation {
                Relation::Followers => &mut followers_data,
                Relation::Following => &mut following_data,
            };
            collect_items(payload, relation, target);
        }

        Self::finish(&followers_data, &following_data)
    }

    /// Read follower/following sets from one JSON file.
    ///
    /// A keyed object is split by key name. A bare array is a legacy
    /// followers file, so the following side stays empty.
    pub fn single_file_sets(bytes: &[u8]) -> Result<FollowSets, CheckError> {
        let payload: Value = serde_json::from_slice(bytes).map_err(|e| {
            debug!("Invalid JSON upload: {}", e);
            CheckError::InvalidPayload
        })?;

        let mut followers_data = Vec::new();
        let mut following_data = Vec::new();

        match payload {
            Value::Object(map) => {
                for (key, value) in map {
                    let Value::Array(items) = value else {
                        continue;
                    };
                    match relation_for_key(&key) {
                        Some(Relation::Followers) => followers_data.extend(items),
                        Some(Relation::Following) => following_data.extend(items),
                        None => {}
                    }
                }
            }
            Value::Array(items) => followers_data = items,
            _ => {}
        }

        Self::finish(&followers_data, &following_data)
    }

    fn finish(followers_data: &[Value], following_data: &[Value]) -> Result<FollowSets, CheckError> {
        let followers = extract_usernames(followers_data);
        let following = extract_usernames(following_data);

        if followers.is_empty() && following.is_empty() {
            return Err(CheckError::EmptyExport);
        }

        Ok(FollowSets {
            followers,
            following,
        })
    }
}

fn archive_error(err: ZipError) -> CheckError {
    error!("Error reading export archive: {}", err);
    CheckError::BadArchive
}

fn relation_for_key(key: &str) -> Option<Relation> {
    let lower = key.to_lowercase();
    if lower.contains("follower") {
        Some(Relation::Followers)
    } else if lower.contains("following") {
        Some(Relation::Following)
    } else {
        None
    }
}

/// Accumulate list items from one archive entry payload
fn collect_items(payload: Value, relation: Relation, target: &mut Vec<Value>) {
    match payload {
        Value::Array(items) => target.extend(items),
        Value::Object(map) => {
            for (key, value) in map {
                if relation_for_key(&key) != Some(relation) {
                    continue;
                }
                if let Value::Array(items) = value {
                    target.extend(items);
                }
            }
        }
        _ => {}
    }
}

/// Extract usernames from plain strings or `string_list_data` records
fn extract_usernames(items: &[Value]) -> UsernameSet {
    let mut usernames = UsernameSet::new();

    for item in items {
        match item {
            Value::String(name) => {
                usernames.insert(name.clone());
            }
            Value::Object(map) => {
                let Some(Value::Array(records)) = map.get(STRING_LIST_KEY) else {
                    continue;
                };
                for record in records {
                    if let Some(value) = record.get("value").and_then(Value::as_str) {
                        if !value.is_empty() {
                            usernames.insert(value.to_string());
                        }
                    }
                }
            }
            _ => {}
        }
    }

    usernames
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    /// Build an in-memory ZIP with the given entries
    fn build_zip(files: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, content) in files {
            writer.start_file(name.to_string(), options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_export_kind_from_file_name() {
        assert_eq!(ExportKind::from_file_name("data.ZIP"), Some(ExportKind::Zip));
        assert_eq!(ExportKind::from_file_name("followers_1.json"), Some(ExportKind::Json));
        assert_eq!(ExportKind::from_file_name("notes.txt"), None);
    }

    #[test]
    fn test_parse_archive_legacy_flat_lists() {
        let bytes = build_zip(&[
            ("followers_1.json", r#"["alice","bob"]"#),
            ("following.json", r#"["alice","bob","carol"]"#),
        ]);
        let report = ExportParser::parse_archive(&bytes).unwrap();
        assert_eq!(report.followers_count, 2);
        assert_eq!(report.following_count, 3);
        assert_eq!(report.unfollowers, vec!["carol"]);
        assert_eq!(report.unfollowers_count, 1);
    }

    #[test]
    fn test_parse_archive_keyed_string_list_data() {
        let followers = r#"[
            {"title": "", "string_list_data": [{"href": "https://www.instagram.com/alice", "value": "alice", "timestamp": 1}]},
            {"title": "", "string_list_data": [{"href": "https://www.instagram.com/dave", "value": "dave", "timestamp": 2}]}
        ]"#;
        let following = r#"{"relationships_following": [
            {"title": "", "string_list_data": [{"value": "alice"}]},
            {"title": "", "string_list_data": [{"value": "zed"}, {"value": ""}]}
        ]}"#;
        let bytes = build_zip(&[
            ("connections/followers_and_following/followers_1.json", followers),
            ("connections/followers_and_following/FOLLOWING.JSON", following),
            ("connections/followers_and_following/close_friends.json", r#"["ignored"]"#),
        ]);
        let report = ExportParser::parse_archive(&bytes).unwrap();
        assert_eq!(report.followers_count, 2);
        assert_eq!(report.following_count, 2);
        assert_eq!(report.unfollowers, vec!["zed"]);
    }

    #[test]
    fn test_parse_archive_merges_split_followers_files() {
        let bytes = build_zip(&[
            ("followers_1.json", r#"["a","b"]"#),
            ("followers_2.json", r#"["b","c"]"#),
            ("following.json", r#"["a","b","c","d"]"#),
        ]);
        let report = ExportParser::parse_archive(&bytes).unwrap();
        assert_eq!(report.followers_count, 3);
        assert_eq!(report.unfollowers, vec!["d"]);
    }

    #[test]
    fn test_parse_archive_same_sets_no_unfollowers() {
        let bytes = build_zip(&[
            ("followers_1.json", r#"["a","b","c"]"#),
            ("following.json", r#"["c","b","a"]"#),
        ]);
        let report = ExportParser::parse_archive(&bytes).unwrap();
        assert_eq!(report.unfollowers_count, 0);
    }

    #[test]
    fn test_parse_archive_malformed_zip() {
        let result = ExportParser::parse_archive(b"PK\x03\x04 definitely not a zip");
        assert_eq!(result, Err(CheckError::BadArchive));
    }

    #[test]
    fn test_parse_archive_invalid_json_entry() {
        let bytes = build_zip(&[("followers_1.json", "{not json")]);
        assert_eq!(ExportParser::parse_archive(&bytes), Err(CheckError::InvalidPayload));
    }

    #[test]
    fn test_parse_archive_without_relationship_files() {
        let bytes = build_zip(&[("messages/inbox.json", r#"["alice"]"#)]);
        assert_eq!(ExportParser::parse_archive(&bytes), Err(CheckError::EmptyExport));
    }

    #[test]
    fn test_parse_single_file_keyed_object() {
        let payload = br#"{
            "relationships_followers": ["b"],
            "relationships_following": ["a", "b", "c"]
        }"#;
        let report = ExportParser::parse_single_file(payload).unwrap();
        assert_eq!(report.unfollowers, vec!["a", "c"]);
    }

    #[test]
    fn test_parse_single_file_bare_array_is_followers_only() {
        let report = ExportParser::parse_single_file(br#"["a","b"]"#).unwrap();
        assert_eq!(report.followers_count, 2);
        assert_eq!(report.following_count, 0);
        assert!(report.unfollowers.is_empty());
    }

    #[test]
    fn test_parse_single_file_empty() {
        assert_eq!(ExportParser::parse_single_file(b"{}"), Err(CheckError::EmptyExport));
        assert_eq!(
            ExportParser::parse_single_file(br#"{"relationships_followers": [], "relationships_following": []}"#),
            Err(CheckError::EmptyExport)
        );
    }

    #[test]
    fn test_parse_single_file_invalid_json() {
        assert_eq!(ExportParser::parse_single_file(b"[\"a\","), Err(CheckError::InvalidPayload));
    }

    #[test]
    fn test_parse_dispatches_on_kind() {
        let bytes = build_zip(&[("following.json", r#"["x"]"#)]);
        let report = ExportParser::parse(&bytes, ExportKind::Zip).unwrap();
        assert_eq!(report.unfollowers, vec!["x"]);
        assert_eq!(
            ExportParser::parse(&bytes, ExportKind::Json),
            Err(CheckError::InvalidPayload)
        );
    }
}
