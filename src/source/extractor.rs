//! Snapshot extraction
//!
//! Turns the entries listed under a facility prefix into a flat property map
//! keyed by the part of each key that follows the prefix.

use crate::consul::{KvClient, RawEntry};
use crate::error::{ConsulError, SourceError};
use crate::utils::skip_chars;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::collections::HashMap;
use std::string::FromUtf8Error;

/// Path separator of the KV namespace
pub const PATH_SEPARATOR: char = '/';

/// Full, point-in-time view of a facility: local key name to decoded value
pub type Snapshot = HashMap<String, String>;

#[derive(Debug, thiserror::Error)]
enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("value is not valid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

/// Number of leading characters to drop from a listed key so that only its
/// local name, without a leading separator, remains.
///
/// Consul keys never start with a separator, so a prefix that does already
/// accounts for the separator that follows it in listed keys.
pub fn strip_length(prefix: &str) -> usize {
    let mut length = prefix.chars().count();
    if !prefix.starts_with(PATH_SEPARATOR) {
        length += 1;
    }
    if prefix.ends_with(PATH_SEPARATOR) {
        length -= 1;
    }
    length
}

/// Whether `key` lies inside the namespace `prefix`.
///
/// A recursive listing matches on raw text, so `app` also lists `apple/x`.
/// Only the prefix itself and keys below `prefix/` belong to it; the root
/// prefix holds every key.
pub fn within_prefix(key: &str, prefix: &str) -> bool {
    let base = prefix.trim_matches(PATH_SEPARATOR);
    if base.is_empty() {
        return true;
    }
    match key.strip_prefix(base) {
        Some(rest) => rest.is_empty() || rest.starts_with(PATH_SEPARATOR),
        None => false,
    }
}

/// List `prefix` through `client` and build a snapshot from the result.
///
/// Keys outside the namespace are dropped. Transport and protocol errors
/// from the list call are returned as is; the caller decides whether to
/// fail over.
pub async fn extract<C>(
    client: &C,
    prefix: &str,
    strip_length: usize,
) -> Result<Snapshot, ConsulError>
where
    C: KvClient + ?Sized,
{
    let entries = client.list(prefix).await?.into_iter().filter(|entry| {
        let inside = within_prefix(&entry.key, prefix);
        if !inside {
            tracing::debug!(key = %entry.key, prefix = %prefix, "Skipping key of a sibling namespace");
        }
        inside
    });
    Ok(build_snapshot(entries, strip_length))
}

/// Build a snapshot from listed entries.
///
/// Directory markers are dropped. Entries whose value cannot be decoded, or
/// whose key is shorter than `strip_length`, are skipped with a warning.
/// On duplicate local keys the last entry wins.
pub fn build_snapshot<I>(entries: I, strip_length: usize) -> Snapshot
where
    I: IntoIterator<Item = RawEntry>,
{
    let mut snapshot = Snapshot::new();

    for entry in entries {
        if entry.key.ends_with(PATH_SEPARATOR) {
            continue;
        }

        let Some(local_key) = skip_chars(&entry.key, strip_length) else {
            tracing::warn!(key = %entry.key, strip_length, "Skipping key outside of facility");
            continue;
        };

        match decode_value(entry.value.as_deref()) {
            Ok(value) => {
                snapshot.insert(local_key.to_string(), value);
            }
            Err(e) => {
                tracing::warn!(key = %entry.key, error = %e, "Skipping undecodable value");
            }
        }
    }

    snapshot
}

fn decode_value(encoded: Option<&str>) -> Result<String, DecodeError> {
    let Some(encoded) = encoded else {
        return Ok(String::new());
    };
    let bytes = BASE64.decode(encoded)?;
    Ok(String::from_utf8(bytes)?)
}

/// Extractor bound to one facility prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotExtractor {
    prefix: String,
    strip_length: usize,
}

impl SnapshotExtractor {
    /// Create an extractor for `prefix`, which must not be empty
    pub fn new(prefix: impl Into<String>) -> Result<Self, SourceError> {
        let prefix = prefix.into();
        if prefix.is_empty() {
            return Err(SourceError::EmptyFacility);
        }
        Ok(Self {
            strip_length: strip_length(&prefix),
            prefix,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn strip_length(&self) -> usize {
        self.strip_length
    }

    pub async fn extract<C>(&self, client: &C) -> Result<Snapshot, ConsulError>
    where
        C: KvClient + ?Sized,
    {
        extract(client, &self.prefix, self.strip_length).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::{MockStore, Reply};

    const FACILITY: &str = "testFacility";

    fn encoded(value: &str) -> Option<String> {
        Some(BASE64.encode(value.as_bytes()))
    }

    fn entry(key: &str, value: &str) -> RawEntry {
        RawEntry::new(key, encoded(value))
    }

    #[test]
    fn test_strip_length() {
        assert_eq!(strip_length("testFacility"), 13);
        assert_eq!(strip_length("testFacility/"), 13);
        assert_eq!(strip_length("/testFacility"), 13);
        assert_eq!(strip_length("/testFacility/"), 13);
        assert_eq!(strip_length("/"), 0);
        assert_eq!(strip_length("a/b"), 4);
    }

    #[test]
    fn test_empty_facility_is_rejected() {
        assert_eq!(SnapshotExtractor::new(""), Err(SourceError::EmptyFacility));
    }

    #[test]
    fn test_facility_scenario() {
        let entries = vec![
            entry("testFacility/key.int", "10"),
            entry("testFacility/key.string", "Some String"),
            entry("testFacility/key.bool", "false"),
        ];

        let snapshot = build_snapshot(entries, strip_length(FACILITY));

        let expected: Snapshot = [
            ("key.int", "10"),
            ("key.string", "Some String"),
            ("key.bool", "false"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(snapshot, expected);
    }

    #[test]
    fn test_root_prefix_keeps_keys() {
        let entries = vec![
            entry("key.int", "10"),
            entry("user-service.lab.config", "enabled"),
        ];

        let snapshot = build_snapshot(entries, strip_length("/"));

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["key.int"], "10");
        assert_eq!(snapshot["user-service.lab.config"], "enabled");
    }

    #[test]
    fn test_directory_markers_are_dropped_anywhere() {
        let entries = vec![
            RawEntry::new("testFacility/", None),
            entry("testFacility/a", "1"),
            RawEntry::new("testFacility/nested/", None),
            entry("testFacility/nested/b", "2"),
            entry("testFacility/dir-with-value/", "ignored"),
        ];

        let snapshot = build_snapshot(entries, strip_length(FACILITY));

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["a"], "1");
        assert_eq!(snapshot["nested/b"], "2");
    }

    #[test]
    fn test_undecodable_entries_are_skipped() {
        let entries = vec![
            RawEntry::new("testFacility/bad.base64", Some("***".to_string())),
            RawEntry::new(
                "testFacility/bad.utf8",
                Some(BASE64.encode([0xff, 0xfe, 0xfd])),
            ),
            entry("testFacility/good", "value"),
        ];

        let snapshot = build_snapshot(entries, strip_length(FACILITY));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot["good"], "value");
    }

    #[test]
    fn test_null_value_is_empty_string() {
        let entries = vec![RawEntry::new("testFacility/flag", None)];
        let snapshot = build_snapshot(entries, strip_length(FACILITY));
        assert_eq!(snapshot["flag"], "");
    }

    #[test]
    fn test_key_shorter_than_prefix_is_skipped() {
        let entries = vec![entry("testFacility", "self"), entry("testFacility/x", "1")];
        let snapshot = build_snapshot(entries, strip_length(FACILITY));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot["x"], "1");
    }

    #[test]
    fn test_last_entry_wins_on_collision() {
        // Consul never lists a key twice; iteration order decides if it does
        let entries = vec![entry("app/key", "first"), entry("app/key", "second")];
        let snapshot = build_snapshot(entries, strip_length("app"));
        assert_eq!(snapshot["key"], "second");
    }

    #[test]
    fn test_values_round_trip() {
        let values = ["", "plain", "multi\nline", "ünïcødé ✓", "  padded  ", "{\"json\":true}"];
        let entries: Vec<RawEntry> = values
            .iter()
            .enumerate()
            .map(|(i, v)| entry(&format!("testFacility/k{i}"), v))
            .collect();

        let snapshot = build_snapshot(entries, strip_length(FACILITY));

        for (i, value) in values.iter().enumerate() {
            assert_eq!(snapshot[&format!("k{i}")], *value);
        }
    }

    #[tokio::test]
    async fn test_extract_empty_namespace() {
        let store = MockStore::new();
        store.add_node("consul-1", Reply::Ok(Vec::new()));
        let client = store.client("consul-1");

        let extractor = SnapshotExtractor::new(FACILITY).unwrap();
        let snapshot = extractor.extract(&client).await.unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_within_prefix() {
        assert!(within_prefix("app/key", "app"));
        assert!(within_prefix("app/key", "/app/"));
        assert!(within_prefix("app/nested/key", "app"));
        assert!(within_prefix("app", "app"));
        assert!(!within_prefix("apple/key", "app"));
        assert!(!within_prefix("application", "app"));
        assert!(within_prefix("anything/at/all", "/"));
        assert!(within_prefix("a/b/c", "a/b"));
        assert!(!within_prefix("a/bc/d", "a/b/"));
    }

    #[tokio::test]
    async fn test_extract_drops_sibling_namespaces() {
        let store = MockStore::new();
        store.add_node(
            "consul-1",
            Reply::Ok(vec![
                entry("app/key", "mine"),
                entry("apple/x", "sibling"),
                entry("application", "sibling"),
            ]),
        );
        let client = store.client("consul-1");

        let extractor = SnapshotExtractor::new("app").unwrap();
        let snapshot = extractor.extract(&client).await.unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot["key"], "mine");
    }

    #[tokio::test]
    async fn test_extract_propagates_transport_error() {
        let store = MockStore::new();
        store.add_node("consul-1", Reply::Transport);
        let client = store.client("consul-1");

        let extractor = SnapshotExtractor::new(FACILITY).unwrap();
        let err = extractor.extract(&client).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(store.list_calls("consul-1"), vec![FACILITY.to_string()]);
    }
}
