//! Test utilities for Chathist
//!
//! This module provides common test utilities including temporary directory
//! management, record builders, and event helpers.

use crate::error::ChathistError;
use crate::history::HistoryEvent;
use crate::storage::ConversationRecord;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;
use tokio::sync::broadcast;

/// Create a temporary directory for testing
///
/// # Returns
///
/// Returns a TempDir that will be cleaned up when dropped
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a test file with the given content
///
/// # Panics
///
/// Panics if file creation or writing fails
pub fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: Result<T, ChathistError>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// A record that shows up in the history listing
pub fn listable_record(url_id: &str, description: &str) -> ConversationRecord {
    let mut record = ConversationRecord::new(
        Some(description.to_string()),
        vec![json!({"role": "user", "content": format!("about {}", description)})],
    );
    record.url_id = Some(url_id.to_string());
    record
}

/// A listable record created at `timestamp`
pub fn record_at(description: &str, timestamp: DateTime<Utc>) -> ConversationRecord {
    let mut record = listable_record(&description.to_lowercase(), description);
    record.timestamp = timestamp;
    record.updated_at = timestamp;
    record
}

/// Collect every event already published, without waiting
pub fn drain_events(rx: &mut broadcast::Receiver<HistoryEvent>) -> Vec<HistoryEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Create a test configuration YAML string
pub fn test_config_yaml() -> String {
    r#"
storage:
  path: /tmp/chathist-test/history.db

history:
  base_url: https://chat.example.dev/
  search_fields:
    - description
    - url_id
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_temp_dir_creation() {
        let dir = temp_dir();
        assert!(dir.path().exists());
    }

    #[test]
    fn test_create_test_file() {
        let dir = temp_dir();
        let path = create_test_file(&dir, "test.txt", "content");
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "content");
    }

    #[test]
    #[should_panic(expected = "does not contain")]
    fn test_assert_error_contains_wrong_message() {
        let result: Result<(), ChathistError> =
            Err(ChathistError::Config("different error".to_string()));
        assert_error_contains(result, "not present");
    }

    #[test]
    fn test_listable_record_is_listable() {
        let record = listable_record("slug", "Title");
        assert!(record.is_listable());
        assert_eq!(record.url_id.as_deref(), Some("slug"));
    }

    #[test]
    fn test_record_at_sets_timestamp() {
        let at = Utc::now() - chrono::Duration::days(3);
        let record = record_at("Old", at);
        assert_eq!(record.timestamp, at);
        assert!(record.is_listable());
    }

    #[test]
    fn test_test_config_yaml() {
        let config: Config = serde_yaml::from_str(&test_config_yaml()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.history.search_fields.len(), 2);
    }
}
