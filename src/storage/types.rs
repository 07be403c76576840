//! Persisted record types for the conversation history store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use ulid::Ulid;

/// Persisted conversation record
///
/// One chat conversation as seen by the history view: its identity, the
/// shareable slug, the display title, and the opaque message sequence.
///
/// # Examples
///
/// ```
/// use chathist::storage::ConversationRecord;
///
/// let record = ConversationRecord::new(Some("Build API".to_string()), vec![]);
/// assert_eq!(record.id.len(), 26);
/// assert!(record.url_id.is_none());
/// assert!(!record.is_listable());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    /// Unique conversation identifier (ULID)
    pub id: String,

    /// Shareable slug, unique among non-empty values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_id: Option<String>,

    /// Display title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Conversation messages, opaque to this crate
    #[serde(default)]
    pub messages: Vec<Value>,

    /// Creation instant
    #[serde(with = "flexible_time")]
    pub timestamp: DateTime<Utc>,

    /// Last-mutation instant
    #[serde(with = "flexible_time")]
    pub updated_at: DateTime<Utc>,

    /// Implementation-defined extension payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ConversationRecord {
    /// Create a record with a fresh id and the current time
    pub fn new(description: Option<String>, messages: Vec<Value>) -> Self {
        let now = Utc::now();
        Self {
            id: new_conversation_id(),
            url_id: None,
            description,
            messages,
            timestamp: now,
            updated_at: now,
            metadata: None,
        }
    }

    /// Whether the record belongs in the end-user history listing
    ///
    /// Both a shareable slug and a title are required.
    pub fn is_listable(&self) -> bool {
        non_empty(self.url_id.as_deref()) && non_empty(self.description.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> bool {
    value.map(|v| !v.is_empty()).unwrap_or(false)
}

/// Captured project-file state tied to a record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Message position the snapshot was taken at
    pub chat_index: String,

    /// File path to file content
    #[serde(default)]
    pub files: BTreeMap<String, String>,

    /// Optional summary of the captured state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Downloadable representation of a single conversation
///
/// Field names match [`ConversationRecord`] so a bundle can be turned back
/// into a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub messages: Vec<Value>,
    #[serde(with = "flexible_time")]
    pub timestamp: DateTime<Utc>,
    #[serde(with = "flexible_time")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// When the bundle was produced
    #[serde(with = "flexible_time")]
    pub export_date: DateTime<Utc>,
}

impl ExportBundle {
    /// Build a bundle from a record, stamped with the current time
    pub fn from_record(record: &ConversationRecord) -> Self {
        Self {
            id: record.id.clone(),
            url_id: record.url_id.clone(),
            description: record.description.clone(),
            messages: record.messages.clone(),
            timestamp: record.timestamp,
            updated_at: record.updated_at,
            metadata: record.metadata.clone(),
            export_date: Utc::now(),
        }
    }

    /// Suggested download file name, e.g. `chat-01HX....json`
    pub fn file_name(&self) -> String {
        format!("chat-{}.json", self.id)
    }
}

/// Generate a new ULID for a conversation
///
/// # Examples
///
/// ```
/// use chathist::storage::new_conversation_id;
///
/// let id = new_conversation_id();
/// assert_eq!(id.len(), 26);
/// ```
pub fn new_conversation_id() -> String {
    Ulid::new().to_string()
}

/// Timestamps are written as RFC 3339 and read from either RFC 3339 text
/// or epoch milliseconds.
mod flexible_time {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Text(String),
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Raw::deserialize(deserializer)? {
            Raw::Millis(ms) => Utc
                .timestamp_millis_opt(ms)
                .single()
                .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {}", ms))),
            Raw::Text(text) => DateTime::parse_from_rfc3339(&text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(D::Error::custom),
        }
    }
}
