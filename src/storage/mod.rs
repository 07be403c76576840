//! Durable storage for conversation history
//!
//! The [`RecordStore`] trait is the contract the history controller talks to.
//! Backends only implement the four primitive operations (`get_all`, `get`,
//! `put`, `delete_by_id`); saving, duplication, export, and renaming are
//! provided on top of them so every backend shares the same slug allocation
//! and validation rules.
//!
//! - [`sled_store::SledRecordStore`] -- embedded `sled` database used by the CLI
//! - [`memory::InMemoryRecordStore`] -- in-process store with failure injection
//! - [`snapshot`] -- auxiliary per-conversation snapshot cache

use crate::error::{ChathistError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;

pub mod memory;
pub mod sled_store;
pub mod snapshot;
pub mod types;

pub use memory::InMemoryRecordStore;
pub use sled_store::SledRecordStore;
pub use snapshot::{
    delete_snapshot, snapshot_key, InMemorySnapshotCache, SledSnapshotCache, SnapshotCache,
};
pub use types::{new_conversation_id, ConversationRecord, ExportBundle, Snapshot};

/// Description used for a duplicate of a record that had no title
const UNTITLED_DESCRIPTION: &str = "Chat";

/// Storage contract for conversation records
///
/// All methods are `async` so backends may perform I/O without blocking the
/// runtime. Errors are returned as `anyhow::Error` wrapping a
/// [`ChathistError`], which callers can recover with
/// [`ChathistError::classify`].
#[async_trait]
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// Return every stored record; order is unspecified
    async fn get_all(&self) -> Result<Vec<ConversationRecord>>;

    /// Look up a record by primary key
    async fn get(&self, id: &str) -> Result<Option<ConversationRecord>>;

    /// Write a record as-is, replacing any record with the same id
    async fn put(&self, record: &ConversationRecord) -> Result<()>;

    /// Remove a record
    ///
    /// # Errors
    ///
    /// Returns [`ChathistError::NotFound`] if no record has this id and
    /// [`ChathistError::StoreUnavailable`] if the backend cannot be reached.
    async fn delete_by_id(&self, id: &str) -> Result<()>;

    /// Resolve a shareable slug back to its record
    async fn get_by_url_id(&self, url_id: &str) -> Result<Option<ConversationRecord>> {
        if url_id.is_empty() {
            return Ok(None);
        }
        Ok(self
            .get_all()
            .await?
            .into_iter()
            .find(|r| r.url_id.as_deref() == Some(url_id)))
    }

    /// Insert or update a record
    ///
    /// Refreshes `updated_at` and assigns a unique `url_id` when the record
    /// has none. Returns the record exactly as persisted.
    ///
    /// # Errors
    ///
    /// Returns [`ChathistError::ValidationFailed`] if the record carries a
    /// `url_id` already used by a different record.
    async fn save(&self, record: ConversationRecord) -> Result<ConversationRecord> {
        let mut record = record;
        let taken = taken_url_ids(&self.get_all().await?, &record.id);

        match record.url_id.as_deref() {
            Some(slug) if !slug.is_empty() => {
                if taken.contains(slug) {
                    return Err(ChathistError::ValidationFailed(format!(
                        "url id '{}' is already in use",
                        slug
                    ))
                    .into());
                }
            }
            _ => {
                record.url_id = Some(allocate_url_id(&record.id.to_lowercase(), &taken));
            }
        }

        record.updated_at = Utc::now();
        self.put(&record).await?;
        tracing::debug!(id = %record.id, url_id = ?record.url_id, "Saved conversation");
        Ok(record)
    }

    /// Copy a record under a fresh id and slug
    ///
    /// The copy keeps the messages and metadata, gets the description
    /// `"<original> (copy)"`, and is timestamped now. The source is untouched.
    async fn duplicate(&self, id: &str) -> Result<ConversationRecord> {
        let source = self
            .get(id)
            .await?
            .ok_or_else(|| ChathistError::NotFound(id.to_string()))?;

        let base = source
            .description
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(UNTITLED_DESCRIPTION);
        let mut copy =
            ConversationRecord::new(Some(format!("{} (copy)", base)), source.messages.clone());
        copy.metadata = source.metadata.clone();

        let copy = self.save(copy).await?;
        tracing::info!(source = %id, copy = %copy.id, "Duplicated conversation");
        Ok(copy)
    }

    /// Produce the downloadable representation of a record
    async fn export_record(&self, id: &str) -> Result<ExportBundle> {
        let record = self
            .get(id)
            .await?
            .ok_or_else(|| ChathistError::NotFound(id.to_string()))?;
        Ok(ExportBundle::from_record(&record))
    }

    /// Replace a record's description
    ///
    /// The new description is trimmed and must not be empty.
    async fn update_description(&self, id: &str, description: &str) -> Result<ConversationRecord> {
        let description = description.trim();
        if description.is_empty() {
            return Err(
                ChathistError::ValidationFailed("description cannot be empty".to_string()).into(),
            );
        }

        let mut record = self
            .get(id)
            .await?
            .ok_or_else(|| ChathistError::NotFound(id.to_string()))?;
        record.description = Some(description.to_string());
        self.save(record).await
    }
}

/// Slugs in use by records other than `except_id`
fn taken_url_ids(records: &[ConversationRecord], except_id: &str) -> HashSet<String> {
    records
        .iter()
        .filter(|r| r.id != except_id)
        .filter_map(|r| r.url_id.clone())
        .filter(|slug| !slug.is_empty())
        .collect()
}

/// Pick `preferred`, or the first free `preferred-N` for N >= 2
///
/// # Examples
///
/// ```
/// use std::collections::HashSet;
/// use chathist::storage::allocate_url_id;
///
/// let taken: HashSet<String> = ["chat".to_string(), "chat-2".to_string()].into();
/// assert_eq!(allocate_url_id("chat", &taken), "chat-3");
/// assert_eq!(allocate_url_id("other", &taken), "other");
/// ```
pub fn allocate_url_id(preferred: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(preferred) {
        return preferred.to_string();
    }
    (2u64..)
        .map(|n| format!("{}-{}", preferred, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| preferred.to_string())
}
