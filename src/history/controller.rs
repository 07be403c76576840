//! History controller
//!
//! Owns the history view's session state and orchestrates the record store,
//! the snapshot cache, filtering, and grouping. Operations take `&mut self`,
//! so one runs to completion before the next can start; store calls are the
//! only suspension points.
//!
//! State machine:
//!
//! ```text
//! Idle --open()--> Loading --> Loaded <--toggle_selection_mode()--> Selecting
//!                                 |                                    |
//!                  request_delete() / request_bulk_delete()            |
//!                                 v                                    |
//!                         ConfirmingDelete <---------------------------+
//!                                 |
//!          cancel_delete() / confirm_delete() (reloads unless the store is down)
//!                                 v
//!                          Loaded / Selecting
//! ```
//!
//! Store failures never escape as panics or untyped errors: each one is
//! published as a [`Notice`] and returned as a [`ChathistError`].

use crate::config::HistoryConfig;
use crate::error::ChathistError;
use crate::history::binning::{bin_dates, bin_dates_at, Bin};
use crate::history::events::{ActiveConversation, HistoryEvent, Notice, NoticeLevel};
use crate::history::filter::filter_records;
use crate::history::share::{share_url, Clipboard, ShareOutcome};
use crate::storage::{delete_snapshot, ConversationRecord, ExportBundle, RecordStore, SnapshotCache};
use chrono::{DateTime, TimeZone};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// What a pending deletion targets
#[derive(Debug, Clone, PartialEq)]
pub enum PendingDelete {
    Single(ConversationRecord),
    Bulk(Vec<ConversationRecord>),
}

impl PendingDelete {
    /// Ids that will be deleted on confirmation
    pub fn ids(&self) -> Vec<String> {
        match self {
            PendingDelete::Single(record) => vec![record.id.clone()],
            PendingDelete::Bulk(records) => records.iter().map(|r| r.id.clone()).collect(),
        }
    }
}

/// Observable controller state
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryState {
    Idle,
    Loading,
    Loaded,
    Selecting,
    ConfirmingDelete(PendingDelete),
}

/// Result of a bulk deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkDeleteReport {
    pub succeeded: usize,
    pub total: usize,
    /// Ids whose deletion failed, in processing order
    pub failed: Vec<String>,
}

impl BulkDeleteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of a confirmed deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Single(String),
    Bulk(BulkDeleteReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Loading,
    Ready,
}

/// Session state and operations behind the history view
pub struct HistoryController {
    store: Option<Arc<dyn RecordStore>>,
    snapshots: Arc<dyn SnapshotCache>,
    clipboard: Option<Arc<dyn Clipboard>>,
    active: ActiveConversation,
    settings: HistoryConfig,
    events: broadcast::Sender<HistoryEvent>,
    phase: Phase,
    pending: Option<PendingDelete>,
    selection_mode: bool,
    selection: BTreeSet<String>,
    list: Vec<ConversationRecord>,
    query: String,
}

impl HistoryController {
    /// Create a controller
    ///
    /// `store` is `None` when the history database could not be opened;
    /// every store-backed operation then fails with
    /// [`ChathistError::StoreUnavailable`].
    pub fn new(
        store: Option<Arc<dyn RecordStore>>,
        snapshots: Arc<dyn SnapshotCache>,
        active: ActiveConversation,
        settings: HistoryConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            snapshots,
            clipboard: None,
            active,
            settings,
            events,
            phase: Phase::Idle,
            pending: None,
            selection_mode: false,
            selection: BTreeSet::new(),
            list: Vec::new(),
            query: String::new(),
        }
    }

    /// Attach a clipboard used by [`HistoryController::share_link`]
    pub fn with_clipboard(mut self, clipboard: Arc<dyn Clipboard>) -> Self {
        self.clipboard = Some(clipboard);
        self
    }

    /// Receive events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<HistoryEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> HistoryState {
        if let Some(pending) = &self.pending {
            return HistoryState::ConfirmingDelete(pending.clone());
        }
        match self.phase {
            Phase::Idle => HistoryState::Idle,
            Phase::Loading => HistoryState::Loading,
            Phase::Ready if self.selection_mode => HistoryState::Selecting,
            Phase::Ready => HistoryState::Loaded,
        }
    }

    /// Listable records from the last successful load, newest first
    pub fn records(&self) -> &[ConversationRecord] {
        &self.list
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Working list narrowed by the current query
    pub fn filtered(&self) -> Vec<ConversationRecord> {
        filter_records(&self.list, &self.query, &self.settings.search_fields)
    }

    /// Filtered view grouped by recency against the local clock
    pub fn grouped(&self) -> Vec<Bin> {
        bin_dates(&self.filtered())
    }

    /// Filtered view grouped by recency against `now`
    pub fn grouped_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Vec<Bin> {
        bin_dates_at(&self.filtered(), now)
    }

    pub fn selection(&self) -> &BTreeSet<String> {
        &self.selection
    }

    pub fn is_selecting(&self) -> bool {
        self.selection_mode
    }

    /// Load the history view
    ///
    /// Returns the number of listable records. On failure the previous
    /// working list is kept and the controller still ends up `Loaded`.
    pub async fn open(&mut self) -> Result<usize, ChathistError> {
        self.phase = Phase::Loading;
        let result = self.load_entries().await;
        self.phase = Phase::Ready;
        result.map(|()| self.list.len())
    }

    /// Enter or leave selection mode; both directions clear the selection
    ///
    /// Ignored while a deletion awaits confirmation. Returns whether
    /// selection mode is now active.
    pub fn toggle_selection_mode(&mut self) -> bool {
        if self.pending.is_some() {
            tracing::debug!("Selection mode toggle ignored while confirming a deletion");
            return self.selection_mode;
        }
        self.selection_mode = !self.selection_mode;
        self.selection.clear();
        self.selection_mode
    }

    /// Add or remove one id from the selection
    ///
    /// Returns whether the id is selected afterwards. Outside selection mode
    /// this does nothing.
    pub fn toggle_item_selection(&mut self, id: &str) -> bool {
        if !self.selection_mode {
            return false;
        }
        if !self.selection.remove(id) {
            self.selection.insert(id.to_string());
            return true;
        }
        false
    }

    /// Select every record in the filtered view, or deselect them all
    ///
    /// When every filtered id is already selected, exactly those ids are
    /// removed and selections outside the filter are kept. Otherwise the
    /// filtered ids are added to the selection.
    pub fn select_all(&mut self) {
        if !self.selection_mode {
            return;
        }
        let filtered: Vec<String> = self.filtered().into_iter().map(|r| r.id).collect();
        let all_selected =
            !filtered.is_empty() && filtered.iter().all(|id| self.selection.contains(id));

        if all_selected {
            for id in &filtered {
                self.selection.remove(id);
            }
            tracing::debug!(count = filtered.len(), "Deselected all filtered conversations");
        } else {
            self.selection.extend(filtered);
            tracing::debug!(count = self.selection.len(), "Selected all filtered conversations");
        }
    }

    /// Ask to delete one record; awaits [`HistoryController::confirm_delete`]
    pub fn request_delete(&mut self, record: ConversationRecord) {
        tracing::debug!(id = %record.id, description = ?record.description, "Delete requested");
        self.pending = Some(PendingDelete::Single(record));
    }

    /// Ask to delete the selected records
    ///
    /// # Errors
    ///
    /// Returns [`ChathistError::ValidationFailed`], without changing state,
    /// if nothing is selected or no selected id is in the working list.
    pub fn request_bulk_delete(&mut self) -> Result<usize, ChathistError> {
        if self.selection.is_empty() {
            return Err(self.reject("Select at least one chat to delete", NoticeLevel::Info));
        }

        let records: Vec<ConversationRecord> = self
            .list
            .iter()
            .filter(|r| self.selection.contains(&r.id))
            .cloned()
            .collect();
        if records.is_empty() {
            return Err(self.reject("Could not find selected chats", NoticeLevel::Error));
        }

        let count = records.len();
        self.pending = Some(PendingDelete::Bulk(records));
        Ok(count)
    }

    /// The deletion awaiting confirmation, if any
    pub fn pending_delete(&self) -> Option<&PendingDelete> {
        self.pending.as_ref()
    }

    /// Dismiss the confirmation without deleting anything
    pub fn cancel_delete(&mut self) {
        self.pending = None;
    }

    /// Run the deletion awaiting confirmation
    pub async fn confirm_delete(&mut self) -> Result<DeleteOutcome, ChathistError> {
        let pending = match self.pending.take() {
            Some(pending) => pending,
            None => {
                return Err(self.reject("No deletion is awaiting confirmation", NoticeLevel::Info))
            }
        };

        match pending {
            PendingDelete::Single(record) => {
                self.delete_record(&record.id).await?;
                Ok(DeleteOutcome::Single(record.id))
            }
            PendingDelete::Bulk(records) => {
                let ids: Vec<String> = records.into_iter().map(|r| r.id).collect();
                self.delete_records(&ids).await.map(DeleteOutcome::Bulk)
            }
        }
    }

    /// Delete one record and its snapshot
    ///
    /// The working list is reloaded whether or not the deletion succeeded,
    /// unless the store reported itself unavailable. When the record was the
    /// open conversation, [`HistoryEvent::ActiveRecordRemoved`] is published.
    pub async fn delete_record(&mut self, id: &str) -> Result<(), ChathistError> {
        let store = self.require_store()?;
        tracing::info!(id, "Attempting to delete chat");

        let result = self.delete_one(store.as_ref(), id).await;
        if let Err(err @ ChathistError::StoreUnavailable(_)) = result {
            tracing::error!(id, error = %err, "Store unavailable while deleting chat");
            self.notify(Notice::error(err.to_string()));
            return Err(err);
        }
        self.reload().await;

        match result {
            Ok(()) => {
                self.selection.remove(id);
                self.notify(Notice::success("Chat deleted successfully"));
                self.emit(HistoryEvent::HistoryChanged);
                if self.active.is_active(id) {
                    tracing::info!(id, "Deleted chat was open");
                    self.emit(HistoryEvent::ActiveRecordRemoved(id.to_string()));
                }
                Ok(())
            }
            Err(err) => {
                tracing::error!(id, error = %err, "Failed to delete chat");
                self.notify(Notice::error("Failed to delete conversation"));
                Err(err)
            }
        }
    }

    /// Delete several records one after another
    ///
    /// Every id is attempted; per-record failures are collected, not fatal.
    /// Afterwards the list is reloaded and selection mode is left.
    ///
    /// # Errors
    ///
    /// Returns [`ChathistError::ValidationFailed`] for an empty id list and
    /// [`ChathistError::StoreUnavailable`] without a store. Neither touches
    /// any record. A store that reports itself unavailable mid-run stops the
    /// run with [`ChathistError::StoreUnavailable`]; no later id is attempted
    /// and the list is not reloaded.
    pub async fn delete_records(&mut self, ids: &[String]) -> Result<BulkDeleteReport, ChathistError> {
        if ids.is_empty() {
            tracing::debug!("Bulk delete skipped: no items to delete");
            return Err(self.reject("Select at least one chat to delete", NoticeLevel::Info));
        }
        let store = self.require_store()?;
        tracing::info!(count = ids.len(), "Starting bulk delete");

        let active = self.active.current();
        let mut succeeded = 0;
        let mut failed = Vec::new();
        let mut active_removed = false;

        for id in ids {
            match self.delete_one(store.as_ref(), id).await {
                Ok(()) => {
                    succeeded += 1;
                    if active.as_deref() == Some(id.as_str()) {
                        active_removed = true;
                    }
                }
                Err(err @ ChathistError::StoreUnavailable(_)) => {
                    tracing::error!(
                        id = %id,
                        succeeded,
                        error = %err,
                        "Store unavailable, stopping bulk delete"
                    );
                    self.notify(Notice::error(err.to_string()));
                    if succeeded > 0 {
                        self.emit(HistoryEvent::HistoryChanged);
                    }
                    if let (true, Some(id)) = (active_removed, &active) {
                        self.emit(HistoryEvent::ActiveRecordRemoved(id.clone()));
                    }
                    return Err(err);
                }
                Err(err) => {
                    tracing::error!(id = %id, error = %err, "Error deleting chat");
                    failed.push(id.clone());
                }
            }
        }

        let report = BulkDeleteReport {
            succeeded,
            total: ids.len(),
            failed,
        };

        if report.is_complete() {
            self.notify(Notice::success(format!(
                "{} chat{} deleted successfully",
                report.succeeded,
                if report.succeeded == 1 { "" } else { "s" }
            )));
        } else {
            self.notify(Notice::warning(format!(
                "Deleted {} of {} chats. {} failed.",
                report.succeeded,
                report.total,
                report.failed.len()
            )));
            self.notify(Notice::error(format!(
                "Failed to delete: {}",
                report.failed.join(", ")
            )));
        }

        self.reload().await;
        self.selection.clear();
        self.selection_mode = false;

        if report.succeeded > 0 {
            self.emit(HistoryEvent::HistoryChanged);
        }
        if active_removed {
            if let Some(id) = active {
                tracing::info!(id = %id, "Deleted chat was open");
                self.emit(HistoryEvent::ActiveRecordRemoved(id));
            }
        }

        Ok(report)
    }

    /// Look up a record by id, listable or not
    pub async fn find(&self, id: &str) -> Result<ConversationRecord, ChathistError> {
        let store = self.require_store()?;
        match store.get(id).await {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(self.fail(
                "Failed to find chat",
                ChathistError::NotFound(id.to_string()).into(),
            )),
            Err(e) => Err(self.fail("Failed to find chat", e)),
        }
    }

    /// Copy a record; the copy shows up after the reload this triggers
    pub async fn duplicate(&mut self, id: &str) -> Result<ConversationRecord, ChathistError> {
        let store = self.require_store()?;
        match store.duplicate(id).await {
            Ok(copy) => {
                self.notify(Notice::success("Chat duplicated"));
                self.reload().await;
                self.emit(HistoryEvent::HistoryChanged);
                Ok(copy)
            }
            Err(e) => Err(self.fail("Failed to duplicate chat", e)),
        }
    }

    /// Change a record's description
    pub async fn rename(
        &mut self,
        id: &str,
        description: &str,
    ) -> Result<ConversationRecord, ChathistError> {
        let store = self.require_store()?;
        match store.update_description(id, description).await {
            Ok(record) => {
                self.notify(Notice::success("Description updated"));
                self.reload().await;
                self.emit(HistoryEvent::HistoryChanged);
                Ok(record)
            }
            Err(e) => Err(self.fail("Failed to update description", e)),
        }
    }

    /// Produce the downloadable bundle for a record
    pub async fn export(&self, id: &str) -> Result<ExportBundle, ChathistError> {
        let store = self.require_store()?;
        store
            .export_record(id)
            .await
            .map_err(|e| self.fail("Failed to export chat", e))
    }

    /// Build a record's share link and try to copy it
    ///
    /// Falls back to returning the URL for display when no clipboard is
    /// attached or the copy fails.
    pub async fn share_link(&self, url_id: &str) -> Result<ShareOutcome, ChathistError> {
        let url = share_url(&self.settings.base_url, url_id)
            .map_err(|e| self.fail("Cannot share this chat", e))?;

        let Some(clipboard) = &self.clipboard else {
            return Ok(ShareOutcome::Fallback(url));
        };

        match clipboard.write_text(url.as_str()).await {
            Ok(()) => {
                self.notify(Notice::success("Chat URL copied to clipboard"));
                Ok(ShareOutcome::Copied(url))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to copy URL");
                Ok(ShareOutcome::Fallback(url))
            }
        }
    }

    async fn delete_one(&self, store: &dyn RecordStore, id: &str) -> Result<(), ChathistError> {
        delete_snapshot(self.snapshots.as_ref(), id).await;
        store
            .delete_by_id(id)
            .await
            .map_err(ChathistError::classify)?;
        tracing::debug!(id, "Successfully deleted chat");
        Ok(())
    }

    async fn reload(&mut self) {
        // Failures were already published by load_entries
        let _ = self.load_entries().await;
        self.phase = Phase::Ready;
    }

    async fn load_entries(&mut self) -> Result<(), ChathistError> {
        let store = self.require_store()?;
        match store.get_all().await {
            Ok(records) => {
                let mut list: Vec<ConversationRecord> =
                    records.into_iter().filter(|r| r.is_listable()).collect();
                list.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                tracing::debug!(count = list.len(), "Loaded history");
                self.list = list;
                Ok(())
            }
            Err(e) => Err(self.fail("Failed to load chat history", e)),
        }
    }

    fn require_store(&self) -> Result<Arc<dyn RecordStore>, ChathistError> {
        match &self.store {
            Some(store) => Ok(Arc::clone(store)),
            None => {
                let err =
                    ChathistError::StoreUnavailable("history database is not available".to_string());
                self.notify(Notice::error(err.to_string()));
                Err(err)
            }
        }
    }

    fn fail(&self, context: &str, err: anyhow::Error) -> ChathistError {
        let err = ChathistError::classify(err);
        tracing::error!(error = %err, "{}", context);
        self.notify(Notice::error(format!("{}: {}", context, err)));
        err
    }

    fn reject(&self, message: &str, level: NoticeLevel) -> ChathistError {
        self.notify(Notice {
            level,
            message: message.to_string(),
        });
        ChathistError::ValidationFailed(message.to_string())
    }

    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => tracing::debug!(message = %notice.message, "Error notice"),
            _ => tracing::debug!(message = %notice.message, "Notice"),
        }
        self.emit(HistoryEvent::Notice(notice));
    }

    fn emit(&self, event: HistoryEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
