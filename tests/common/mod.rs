use std::sync::Arc;
use tempfile::TempDir;

use chathist::config::HistoryConfig;
use chathist::history::{ActiveConversation, HistoryController};
use chathist::storage::{ConversationRecord, RecordStore, SledRecordStore, SledSnapshotCache};

#[allow(dead_code)]
pub fn create_temp_store() -> (SledRecordStore, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("history.db");
    let store = SledRecordStore::open(db_path).expect("failed to open sled store with path");
    (store, tmp)
}

#[allow(dead_code)]
pub fn controller_over(
    store: &SledRecordStore,
    active: ActiveConversation,
) -> (HistoryController, SledSnapshotCache) {
    let cache = store.snapshot_cache().expect("failed to open snapshot tree");
    let controller = HistoryController::new(
        Some(Arc::new(store.clone()) as Arc<dyn RecordStore>),
        Arc::new(cache.clone()),
        active,
        HistoryConfig::default(),
    );
    (controller, cache)
}

#[allow(dead_code)]
pub fn listable(description: &str) -> ConversationRecord {
    ConversationRecord::new(
        Some(description.to_string()),
        vec![serde_json::json!({"role": "user", "content": description})],
    )
}
