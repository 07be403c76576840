/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `history` -- list, delete, duplicate, export, rename, and share conversations

Handlers work on a [`HistoryController`] built by [`open_controller`] from
the configured `sled` database.
*/

use crate::config::Config;
use crate::error::Result;
use crate::history::{ActiveConversation, HistoryController};
use crate::storage::{InMemorySnapshotCache, RecordStore, SledRecordStore, SnapshotCache};
use std::sync::Arc;

// History command handlers
pub mod history;

/// Build a controller over the configured history database
///
/// A database that cannot be opened does not abort here: the controller is
/// created without a store and every operation then reports the store as
/// unavailable, the same way an embedding UI would see it.
pub fn open_controller(config: &Config) -> Result<HistoryController> {
    let path = config.db_path()?;
    tracing::debug!("Opening history database at {}", path.display());

    let opened = SledRecordStore::open(&path).and_then(|store| {
        let cache = store.snapshot_cache()?;
        Ok((store, cache))
    });

    let (store, snapshots): (Option<Arc<dyn RecordStore>>, Arc<dyn SnapshotCache>) = match opened
    {
        Ok((store, cache)) => (
            Some(Arc::new(store) as Arc<dyn RecordStore>),
            Arc::new(cache) as Arc<dyn SnapshotCache>,
        ),
        Err(e) => {
            tracing::error!("Failed to open history database: {:#}", e);
            (
                None,
                Arc::new(InMemorySnapshotCache::new()) as Arc<dyn SnapshotCache>,
            )
        }
    };

    Ok(HistoryController::new(
        store,
        snapshots,
        ActiveConversation::none(),
        config.history.clone(),
    ))
}
