//! Chathist - Conversation history store library
//!
//! This library persists chat conversations and provides the logic behind a
//! history view: recency grouping, search, multi-select bulk deletion with
//! best-effort snapshot cleanup, duplication, export, and share links.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `storage`: Record store contract, `sled` and in-memory backends, snapshot cache
//! - `history`: Controller state machine, binning, filtering, events, sharing
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//! - `commands`: Command handlers for the `chathist` binary
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chathist::history::{ActiveConversation, HistoryController};
//! use chathist::storage::{RecordStore, SledRecordStore};
//! use chathist::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let store = SledRecordStore::open(config.db_path()?)?;
//!     let snapshots = Arc::new(store.snapshot_cache()?);
//!
//!     let mut controller = HistoryController::new(
//!         Some(Arc::new(store) as Arc<dyn RecordStore>),
//!         snapshots,
//!         ActiveConversation::none(),
//!         config.history.clone(),
//!     );
//!     controller.open().await?;
//!     for bin in controller.grouped() {
//!         println!("{}: {}", bin.label(), bin.items.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod history;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use error::{ChathistError, Result};
pub use history::{ActiveConversation, HistoryController, HistoryEvent};
pub use storage::{ConversationRecord, RecordStore};

#[cfg(test)]
pub mod test_utils;
