//! History view logic
//!
//! Everything between the record store and whatever renders the history
//! list:
//!
//! - [`binning`] -- recency grouping ("Today", "Yesterday", ...)
//! - [`filter`] -- case-insensitive search over configured fields
//! - [`controller`] -- selection, deletion, and record operations
//! - [`events`] -- notices, change signals, and the active conversation
//! - [`share`] -- share link construction and clipboard delivery

pub mod binning;
pub mod controller;
pub mod events;
pub mod filter;
pub mod share;

pub use binning::{bin_dates, bin_dates_at, Bin, DateCategory};
pub use controller::{
    BulkDeleteReport, DeleteOutcome, HistoryController, HistoryState, PendingDelete,
};
pub use events::{ActiveConversation, HistoryEvent, Notice, NoticeLevel};
pub use filter::{filter_records, SearchField};
pub use share::{share_url, Clipboard, MemoryClipboard, ShareOutcome};
