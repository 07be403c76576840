//! Shareable links for conversations
//!
//! A share link addresses a conversation by its `url_id` under
//! `<base_url>/chat/`. Copying it somewhere is delegated to a [`Clipboard`]
//! collaborator; when none is available, or the copy fails, the caller gets
//! the URL back to present itself.

use crate::error::{ChathistError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use url::Url;

/// Destination for copied share links
#[async_trait]
pub trait Clipboard: Send + Sync + std::fmt::Debug {
    /// Place `text` on the clipboard
    async fn write_text(&self, text: &str) -> Result<()>;
}

/// How a share link reached the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    /// The link is on the clipboard
    Copied(Url),
    /// No clipboard, or copying failed; show the link instead
    Fallback(Url),
}

impl ShareOutcome {
    pub fn url(&self) -> &Url {
        match self {
            ShareOutcome::Copied(url) | ShareOutcome::Fallback(url) => url,
        }
    }
}

/// Build the absolute link for a conversation slug
///
/// # Examples
///
/// ```
/// use chathist::history::share::share_url;
/// use url::Url;
///
/// let base = Url::parse("http://localhost:5173").unwrap();
/// let url = share_url(&base, "my-chat").unwrap();
/// assert_eq!(url.as_str(), "http://localhost:5173/chat/my-chat");
/// ```
pub fn share_url(base: &Url, url_id: &str) -> Result<Url> {
    if url_id.is_empty() {
        return Err(ChathistError::ValidationFailed(
            "conversation has no shareable url id".to_string(),
        )
        .into());
    }

    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| ChathistError::Config(format!("base url cannot hold a path: {}", base)))?
        .pop_if_empty()
        .push("chat")
        .push(url_id);
    Ok(url)
}

/// Clipboard kept in memory
///
/// Useful for embedders without a system clipboard and for tests;
/// [`MemoryClipboard::set_failing`] makes writes fail.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
    failing: AtomicBool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Last text written
    pub async fn contents(&self) -> Option<String> {
        self.contents.lock().await.clone()
    }
}

#[async_trait]
impl Clipboard for MemoryClipboard {
    async fn write_text(&self, text: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("clipboard write rejected");
        }
        *self.contents.lock().await = Some(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_url_keeps_base_path() {
        let base = Url::parse("https://example.dev/app/").unwrap();
        let url = share_url(&base, "abc").unwrap();
        assert_eq!(url.as_str(), "https://example.dev/app/chat/abc");
    }

    #[test]
    fn test_share_url_drops_query_and_fragment() {
        let base = Url::parse("https://example.dev/?tab=history#top").unwrap();
        let url = share_url(&base, "abc").unwrap();
        assert_eq!(url.as_str(), "https://example.dev/chat/abc");
    }

    #[test]
    fn test_share_url_encodes_slug() {
        let base = Url::parse("https://example.dev").unwrap();
        let url = share_url(&base, "a b").unwrap();
        assert_eq!(url.as_str(), "https://example.dev/chat/a%20b");
    }

    #[test]
    fn test_share_url_requires_slug() {
        let base = Url::parse("https://example.dev").unwrap();
        assert!(share_url(&base, "").is_err());
    }

    #[tokio::test]
    async fn test_memory_clipboard_records_and_fails() {
        let clipboard = MemoryClipboard::new();
        clipboard.write_text("hello").await.expect("write failed");
        assert_eq!(clipboard.contents().await.as_deref(), Some("hello"));

        clipboard.set_failing(true);
        assert!(clipboard.write_text("again").await.is_err());
        assert_eq!(clipboard.contents().await.as_deref(), Some("hello"));
    }
}
