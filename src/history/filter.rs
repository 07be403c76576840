//! Case-insensitive search over conversation records

use crate::error::ChathistError;
use crate::storage::ConversationRecord;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Record field a search query is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Description,
    UrlId,
    Id,
}

impl SearchField {
    /// The field's value on a record, if present
    pub fn value<'a>(&self, record: &'a ConversationRecord) -> Option<&'a str> {
        match self {
            SearchField::Description => record.description.as_deref(),
            SearchField::UrlId => record.url_id.as_deref(),
            SearchField::Id => Some(record.id.as_str()),
        }
    }
}

impl FromStr for SearchField {
    type Err = ChathistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "description" => Ok(SearchField::Description),
            "url_id" | "urlid" => Ok(SearchField::UrlId),
            "id" => Ok(SearchField::Id),
            other => Err(ChathistError::Config(format!(
                "Unknown search field: {}. Must be one of: description, url_id, id",
                other
            ))),
        }
    }
}

/// Narrow `records` to those matching `query` in any of `fields`
///
/// An empty query returns the input unchanged. Matching is a
/// case-insensitive substring test; absent field values never match.
///
/// # Examples
///
/// ```
/// use chathist::history::filter::{filter_records, SearchField};
/// use chathist::storage::ConversationRecord;
///
/// let records = vec![
///     ConversationRecord::new(Some("Build API".to_string()), vec![]),
///     ConversationRecord::new(Some("Landing page".to_string()), vec![]),
/// ];
/// let hits = filter_records(&records, "api", &[SearchField::Description]);
/// assert_eq!(hits.len(), 1);
/// assert_eq!(filter_records(&records, "", &[SearchField::Description]), records);
/// ```
pub fn filter_records(
    records: &[ConversationRecord],
    query: &str,
    fields: &[SearchField],
) -> Vec<ConversationRecord> {
    if query.is_empty() {
        return records.to_vec();
    }

    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|record| {
            fields.iter().any(|field| {
                field
                    .value(record)
                    .map(|value| value.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
        })
        .cloned()
        .collect()
}
