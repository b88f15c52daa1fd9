// Page-walking state for GitHub collection endpoints.
//
// The HTTP side lives in `client.rs`; everything here is pure so the stop
// rules can be tested without a server.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::errors::GitHubError;

pub const DEFAULT_PAGE_SIZE: u8 = 100;

/// Where the item array sits in a page body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    /// The body is the array itself (`/issues`).
    Bare,
    /// The array is under an envelope key (`{"workflow_runs": [...]}`).
    Wrapped(&'static str),
}

impl Collection {
    pub fn extract(&self, resource: &str, body: Value) -> Result<Vec<Value>, GitHubError> {
        let items = match (self, body) {
            (Collection::Bare, Value::Array(items)) => Some(items),
            (Collection::Wrapped(key), Value::Object(mut map)) => match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                Some(Value::Null) | None => Some(Vec::new()),
                Some(_) => None,
            },
            _ => None,
        };

        items.ok_or_else(|| GitHubError::Decode {
            resource: resource.to_string(),
            message: match self {
                Collection::Bare => "expected a JSON array".to_string(),
                Collection::Wrapped(key) => format!("expected an array under '{key}'"),
            },
        })
    }
}

/// Ordering guarantee the API gives for a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    /// No usable ordering; every page must be read.
    Unordered,
    /// Strictly newest first, so a page with nothing in the window ends the walk.
    NewestFirst,
}

/// How a collection item is placed in the window.
pub trait Windowed {
    /// Timestamp compared against the lower bound; `None` keeps the item.
    fn window_timestamp(&self) -> Option<DateTime<Utc>>;

    /// Timestamp the collection is sorted by, which drives early exit.
    ///
    /// Must follow the listing order; defaults to the window timestamp.
    fn order_timestamp(&self) -> Option<DateTime<Utc>> {
        self.window_timestamp()
    }

    /// Uncounted items are left out of results but still inform early exit.
    fn is_countable(&self) -> bool {
        true
    }
}

/// Tracks which page to request next and when to stop.
#[derive(Debug, Clone)]
pub struct Paginator {
    page_size: usize,
    since: Option<DateTime<Utc>>,
    ordering: Ordering,
    page: u32,
    finished: bool,
}

impl Paginator {
    pub fn new(page_size: u8, since: Option<DateTime<Utc>>, ordering: Ordering) -> Self {
        Self {
            page_size: usize::from(page_size.max(1)),
            since,
            ordering,
            page: 1,
            finished: false,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Page number to request, or `None` once the collection is exhausted.
    pub fn next_page(&self) -> Option<u32> {
        (!self.finished).then_some(self.page)
    }

    /// Whether an item timestamp falls inside the window.
    pub fn in_window(&self, timestamp: DateTime<Utc>) -> bool {
        self.since.map_or(true, |since| timestamp >= since)
    }

    /// Record a fetched page.
    ///
    /// `raw_len` is the number of items the API returned, `in_window` the
    /// number of decoded items whose sort key is at or after the lower bound.
    pub fn advance(&mut self, raw_len: usize, in_window: usize) {
        let short_page = raw_len < self.page_size;
        let stale_page = self.ordering == Ordering::NewestFirst
            && self.since.is_some()
            && in_window == 0;

        if short_page || stale_page {
            self.finished = true;
        } else {
            self.page += 1;
        }
    }
}
