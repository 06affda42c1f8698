//! Pagination types for list queries.
//!
//! Lists are paged forward only, ordered by ascending id. A page is
//! fetched with one extra row beyond the limit so the store can tell
//! whether anything follows without a separate count query.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::models::{Entity, MAX_FIELD_LENGTH};

/// Default page size when the caller does not pass one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// Largest accepted page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Opaque continuation token.
///
/// Holds the id of the last item of the previous page. Only meaningful
/// together with the filter it was issued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(pub i64);

impl Cursor {
    pub fn value(self) -> i64 {
        self.0
    }
}

impl From<i64> for Cursor {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    limit: u32,
    after: Option<Cursor>,
}

impl PageRequest {
    /// Build a request, rejecting limits outside `[1, MAX_PAGE_SIZE]`.
    pub fn new(limit: i64, after: Option<Cursor>) -> DomainResult<Self> {
        if limit < 1 || limit > MAX_PAGE_SIZE as i64 {
            return Err(DomainError::Validation(format!(
                "limit must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, limit
            )));
        }
        Ok(Self {
            limit: limit as u32,
            after,
        })
    }

    /// First page with the default size.
    pub fn first() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            after: None,
        }
    }

    /// Same limit, continuing after another cursor.
    pub fn resume(self, after: Option<Cursor>) -> Self {
        Self { after, ..self }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn after(&self) -> Option<Cursor> {
        self.after
    }

    /// Number of rows to fetch from the store (limit plus one extra row).
    pub fn fetch_size(&self) -> usize {
        self.limit as usize + 1
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Cursor to pass for the next page; `None` marks the end of the collection.
    pub next_cursor: Option<Cursor>,
}

impl<T> Page<T> {
    /// Trim an over-fetched row set (up to `limit + 1` rows) into a page.
    ///
    /// When the extra row is present it is dropped and the cursor points
    /// at the last row kept.
    pub fn from_overfetch(mut rows: Vec<T>, limit: u32, id_of: impl Fn(&T) -> i64) -> Self {
        let limit = limit as usize;
        if rows.len() > limit {
            rows.truncate(limit);
            let next_cursor = rows.last().map(|row| Cursor(id_of(row)));
            Self {
                items: rows,
                next_cursor,
            }
        } else {
            Self {
                items: rows,
                next_cursor: None,
            }
        }
    }

    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Substring filter on name and title.
///
/// Both constraints are case-sensitive and combined with AND. Empty
/// strings are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityFilter {
    pub name: Option<String>,
    pub title: Option<String>,
}

impl EntityFilter {
    pub fn new(name: Option<String>, title: Option<String>) -> Self {
        Self {
            name: name.filter(|s| !s.is_empty()),
            title: title.filter(|s| !s.is_empty()),
        }
    }

    /// Filter matching the same term in either field position.
    ///
    /// Note this is still an AND: both name and title must contain `term`.
    pub fn search(term: &str) -> Self {
        Self::new(Some(term.to_string()), Some(term.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.title.is_none()
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        let name_ok = self
            .name
            .as_deref()
            .is_none_or(|needle| entity.name.contains(needle));
        let title_ok = self
            .title
            .as_deref()
            .is_none_or(|needle| entity.title.contains(needle));
        name_ok && title_ok
    }

    /// Reject oversized search terms before they reach the store.
    pub fn validate(&self) -> DomainResult<()> {
        for (field, value) in [("name", &self.name), ("title", &self.title)] {
            if let Some(value) = value {
                if value.chars().count() > MAX_FIELD_LENGTH {
                    return Err(DomainError::Validation(format!(
                        "{} filter too long: maximum {} characters allowed",
                        field, MAX_FIELD_LENGTH
                    )));
                }
            }
        }
        Ok(())
    }
}
