/// API route handlers
///
/// Helpers shared by the handlers live here: pagination and the
/// deserializers for partial-update payloads.

pub mod auth;
pub mod dashboard;
pub mod health;
pub mod members;
pub mod payments;
pub mod settings;
pub mod setup;
pub mod users;

use serde::{Deserialize, Deserializer, Serialize};

/// Largest page size accepted by list endpoints
pub const MAX_PAGE_SIZE: i64 = 100;

/// Highest page number accepted; larger values are clamped
pub const MAX_PAGE: i64 = 1_000_000;

/// Page block returned alongside list results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// Resolved `page`/`limit` query parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// Clamps `page` to `1..=MAX_PAGE` and `limit` to `1..=MAX_PAGE_SIZE`
    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn pagination(&self, total: i64) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            total_pages: (total + self.limit - 1) / self.limit,
        }
    }
}

/// Distinguishes an absent field from an explicit `null`
///
/// Use with `#[serde(default, deserialize_with = "nullable")]`: absent
/// yields `None`, `null` yields `Some(None)`.
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Like [`nullable`], but a blank string also clears the value
pub fn nullable_text<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(Some(non_blank(value)))
}

/// Trims and drops empty strings
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
