//! Value Objects for the storefront

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Soft-delete marker carried by every deletable row
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Active,
    Deleted,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deleted => "deleted",
        }
    }

    pub fn is_active(&self) -> bool {
        *self == Self::Active
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "deleted" => Ok(Self::Deleted),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A status column held a value no enum variant maps to
#[derive(Debug, Clone, Error)]
#[error("unknown status `{0}`")]
pub struct UnknownStatus(pub String);

/// Quantity of one cart line. A requested quantity of zero means one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity(i32);

impl Quantity {
    /// Upper bound for a single cart line
    pub const MAX: i32 = 10_000;

    pub fn requested(value: i32) -> Result<Self, QuantityError> {
        match value {
            v if v < 0 => Err(QuantityError::Negative),
            v if v > Self::MAX => Err(QuantityError::TooLarge(Self::MAX)),
            0 => Ok(Self(1)),
            v => Ok(Self(v)),
        }
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self(1)
    }
}

#[derive(Debug, Clone, Error)]
pub enum QuantityError {
    #[error("Quantity must not be negative")]
    Negative,
    #[error("Quantity must not exceed {0}")]
    TooLarge(i32),
}

/// Page selection supplied by a caller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    per_page: u32,
}

impl PageRequest {
    pub const DEFAULT_PER_PAGE: u32 = 5;
    pub const MAX_PER_PAGE: u32 = 100;

    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let per_page = match per_page {
            None | Some(0) => Self::DEFAULT_PER_PAGE,
            Some(n) => n.min(Self::MAX_PER_PAGE),
        };
        Self { page, per_page }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results; page counts travel with the result of each call
#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total_items: i64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: &PageRequest, total_items: i64) -> Self {
        let per_page = i64::from(request.per_page());
        let total_pages =
            u32::try_from((total_items.max(0) + per_page - 1) / per_page).unwrap_or(u32::MAX);
        Self {
            items,
            page: request.page(),
            per_page: request.per_page(),
            total_items,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}
