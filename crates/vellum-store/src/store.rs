//! The store query interface consumed by Vellum services.

use crate::error::StoreResult;
use crate::filter::QueryFilter;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use vellum_core::{Record, Value};

/// A lazy, finite, non-restartable sequence of records.
///
/// Dropping the stream releases the underlying cursor.
pub type RecordStream = BoxStream<'static, StoreResult<Record>>;

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first. Records missing the field sort before all others.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

/// Sort specification for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Dotted field path.
    pub field: String,
    /// Direction.
    pub direction: SortDirection,
}

impl SortKey {
    /// Ascending on `field`.
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Descending on `field`.
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Pagination and ordering for [`Store::find_many`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Records to skip.
    pub skip: u64,
    /// Maximum records to return. `None` is unbounded.
    pub limit: Option<u64>,
    /// Ordering. `None` keeps store order.
    pub sort: Option<SortKey>,
}

impl FindOptions {
    /// Store order, no pagination.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page window.
    #[must_use]
    pub fn page(mut self, skip: u64, limit: u64) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }

    /// Sets the sort key.
    #[must_use]
    pub fn sorted_by(mut self, key: SortKey) -> Self {
        self.sort = Some(key);
        self
    }
}

/// A set of field assignments applied atomically to one record.
///
/// Paths are dotted; numeric segments index into arrays, so
/// `pages.0.areas.1.paragraphs.0.lines.3.text` addresses one line's text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldUpdate {
    sets: Vec<(String, Value)>,
}

impl FieldUpdate {
    /// No assignments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an assignment.
    #[must_use]
    pub fn set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.sets.push((path.into(), value.into()));
        self
    }

    /// Adds an assignment in place.
    pub fn push(&mut self, path: impl Into<String>, value: impl Into<Value>) {
        self.sets.push((path.into(), value.into()));
    }

    /// Returns the assignments.
    #[must_use]
    pub fn sets(&self) -> &[(String, Value)] {
        &self.sets
    }

    /// Returns `true` if there is nothing to assign.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// A document store.
///
/// Every method addresses a named collection. Reads see a consistent snapshot
/// per call; [`Store::update_one`] relies on per-record atomicity and nothing
/// stronger.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Returns the first record matching `filter`, in store order.
    async fn find_one(&self, collection: &str, filter: &QueryFilter) -> StoreResult<Option<Record>>;

    /// Streams records matching `filter`.
    async fn find_many(
        &self,
        collection: &str,
        filter: &QueryFilter,
        options: FindOptions,
    ) -> StoreResult<RecordStream>;

    /// Counts records matching `filter`.
    async fn count(&self, collection: &str, filter: &QueryFilter) -> StoreResult<u64>;

    /// Applies `update` to the first record matching `filter`. Returns the
    /// number of records matched (0 or 1).
    async fn update_one(
        &self,
        collection: &str,
        filter: &QueryFilter,
        update: &FieldUpdate,
    ) -> StoreResult<u64>;

    /// Returns `true` if the store can serve requests.
    async fn ping(&self) -> bool {
        true
    }
}
