//! In-memory [`Store`] implementation.
//!
//! Used for tests and local runs. Collections hold `Arc<Record>`s; a query
//! snapshots the matching entries under a read lock and streams clones of
//! them lazily, so concurrent writes never tear a result set.

use crate::error::{StoreError, StoreResult};
use crate::filter::{compare, QueryFilter};
use crate::store::{FieldUpdate, FindOptions, RecordStream, SortDirection, Store};
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use tracing::{debug, info};
use vellum_core::{ObjectId, Record, Value};

/// A process-local document store.
///
/// # Example
///
/// ```
/// use vellum_core::Record;
/// use vellum_store::{MemoryStore, QueryFilter, Store};
///
/// # tokio_test::block_on(async {
/// let store = MemoryStore::new();
/// store.insert("documents", Record::new().with("uuid", "d-1"));
/// assert_eq!(store.count("documents", &QueryFilter::all()).await.unwrap(), 1);
/// # });
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Arc<Record>>>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record, assigning an `_id` if it has none. Returns the
    /// record's `_id` when it is an object id.
    pub fn insert(&self, collection: &str, mut record: Record) -> Option<ObjectId> {
        if !record.contains("_id") {
            record.insert("_id", ObjectId::new());
        }
        let id = match record.get("_id") {
            Some(Value::ObjectId(id)) => Some(*id),
            _ => None,
        };
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .push(Arc::new(record));
        id
    }

    /// Inserts many records.
    pub fn insert_many(&self, collection: &str, records: impl IntoIterator<Item = Record>) {
        for record in records {
            self.insert(collection, record);
        }
    }

    /// Number of records in a collection.
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections.read().get(collection).map_or(0, Vec::len)
    }

    /// Loads collections from an extended-JSON value of the form
    /// `{"collection": [record, ...], ...}`.
    pub fn seed_json(&self, json: &serde_json::Value) -> StoreResult<usize> {
        let Some(object) = json.as_object() else {
            return Err(StoreError::seed("<inline>", "seed data must be a JSON object"));
        };
        let mut loaded = 0;
        for (collection, records) in object {
            let Some(records) = records.as_array() else {
                return Err(StoreError::seed(
                    "<inline>",
                    format!("collection '{collection}' must be an array"),
                ));
            };
            for record in records {
                let Some(record) = Record::from_extended_json(record) else {
                    return Err(StoreError::seed(
                        "<inline>",
                        format!("collection '{collection}' holds a non-object entry"),
                    ));
                };
                self.insert(collection, record);
                loaded += 1;
            }
        }
        Ok(loaded)
    }

    /// Loads collections from an extended-JSON file.
    pub fn seed_file(&self, path: impl AsRef<Path>) -> StoreResult<usize> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let json: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| StoreError::seed(path, e.to_string()))?;
        let loaded = self.seed_json(&json).map_err(|e| match e {
            StoreError::Seed { message, .. } => StoreError::seed(path, message),
            other => other,
        })?;
        info!(path = %path.display(), records = loaded, "Seeded in-memory store");
        Ok(loaded)
    }

    /// Simulates an outage: while set, every operation fails with
    /// [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            Err(StoreError::unavailable("in-memory store is marked unavailable"))
        } else {
            Ok(())
        }
    }

    fn snapshot(&self, collection: &str, filter: &QueryFilter) -> Vec<Arc<Record>> {
        self.collections
            .read()
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| filter.matches(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn sort_records(records: &mut [Arc<Record>], field: &str, direction: SortDirection) {
    records.sort_by(|a, b| {
        let ord = match (a.lookup_path(field).first(), b.lookup_path(field).first()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
        };
        match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
}

fn apply_set(record: &mut Record, path: &str, value: Value) -> StoreResult<()> {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return Err(StoreError::invalid_update(path, "empty path"));
    };
    let Some((first, rest)) = parents.split_first() else {
        record.insert(*last, value);
        return Ok(());
    };
    let mut current = record
        .get_mut(first)
        .ok_or_else(|| StoreError::invalid_update(path, format!("missing field '{first}'")))?;
    for segment in rest {
        current = step(current, segment).ok_or_else(|| {
            StoreError::invalid_update(path, format!("cannot descend into '{segment}'"))
        })?;
    }
    match current {
        Value::Document(doc) => {
            doc.insert(*last, value);
            Ok(())
        }
        Value::Array(items) => {
            let slot = last
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get_mut(i))
                .ok_or_else(|| StoreError::invalid_update(path, "index out of range"))?;
            *slot = value;
            Ok(())
        }
        other => Err(StoreError::invalid_update(
            path,
            format!("cannot assign into a {}", other.kind_name()),
        )),
    }
}

fn step<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Document(doc) => doc.get_mut(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
        _ => None,
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_one(&self, collection: &str, filter: &QueryFilter) -> StoreResult<Option<Record>> {
        self.check_available()?;
        let found = self.collections.read().get(collection).and_then(|records| {
            records
                .iter()
                .find(|r| filter.matches(r))
                .map(|r| Record::clone(r))
        });
        Ok(found)
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &QueryFilter,
        options: FindOptions,
    ) -> StoreResult<RecordStream> {
        self.check_available()?;
        let mut matched = self.snapshot(collection, filter);
        if let Some(key) = &options.sort {
            sort_records(&mut matched, &key.field, key.direction);
        }
        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        debug!(
            collection,
            matched = matched.len(),
            skip,
            "Opened in-memory cursor"
        );
        let cursor = matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|r| Ok(Record::clone(&r)));
        Ok(stream::iter(cursor).boxed())
    }

    async fn count(&self, collection: &str, filter: &QueryFilter) -> StoreResult<u64> {
        self.check_available()?;
        let count = self
            .collections
            .read()
            .get(collection)
            .map_or(0, |records| records.iter().filter(|r| filter.matches(r)).count());
        Ok(count as u64)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &QueryFilter,
        update: &FieldUpdate,
    ) -> StoreResult<u64> {
        self.check_available()?;
        let mut collections = self.collections.write();
        let Some(records) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let Some(slot) = records.iter_mut().find(|r| filter.matches(r)) else {
            return Ok(0);
        };
        let mut updated = Record::clone(slot);
        for (path, value) in update.sets() {
            apply_set(&mut updated, path, value.clone())?;
        }
        *slot = Arc::new(updated);
        Ok(1)
    }

    async fn ping(&self) -> bool {
        !self.unavailable.load(AtomicOrdering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Predicate;
    use crate::store::SortKey;
    use futures_util::TryStreamExt;

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for (i, owner) in ["a", "b", "a", "c"].iter().enumerate() {
            store.insert(
                "docs",
                Record::new()
                    .with("uuid", format!("d-{i}"))
                    .with("user_id", *owner)
                    .with("rank", 10 - i as i64),
            );
        }
        store
    }

    #[tokio::test]
    async fn test_find_many_keeps_store_order() {
        let store = seeded();
        let filter = QueryFilter::all().and(Predicate::eq("user_id", "a"));
        let records: Vec<Record> = store
            .find_many("docs", &filter, FindOptions::new())
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        let ids: Vec<_> = records.iter().filter_map(|r| r.get("uuid")?.as_str()).collect();
        assert_eq!(ids, vec!["d-0", "d-2"]);
    }

    #[tokio::test]
    async fn test_find_many_sorts_and_pages() {
        let store = seeded();
        let options = FindOptions::new()
            .sorted_by(SortKey::ascending("rank"))
            .page(1, 2);
        let records: Vec<Record> = store
            .find_many("docs", &QueryFilter::all(), options)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        let ids: Vec<_> = records.iter().filter_map(|r| r.get("uuid")?.as_str()).collect();
        assert_eq!(ids, vec!["d-2", "d-1"]);
    }

    #[tokio::test]
    async fn test_find_one_and_count() {
        let store = seeded();
        let filter = QueryFilter::all().and(Predicate::eq("uuid", "d-3"));
        let found = store.find_one("docs", &filter).await.unwrap().unwrap();
        assert_eq!(found.get("user_id"), Some(&Value::from("c")));
        assert_eq!(store.count("docs", &QueryFilter::all()).await.unwrap(), 4);
        assert!(store.find_one("missing", &filter).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_snapshot_is_isolated_from_later_writes() {
        let store = seeded();
        let stream = store
            .find_many("docs", &QueryFilter::all(), FindOptions::new())
            .await
            .unwrap();
        store.insert("docs", Record::new().with("uuid", "late"));
        let records: Vec<Record> = stream.try_collect().await.unwrap();
        assert_eq!(records.len(), 4);
    }

    #[tokio::test]
    async fn test_update_one_sets_nested_array_path() {
        let store = MemoryStore::new();
        let line = Record::new().with("uuid", "l-1").with("text", "old");
        let para = Record::new().with("lines", vec![line]);
        store.insert("docs", Record::new().with("uuid", "d").with("paragraphs", vec![para]));

        let filter = QueryFilter::all().and(Predicate::eq("uuid", "d"));
        let update = FieldUpdate::new().set("paragraphs.0.lines.0.text", "new");
        assert_eq!(store.update_one("docs", &filter, &update).await.unwrap(), 1);

        let doc = store.find_one("docs", &filter).await.unwrap().unwrap();
        assert_eq!(doc.lookup_path("paragraphs.lines.text"), vec![&Value::from("new")]);
    }

    #[tokio::test]
    async fn test_update_one_rejects_bad_path_without_partial_write() {
        let store = MemoryStore::new();
        store.insert("docs", Record::new().with("uuid", "d").with("title", "keep"));
        let filter = QueryFilter::all();
        let update = FieldUpdate::new().set("title", "changed").set("pages.3.text", "x");
        assert!(store.update_one("docs", &filter, &update).await.is_err());
        let doc = store.find_one("docs", &filter).await.unwrap().unwrap();
        assert_eq!(doc.get("title"), Some(&Value::from("keep")));
    }

    #[tokio::test]
    async fn test_update_one_without_match() {
        let store = seeded();
        let filter = QueryFilter::all().and(Predicate::eq("uuid", "nope"));
        let update = FieldUpdate::new().set("rank", 0);
        assert_eq!(store.update_one("docs", &filter, &update).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let store = seeded();
        store.set_unavailable(true);
        assert!(!store.ping().await);
        let err = store.count("docs", &QueryFilter::all()).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(store
            .find_many("docs", &QueryFilter::all(), FindOptions::new())
            .await
            .is_err());
    }

    #[test]
    fn test_seed_json() {
        let store = MemoryStore::new();
        let loaded = store
            .seed_json(&serde_json::json!({
                "docs": [{"_id": {"$oid": "65a1f0c2e4b0a1b2c3d4e5f6"}, "uuid": "d-1"}, {"uuid": "d-2"}],
                "users": [],
            }))
            .unwrap();
        assert_eq!(loaded, 2);
        assert_eq!(store.len("docs"), 2);
        assert!(store.seed_json(&serde_json::json!({"docs": {}})).is_err());
    }
}
