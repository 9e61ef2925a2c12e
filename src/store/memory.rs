use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use super::{Condition, Item, KeyQuery, Store};
use crate::error::StoreError;

struct Table {
    partition_key: String,
    sort_key: Option<String>,
    items: Vec<Item>,
}

/// In-process [`Store`] with DynamoDB key semantics.
///
/// A put replaces any item with the same key; queries return items in
/// ascending sort-key order after applying the filters. With the
/// `test-util` feature it also supports simple fault injection for
/// exercising error paths.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Table>>,
    unavailable: AtomicBool,
    rejected_partitions: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a table and its key schema.
    pub fn with_table(self, name: &str, partition_key: &str, sort_key: Option<&str>) -> Self {
        self.lock_tables().insert(
            name.to_string(),
            Table {
                partition_key: partition_key.to_string(),
                sort_key: sort_key.map(str::to_string),
                items: Vec::new(),
            },
        );
        self
    }

    /// Makes every operation fail with a backend error while `true`.
    #[cfg(any(test, feature = "test-util"))]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    /// Makes puts into the partition with string key `value` fail.
    #[cfg(any(test, feature = "test-util"))]
    pub fn reject_partition(&self, value: &str) {
        self.rejected_partitions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(value.to_string());
    }

    pub fn len(&self, table: &str) -> usize {
        self.lock_tables().get(table).map_or(0, |t| t.items.len())
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    fn lock_tables(&self) -> std::sync::MutexGuard<'_, HashMap<String, Table>> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Backend("store is unavailable".into()));
        }
        Ok(())
    }
}

/// Orders numbers numerically and strings lexically; other pairs are
/// incomparable.
fn compare(a: &AttributeValue, b: &AttributeValue) -> Option<Ordering> {
    match (a, b) {
        (AttributeValue::N(a), AttributeValue::N(b)) => {
            let a: f64 = a.parse().ok()?;
            let b: f64 = b.parse().ok()?;
            a.partial_cmp(&b)
        }
        (AttributeValue::S(a), AttributeValue::S(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn same_key(table: &Table, a: &Item, b: &Item) -> bool {
    let eq = |attr: &str| match (a.get(attr), b.get(attr)) {
        (Some(x), Some(y)) => compare(x, y) == Some(Ordering::Equal),
        _ => false,
    };
    eq(table.partition_key.as_str()) && table.sort_key.as_deref().is_none_or(eq)
}

impl MemoryStore {
    fn write(&self, table: &str, item: Item, identity: Option<&Condition>) -> Result<(), StoreError> {
        self.check_available()?;
        let mut tables = self.lock_tables();
        let t = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

        let partition = item
            .get(&t.partition_key)
            .ok_or_else(|| StoreError::Backend(format!("missing key '{}'", t.partition_key)))?;
        if let Ok(value) = partition.as_s() {
            let rejected = self
                .rejected_partitions
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .contains(value);
            if rejected {
                return Err(StoreError::Backend(format!("write to '{value}' rejected")));
            }
        }
        if let Some(sort_key) = &t.sort_key {
            if !item.contains_key(sort_key) {
                return Err(StoreError::Backend(format!("missing key '{sort_key}'")));
            }
        }

        match t.items.iter().position(|existing| same_key(t, existing, &item)) {
            Some(i) => {
                if let Some(identity) = identity {
                    if t.items[i].get(&identity.attribute) != Some(&identity.value) {
                        return Err(StoreError::Conflict(table.to_string()));
                    }
                }
                t.items[i] = item;
            }
            None => t.items.push(item),
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put(&self, table: &str, item: Item) -> Result<(), StoreError> {
        self.write(table, item, None)
    }

    async fn put_new(
        &self,
        table: &str,
        _key_attribute: &str,
        identity: &Condition,
        item: Item,
    ) -> Result<(), StoreError> {
        self.write(table, item, Some(identity))
    }

    async fn query(&self, table: &str, query: &KeyQuery) -> Result<Vec<Item>, StoreError> {
        self.check_available()?;
        let tables = self.lock_tables();
        let t = tables
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

        let attr_eq = |item: &Item, attr: &str, value: &AttributeValue| {
            item.get(attr).is_some_and(|v| v == value)
        };
        let in_range = |item: &Item| match &query.sort_range {
            None => true,
            Some(range) => item.get(&range.attribute).is_some_and(|v| {
                matches!(
                    compare(v, &range.from),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(compare(v, &range.to), Some(Ordering::Less | Ordering::Equal))
            }),
        };

        let mut items: Vec<Item> = t
            .items
            .iter()
            .filter(|item| attr_eq(item, &query.partition.attribute, &query.partition.value))
            .filter(|item| in_range(item))
            .filter(|item| {
                query
                    .filters
                    .iter()
                    .all(|f| attr_eq(item, &f.attribute, &f.value))
            })
            .cloned()
            .collect();

        if let Some(sort_key) = &t.sort_key {
            items.sort_by(|a, b| match (a.get(sort_key), b.get(sort_key)) {
                (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            });
        }
        Ok(items)
    }

    async fn scan(&self, table: &str) -> Result<Vec<Item>, StoreError> {
        self.check_available()?;
        let tables = self.lock_tables();
        let t = tables
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        Ok(t.items.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::attr::{n, s};

    fn item(pk: &str, sk: i64, line: &str) -> Item {
        HashMap::from([
            ("pk".to_string(), s(pk)),
            ("sk".to_string(), n(sk)),
            ("line".to_string(), s(line)),
        ])
    }

    fn store() -> MemoryStore {
        MemoryStore::new().with_table("t", "pk", Some("sk"))
    }

    #[tokio::test]
    async fn test_put_replaces_same_key() {
        let store = store();
        store.put("t", item("A01", 1, "RD")).await.unwrap();
        store.put("t", item("A01", 1, "BL")).await.unwrap();
        store.put("t", item("A01", 2, "RD")).await.unwrap();
        assert_eq!(store.len("t"), 2);
    }

    #[tokio::test]
    async fn test_query_orders_by_sort_key_numerically() {
        let store = store();
        for sk in [100, 9, 20] {
            store.put("t", item("A01", sk, "RD")).await.unwrap();
        }
        store.put("t", item("B02", 15, "RD")).await.unwrap();

        let query = KeyQuery::partition("pk", s("A01")).sort_between("sk", n(9), n(20));
        let items = store.query("t", &query).await.unwrap();
        let keys: Vec<_> = items.iter().map(|i| i["sk"].clone()).collect();
        assert_eq!(keys, vec![n(9), n(20)]);
    }

    #[tokio::test]
    async fn test_query_applies_filters() {
        let store = store();
        store.put("t", item("A01", 1, "RD")).await.unwrap();
        store.put("t", item("A01", 2, "BL")).await.unwrap();

        let query = KeyQuery::partition("pk", s("A01")).filter_eq("line", s("BL"));
        let items = store.query("t", &query).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["sk"], n(2));
    }

    #[tokio::test]
    async fn test_put_new_keeps_existing_item() {
        let store = store();
        let id = |v: &str| Condition {
            attribute: "line".into(),
            value: s(v),
        };
        store.put_new("t", "pk", &id("RD"), item("A01", 1, "RD")).await.unwrap();
        // Same item again is fine.
        store.put_new("t", "pk", &id("RD"), item("A01", 1, "RD")).await.unwrap();

        assert!(matches!(
            store.put_new("t", "pk", &id("BL"), item("A01", 1, "BL")).await,
            Err(StoreError::Conflict(_))
        ));
        let items = store.scan("t").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["line"], s("RD"));

        store.put_new("t", "pk", &id("BL"), item("A01", 2, "BL")).await.unwrap();
        assert_eq!(store.len("t"), 2);
    }

    #[tokio::test]
    async fn test_faults() {
        let store = store();
        assert!(matches!(
            store.scan("missing").await,
            Err(StoreError::UnknownTable(_))
        ));

        store.reject_partition("B02");
        assert!(store.put("t", item("B02", 1, "RD")).await.is_err());
        assert!(store.put("t", item("A01", 1, "RD")).await.is_ok());

        store.set_unavailable(true);
        assert!(matches!(
            store.scan("t").await,
            Err(StoreError::Backend(_))
        ));
    }
}
