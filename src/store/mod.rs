//! Key/sort-key storage seam.
//!
//! [`Store`] is the only durable state the crate talks to. [`DynamoStore`]
//! backs it with DynamoDB; [`MemoryStore`] keeps the same semantics in
//! process. Items cross the seam as DynamoDB attribute maps and are decoded
//! into typed records by [`codec`].

pub mod attr;
pub mod codec;
mod dynamo;
mod memory;

pub use dynamo::DynamoStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

use crate::error::StoreError;

pub type Item = HashMap<String, AttributeValue>;

/// `attribute == value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub attribute: String,
    pub value: AttributeValue,
}

/// Inclusive sort-key range.
#[derive(Debug, Clone, PartialEq)]
pub struct SortRange {
    pub attribute: String,
    pub from: AttributeValue,
    pub to: AttributeValue,
}

/// One partition, an optional sort-key range, and equality filters that the
/// backend applies before returning items.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyQuery {
    pub partition: Condition,
    pub sort_range: Option<SortRange>,
    pub filters: Vec<Condition>,
}

impl KeyQuery {
    pub fn partition(attribute: &str, value: AttributeValue) -> Self {
        Self {
            partition: Condition {
                attribute: attribute.to_string(),
                value,
            },
            sort_range: None,
            filters: Vec::new(),
        }
    }

    pub fn sort_between(mut self, attribute: &str, from: AttributeValue, to: AttributeValue) -> Self {
        self.sort_range = Some(SortRange {
            attribute: attribute.to_string(),
            from,
            to,
        });
        self
    }

    pub fn filter_eq(mut self, attribute: &str, value: AttributeValue) -> Self {
        self.filters.push(Condition {
            attribute: attribute.to_string(),
            value,
        });
        self
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Writes `item`, replacing any item with the same key.
    async fn put(&self, table: &str, item: Item) -> Result<(), StoreError>;

    /// Writes `item` unless a different item already holds its key.
    ///
    /// An existing item is only replaced when its `identity` attribute equals
    /// `identity.value`, so writing the same item twice succeeds. Otherwise
    /// fails with [`StoreError::Conflict`].
    async fn put_new(
        &self,
        table: &str,
        key_attribute: &str,
        identity: &Condition,
        item: Item,
    ) -> Result<(), StoreError>;

    /// Items matching `query`, in ascending sort-key order.
    async fn query(&self, table: &str, query: &KeyQuery) -> Result<Vec<Item>, StoreError>;

    async fn scan(&self, table: &str) -> Result<Vec<Item>, StoreError>;
}
