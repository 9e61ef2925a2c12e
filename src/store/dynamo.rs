use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;
use tracing::debug;

use super::{Condition, Item, KeyQuery, Store};
use crate::error::StoreError;

/// [`Store`] backed by DynamoDB.
///
/// Tables are expected to exist already; provisioning is not handled here.
#[derive(Clone)]
pub struct DynamoStore {
    client: aws_sdk_dynamodb::Client,
}

impl DynamoStore {
    /// Creates a store using the ambient AWS configuration, optionally
    /// pointed at a different endpoint such as a local DynamoDB.
    pub async fn connect(endpoint: Option<&str>) -> Self {
        let config = aws_config::load_from_env().await;
        let mut builder = aws_sdk_dynamodb::config::Builder::from(&config);
        if let Some(url) = endpoint {
            builder = builder.endpoint_url(url);
        }
        Self {
            client: aws_sdk_dynamodb::Client::from_conf(builder.build()),
        }
    }
}

fn backend<E: std::error::Error>(err: E) -> StoreError {
    StoreError::Backend(DisplayErrorContext(err).to_string())
}

/// Expression strings and placeholder maps for a [`KeyQuery`].
#[derive(Debug, PartialEq)]
pub(crate) struct Expressions {
    pub key_condition: String,
    pub filter: Option<String>,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, AttributeValue>,
}

impl KeyQuery {
    pub(crate) fn expressions(&self) -> Expressions {
        let mut names = HashMap::new();
        let mut values = HashMap::new();

        names.insert("#pk".to_string(), self.partition.attribute.clone());
        values.insert(":pk".to_string(), self.partition.value.clone());
        let mut key_condition = "#pk = :pk".to_string();

        if let Some(range) = &self.sort_range {
            names.insert("#sk".to_string(), range.attribute.clone());
            values.insert(":sk_from".to_string(), range.from.clone());
            values.insert(":sk_to".to_string(), range.to.clone());
            key_condition.push_str(" AND #sk BETWEEN :sk_from AND :sk_to");
        }

        let clauses: Vec<String> = self
            .filters
            .iter()
            .enumerate()
            .map(|(i, condition)| {
                names.insert(format!("#f{i}"), condition.attribute.clone());
                values.insert(format!(":f{i}"), condition.value.clone());
                format!("#f{i} = :f{i}")
            })
            .collect();
        let filter = (!clauses.is_empty()).then(|| clauses.join(" AND "));

        Expressions {
            key_condition,
            filter,
            names,
            values,
        }
    }
}

#[async_trait]
impl Store for DynamoStore {
    async fn put(&self, table: &str, item: Item) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn put_new(
        &self,
        table: &str,
        key_attribute: &str,
        identity: &Condition,
        item: Item,
    ) -> Result<(), StoreError> {
        let result = self
            .client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(#key) OR #id = :id")
            .expression_attribute_names("#key", key_attribute)
            .expression_attribute_names("#id", &identity.attribute)
            .expression_attribute_values(":id", identity.value.clone())
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Err(StoreError::Conflict(table.to_string()))
            }
            Err(err) => Err(backend(err)),
        }
    }

    #[tracing::instrument(skip(self, query), fields(partition = ?query.partition.value))]
    async fn query(&self, table: &str, query: &KeyQuery) -> Result<Vec<Item>, StoreError> {
        let expr = query.expressions();
        let mut items = Vec::new();
        let mut start_key = None;

        loop {
            let output = self
                .client
                .query()
                .table_name(table)
                .key_condition_expression(&expr.key_condition)
                .set_filter_expression(expr.filter.clone())
                .set_expression_attribute_names(Some(expr.names.clone()))
                .set_expression_attribute_values(Some(expr.values.clone()))
                .scan_index_forward(true)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(backend)?;

            items.extend(output.items.unwrap_or_default());
            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        debug!(items = items.len(), "Query complete");
        Ok(items)
    }

    #[tracing::instrument(skip(self))]
    async fn scan(&self, table: &str) -> Result<Vec<Item>, StoreError> {
        let mut items = Vec::new();
        let mut start_key = None;

        loop {
            let output = self
                .client
                .scan()
                .table_name(table)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(backend)?;

            items.extend(output.items.unwrap_or_default());
            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        debug!(items = items.len(), "Scan complete");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::attr::{n, s};

    #[test]
    fn test_key_condition_and_filter() {
        let query = KeyQuery::partition("locationCode", s("A01"))
            .sort_between("createdEpochMs", n(100), n(200))
            .filter_eq("lineCode", s("RD"))
            .filter_eq("destination", s("Shady Grove"));
        let expr = query.expressions();

        assert_eq!(
            expr.key_condition,
            "#pk = :pk AND #sk BETWEEN :sk_from AND :sk_to"
        );
        assert_eq!(expr.filter.as_deref(), Some("#f0 = :f0 AND #f1 = :f1"));
        assert_eq!(expr.names["#sk"], "createdEpochMs");
        assert_eq!(expr.names["#f1"], "destination");
        assert_eq!(expr.values[":sk_from"], n(100));
        assert_eq!(expr.values[":f0"], s("RD"));
    }

    #[test]
    fn test_no_filters_means_no_filter_expression() {
        let expr = KeyQuery::partition("code", s("A01")).expressions();
        assert_eq!(expr.key_condition, "#pk = :pk");
        assert!(expr.filter.is_none());
        assert_eq!(expr.names.len(), 1);
    }
}
