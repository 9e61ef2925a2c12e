//! Typed access to attribute maps.

use aws_sdk_dynamodb::types::AttributeValue;
use std::fmt::Display;
use std::str::FromStr;

use super::Item;
use crate::error::StoreError;

pub fn s(value: impl Into<String>) -> AttributeValue {
    AttributeValue::S(value.into())
}

pub fn n(value: impl Display) -> AttributeValue {
    AttributeValue::N(value.to_string())
}

pub fn list_of_s<I, T>(values: I) -> AttributeValue
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    AttributeValue::L(values.into_iter().map(|v| s(v)).collect())
}

fn get<'a>(item: &'a Item, name: &str) -> Result<&'a AttributeValue, StoreError> {
    item.get(name)
        .ok_or_else(|| StoreError::decode(name, "attribute is missing"))
}

pub fn get_s(item: &Item, name: &str) -> Result<String, StoreError> {
    get(item, name)?
        .as_s()
        .cloned()
        .map_err(|_| StoreError::decode(name, "expected a string"))
}

pub fn get_n<T>(item: &Item, name: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = get(item, name)?
        .as_n()
        .map_err(|_| StoreError::decode(name, "expected a number"))?;
    raw.parse()
        .map_err(|e: T::Err| StoreError::decode(name, format!("'{raw}': {e}")))
}

pub fn get_l<'a>(item: &'a Item, name: &str) -> Result<&'a [AttributeValue], StoreError> {
    get(item, name)?
        .as_l()
        .map(Vec::as_slice)
        .map_err(|_| StoreError::decode(name, "expected a list"))
}

/// A list of strings; a missing attribute reads as empty.
pub fn get_string_list(item: &Item, name: &str) -> Result<Vec<String>, StoreError> {
    if !item.contains_key(name) {
        return Ok(Vec::new());
    }
    get_l(item, name)?
        .iter()
        .map(|v| {
            v.as_s()
                .cloned()
                .map_err(|_| StoreError::decode(name, "expected a list of strings"))
        })
        .collect()
}
