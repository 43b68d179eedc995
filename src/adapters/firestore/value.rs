//! Firestore REST typed values and their plain-JSON equivalents.
//!
//! The REST API wraps every field in a single-key object naming its type
//! (`{"stringValue": "F24"}`); documents are handed to the migrator as
//! ordinary JSON, so everything crossing the adapter goes through here.
//!
//! The mapping is lossy for types JSON has no word for. `timestampValue`,
//! `bytesValue` and `referenceValue` decode to plain strings and a
//! `geoPointValue` to a `{latitude, longitude}` map; encoding them again
//! yields `stringValue` and `mapValue`. Migrated documents only carry
//! strings, lists and maps, so writes are unaffected, but a backup file
//! is not a byte-faithful export of such fields.

use crate::utils::error::{MigratorError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FirestoreValue {
    NullValue(()),
    BooleanValue(bool),
    /// int64 travels as a decimal string.
    IntegerValue(String),
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(GeoPoint),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<FirestoreValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, FirestoreValue>,
}

/// A document resource as returned by `get`/`list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirestoreDocument {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FirestoreValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    #[serde(default)]
    pub documents: Vec<FirestoreDocument>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl FirestoreValue {
    pub fn to_json(&self) -> Result<Value> {
        Ok(match self {
            Self::NullValue(()) => Value::Null,
            Self::BooleanValue(b) => Value::Bool(*b),
            Self::IntegerValue(raw) => {
                let n: i64 = raw.parse().map_err(|_| MigratorError::DecodeError {
                    message: format!("integerValue '{}' is not a valid int64", raw),
                })?;
                Value::Number(n.into())
            }
            Self::DoubleValue(d) => Number::from_f64(*d)
                .map(Value::Number)
                .ok_or_else(|| MigratorError::DecodeError {
                    message: format!("doubleValue {} has no JSON representation", d),
                })?,
            Self::TimestampValue(s)
            | Self::StringValue(s)
            | Self::BytesValue(s)
            | Self::ReferenceValue(s) => Value::String(s.clone()),
            Self::GeoPointValue(point) => {
                let mut map = Map::new();
                map.insert("latitude".to_string(), float(point.latitude)?);
                map.insert("longitude".to_string(), float(point.longitude)?);
                Value::Object(map)
            }
            Self::ArrayValue(array) => Value::Array(
                array
                    .values
                    .iter()
                    .map(FirestoreValue::to_json)
                    .collect::<Result<_>>()?,
            ),
            Self::MapValue(map) => Value::Object(fields_to_json(&map.fields)?),
        })
    }

    /// Strings always become `stringValue`; see the module docs.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::NullValue(()),
            Value::Bool(b) => Self::BooleanValue(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::IntegerValue(i.to_string()),
                None => Self::DoubleValue(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::StringValue(s.clone()),
            Value::Array(values) => Self::ArrayValue(ArrayValue {
                values: values.iter().map(FirestoreValue::from_json).collect(),
            }),
            Value::Object(map) => Self::MapValue(MapValue {
                fields: fields_from_json(map),
            }),
        }
    }
}

pub fn fields_to_json(fields: &BTreeMap<String, FirestoreValue>) -> Result<Map<String, Value>> {
    fields
        .iter()
        .map(|(key, value)| Ok((key.clone(), value.to_json()?)))
        .collect()
}

pub fn fields_from_json(map: &Map<String, Value>) -> BTreeMap<String, FirestoreValue> {
    map.iter()
        .map(|(key, value)| (key.clone(), FirestoreValue::from_json(value)))
        .collect()
}

fn float(value: f64) -> Result<Value> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| MigratorError::DecodeError {
            message: format!("coordinate {} has no JSON representation", value),
        })
}
