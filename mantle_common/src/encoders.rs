//! Conversion of serialized models into the shape stored in MongoDB.
//!
//! Models serialize with a plain `id` key; MongoDB expects `_id`. Type-specific
//! encodings (decimals, datetimes, enums) happen earlier, at the serde layer
//! (see [crate::types]), so an encoder only deals with structure and with
//! conversions that can be decided from the BSON value alone.

use std::{fmt::Debug, sync::Arc};

use bson::{Bson, Document};
use serde::Serialize;

use crate::error::MResult;

/// A value conversion applied to every nested value of a document
pub type Conversion = Arc<dyn Fn(Bson) -> Bson + Send + Sync>;

/// Converts the serialized form of a model into a document suitable for MongoDB.
pub trait Encoder: Send + Sync + Debug {
    fn encode(&self, document: Document) -> MResult<Document>;
}

/// Applies `transform` to every value nested in `value`, recursing into the
/// transformed values that are documents or arrays. The root itself is not
/// passed to `transform`.
pub fn map_values(value: Bson, transform: &dyn Fn(Bson) -> Bson) -> Bson {
    match value {
        Bson::Document(document) => Bson::Document(map_document(document, transform)),
        Bson::Array(items) => Bson::Array(
            items
                .into_iter()
                .map(|item| map_values(transform(item), transform))
                .collect(),
        ),
        other => other,
    }
}

/// [map_values] over the values of a document
pub fn map_document(document: Document, transform: &dyn Fn(Bson) -> Bson) -> Document {
    document
        .into_iter()
        .map(|(key, value)| (key, map_values(transform(value), transform)))
        .collect()
}

/// Recursively renames `id` to `_id`. Null ids are dropped so the server assigns one.
pub fn rename_ids(document: Document) -> Document {
    let mut renamed = Document::new();
    let mut id = None;
    for (key, value) in document {
        let value = rename_nested_ids(value);
        match key.as_str() {
            "id" => id = Some(value),
            "_id" => {
                id.get_or_insert(value);
            }
            _ => {
                renamed.insert(key, value);
            }
        }
    }
    match id {
        Some(Bson::Null) | None => renamed,
        Some(id) => {
            let mut with_id = Document::new();
            with_id.insert("_id", id);
            with_id.extend(renamed);
            with_id
        }
    }
}

fn rename_nested_ids(value: Bson) -> Bson {
    match value {
        Bson::Document(document) => Bson::Document(rename_ids(document)),
        Bson::Array(items) => Bson::Array(items.into_iter().map(rename_nested_ids).collect()),
        other => other,
    }
}

/// Renames `id` to `_id` at every level of a query filter. Unlike [rename_ids],
/// a null id is kept as a condition.
pub fn rename_query_ids(filter: Document) -> Document {
    filter
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Bson::Document(document) => Bson::Document(rename_query_ids(document)),
                Bson::Array(items) => Bson::Array(
                    items
                        .into_iter()
                        .map(|item| match item {
                            Bson::Document(document) => Bson::Document(rename_query_ids(document)),
                            other => other,
                        })
                        .collect(),
                ),
                other => other,
            };
            match key.as_str() {
                "id" => (String::from("_id"), value),
                _ => (key, value),
            }
        })
        .collect()
}

/// Renders ObjectIds as their hex string
pub fn objectid_to_string(value: Bson) -> Bson {
    match value {
        Bson::ObjectId(oid) => Bson::String(oid.to_hex()),
        other => other,
    }
}

/// Renders Decimal128 values as their decimal string
pub fn decimal128_to_string(value: Bson) -> Bson {
    match value {
        Bson::Decimal128(decimal) => Bson::String(decimal.to_string()),
        other => other,
    }
}

/// Renders datetimes as RFC 3339 strings
pub fn datetime_to_string(value: Bson) -> Bson {
    match value {
        Bson::DateTime(datetime) => match datetime.try_to_rfc3339_string() {
            Ok(text) => Bson::String(text),
            Err(_) => Bson::DateTime(datetime),
        },
        other => other,
    }
}

/// Serializes any value (an enum variant, a newtype, a decimal…) into the BSON
/// value MongoDB compares against in a query.
pub fn to_bson_value<T: Serialize + ?Sized>(value: &T) -> MResult<Bson> {
    Ok(bson::to_bson(value)?)
}

/// The default encoder: configured value conversions, then `id` → `_id`.
#[derive(Clone, Default)]
pub struct BaseEncoder {
    conversions: Vec<Conversion>,
}

impl BaseEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value conversion, run after the ones already registered
    pub fn with_conversion(mut self, conversion: impl Fn(Bson) -> Bson + Send + Sync + 'static) -> Self {
        self.conversions.push(Arc::new(conversion));
        self
    }

    fn convert(&self, value: Bson) -> Bson {
        self.conversions
            .iter()
            .fold(value, |value, conversion| conversion(value))
    }
}

impl Debug for BaseEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseEncoder")
            .field("conversions", &self.conversions.len())
            .finish()
    }
}

impl Encoder for BaseEncoder {
    fn encode(&self, document: Document) -> MResult<Document> {
        let converted = if self.conversions.is_empty() {
            document
        } else {
            map_document(document, &|value| self.convert(value))
        };
        Ok(rename_ids(converted))
    }
}
