//! Conversion of stored MongoDB documents back into the shape models deserialize from.

use std::{fmt::Debug, sync::Arc};

use bson::{Bson, Document};

use crate::{encoders::Conversion, error::MResult};

/// Converts a raw MongoDB document into the plain serialized form of a model.
pub trait Decoder: Send + Sync + Debug {
    fn decode(&self, document: Document) -> MResult<Document>;
}

/// The default decoder. Moves `_id` to `id` in the document and in every
/// nested document, including documents inside arrays. Any stored `id` key is
/// discarded in favour of `_id`.
#[derive(Clone, Default)]
pub struct BaseDecoder {
    conversions: Vec<Conversion>,
}

impl BaseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a conversion applied to every scalar value after renaming
    pub fn with_conversion(mut self, conversion: impl Fn(Bson) -> Bson + Send + Sync + 'static) -> Self {
        self.conversions.push(Arc::new(conversion));
        self
    }

    fn decode_document(&self, mut document: Document) -> Document {
        document.remove("id");
        let mut decoded = Document::new();
        if let Some(id) = document.remove("_id") {
            decoded.insert("id", self.decode_value(id));
        }
        for (key, value) in document {
            decoded.insert(key, self.decode_value(value));
        }
        decoded
    }

    fn decode_value(&self, value: Bson) -> Bson {
        match value {
            Bson::Document(document) => Bson::Document(self.decode_document(document)),
            Bson::Array(items) => {
                Bson::Array(items.into_iter().map(|item| self.decode_value(item)).collect())
            }
            scalar => self
                .conversions
                .iter()
                .fold(scalar, |value, conversion| conversion(value)),
        }
    }
}

impl Debug for BaseDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseDecoder")
            .field("conversions", &self.conversions.len())
            .finish()
    }
}

impl Decoder for BaseDecoder {
    fn decode(&self, document: Document) -> MResult<Document> {
        Ok(self.decode_document(document))
    }
}
