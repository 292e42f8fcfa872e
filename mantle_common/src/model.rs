use std::{collections::BTreeSet, fmt::Debug};

use bson::{Bson, Document, oid::ObjectId};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    collection::{Collection, ModelCursor},
    decoders::{BaseDecoder, Decoder},
    encoders::{
        BaseEncoder, Encoder, datetime_to_string, decimal128_to_string, map_document,
        objectid_to_string,
    },
    error::{Error, MResult},
    manager::Manager,
};

/// Field selection used by [Embedded::encode]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    pub include: Option<BTreeSet<String>>,
    pub exclude: BTreeSet<String>,
    pub exclude_none: bool,
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps only these top-level fields
    pub fn include<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Drops these top-level fields
    pub fn exclude<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Drops top-level fields that are null
    pub fn exclude_none(mut self, exclude_none: bool) -> Self {
        self.exclude_none = exclude_none;
        self
    }

    pub fn apply(&self, document: Document) -> Document {
        document
            .into_iter()
            .filter(|(key, value)| {
                self.include.as_ref().is_none_or(|include| include.contains(key))
                    && !self.exclude.contains(key)
                    && !(self.exclude_none && matches!(value, Bson::Null))
            })
            .collect()
    }
}

/// Any model that can be stored, either on its own or embedded in another model.
///
/// Implementations are normally generated by `#[model(...)]` or `#[embedded]`,
/// which add the `id` and snapshot fields this trait reads and writes.
pub trait Embedded: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Returns this document's ID, if it has been stored
    fn id(&self) -> Option<ObjectId>;

    fn set_id(&mut self, id: Option<ObjectId>);

    /// The last state of this document seen in the database, in decoded form
    fn snapshot(&self) -> Option<&Document>;

    fn set_snapshot(&mut self, snapshot: Option<Document>);

    /// The encoder used to turn this model into a MongoDB document
    fn encoder() -> Box<dyn Encoder> {
        Box::new(BaseEncoder::new())
    }

    /// The decoder used to turn a MongoDB document into this model
    fn decoder() -> Box<dyn Decoder> {
        Box::new(BaseDecoder::new())
    }

    /// Serializes the model as-is, with its id under `id`
    fn to_document(&self) -> MResult<Document> {
        Ok(bson::to_document(self)?)
    }

    /// Serializes and encodes the selected fields for MongoDB
    fn encode(&self, options: &EncodeOptions) -> MResult<Document> {
        Self::encode_document(options.apply(self.to_document()?))
    }

    /// Encodes an arbitrary document with this model's encoder
    fn encode_document(document: Document) -> MResult<Document> {
        Self::encoder().encode(document)
    }

    /// Decodes a raw MongoDB document, recording it as the snapshot
    fn from_document(document: Document) -> MResult<Self> {
        let decoded = Self::decoder().decode(document)?;
        let mut model: Self = bson::from_document(decoded.clone())?;
        model.set_snapshot(Some(decoded));
        Ok(model)
    }

    /// Validates arbitrary fields (a map, a partial struct, another model) into this model
    fn from_fields<F: Serialize + ?Sized>(fields: &F) -> MResult<Self> {
        Ok(bson::from_document(bson::to_document(fields)?)?)
    }

    /// Replaces every field with the value held in the snapshot
    fn update_from_snapshot(&mut self) -> MResult<()> {
        let Some(snapshot) = self.snapshot().cloned() else {
            return Ok(());
        };
        let mut refreshed: Self = bson::from_document(snapshot.clone())?;
        refreshed.set_snapshot(Some(snapshot));
        *self = refreshed;
        Ok(())
    }

    /// Renders the model as plain JSON: ObjectIds as hex strings, datetimes as
    /// RFC 3339 strings and decimals as decimal strings
    fn to_json(&self) -> MResult<String> {
        let document = map_document(self.to_document()?, &|value| {
            datetime_to_string(decimal128_to_string(objectid_to_string(value)))
        });
        Ok(serde_json::to_string(&Bson::Document(document).into_relaxed_extjson())?)
    }
}

/// A model bound to a collection. Likely should not be directly implemented, but instead generated with the `#[model(...)]` attribute.
#[async_trait::async_trait]
pub trait Model: Embedded {
    /// Alias of the database in the [Manager]
    fn database_alias() -> Option<&'static str>;

    fn collection_name() -> Option<&'static str>;

    /// Returns the configured (database alias, collection name) pair
    fn binding() -> MResult<(&'static str, &'static str)> {
        match (Self::database_alias(), Self::collection_name()) {
            (Some(alias), Some(name)) => Ok((alias, name)),
            _ => Err(Error::NotConfigured(std::any::type_name::<Self>())),
        }
    }

    /// Resolves this model's collection through the given manager
    fn collection_in(manager: &Manager) -> MResult<Collection<Self>> {
        let (alias, name) = Self::binding()?;
        let client = manager
            .get(alias)
            .ok_or_else(|| Error::UnknownDatabase(alias.to_string()))?;
        Ok(client.collection::<Self>(name))
    }

    /// Resolves this model's collection through the global manager
    fn collection() -> MResult<Collection<Self>> {
        Self::binding()?;
        Self::collection_in(Manager::try_global()?)
    }

    /// Creates and stores a document from a map, a partial struct or a model
    async fn create<F: Serialize + Sync + ?Sized>(fields: &F) -> MResult<Self> {
        let mut model = Self::from_fields(fields)?;
        model.save().await?;
        Ok(model)
    }

    /// Counts the documents matching `filter`, or all documents
    async fn count(filter: Option<Document>) -> MResult<u64> {
        Self::collection()?.count(filter.unwrap_or_default()).await
    }

    async fn find_one(filter: Document) -> MResult<Option<Self>> {
        Self::collection()?.find_one(filter).await
    }

    async fn find_many(filter: Document) -> MResult<Vec<Self>> {
        Self::collection()?.find_many(filter).await
    }

    /// Returns a cursor over the documents matching `filter`
    async fn find(filter: Document) -> MResult<ModelCursor<Self>> {
        Self::collection()?.find(filter).await
    }

    /// Stores many documents at once
    async fn bulk_create<F: Serialize + Sync>(items: &[F]) -> MResult<Vec<Self>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let models = items
            .iter()
            .map(Self::from_fields)
            .collect::<MResult<Vec<_>>>()?;
        Self::collection()?.insert_many(models).await
    }

    /// Applies `update` to every matching document and returns them as updated
    async fn update_many(filter: Document, update: Document) -> MResult<Vec<Self>> {
        Self::collection()?.update_many(filter, update).await
    }

    /// Reloads this model from the database
    async fn reload(&mut self) -> MResult<&mut Self> {
        if self.id().is_none() {
            return Err(Error::MissingId);
        }
        Self::collection()?.reload(self).await?;
        Ok(self)
    }

    /// Sets the given fields in the database and refreshes this model from the result
    async fn update<F: Serialize + Sync + ?Sized>(&mut self, fields: &F) -> MResult<&mut Self> {
        if self.id().is_none() {
            return Err(Error::MissingId);
        }
        Self::collection()?.update(self, fields).await?;
        Ok(self)
    }

    /// Inserts this model, or writes the fields changed since the last snapshot
    async fn save(&mut self) -> MResult<&mut Self> {
        Self::collection()?.save(self).await?;
        Ok(self)
    }

    /// Deletes this document, returning the number of deleted documents
    async fn delete(&mut self) -> MResult<u64> {
        if self.id().is_none() {
            return Err(Error::MissingId);
        }
        Self::collection()?.delete(self).await
    }
}
