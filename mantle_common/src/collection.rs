use std::{marker::PhantomData, pin::Pin, task::{Context, Poll}};

use bson::{Bson, Document, doc, oid::ObjectId};
use futures_core::Stream;
use futures_util::TryStreamExt;
use mongodb::{Cursor, options::ReturnDocument};
use serde::Serialize;

use crate::{
    client::Client,
    encoders::rename_query_ids,
    error::{Error, MResult},
    model::{EncodeOptions, Model},
};

/// A MongoDB collection holding documents of one model type.
#[derive(Clone, Debug)]
pub struct Collection<M: Model> {
    collection: mongodb::Collection<Document>,
    client: Client,
    _model: PhantomData<fn() -> M>,
}

/// A stream of models decoded from a MongoDB cursor
#[pin_project::pin_project]
pub struct ModelCursor<M: Model> {
    #[pin]
    cursor: Cursor<Document>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> ModelCursor<M> {
    pub(crate) fn new(cursor: Cursor<Document>) -> Self {
        Self {
            cursor,
            _model: PhantomData,
        }
    }
}

impl<M: Model> Stream for ModelCursor<M> {
    type Item = MResult<M>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.project().cursor.poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e.into()))),
            Poll::Ready(Some(Ok(document))) => Poll::Ready(Some(M::from_document(document))),
        }
    }
}

fn object_id(inserted: &Bson) -> MResult<ObjectId> {
    inserted
        .as_object_id()
        .ok_or_else(|| Error::UnexpectedId(inserted.clone()))
}

impl<M: Model> Collection<M> {
    pub(crate) fn new(collection: mongodb::Collection<Document>, client: Client) -> Self {
        Self {
            collection,
            client,
            _model: PhantomData,
        }
    }

    /// The untyped driver collection
    pub fn inner(&self) -> &mongodb::Collection<Document> {
        &self.collection
    }

    pub fn name(&self) -> &str {
        self.collection.name()
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn count(&self, filter: Document) -> MResult<u64> {
        let filter = rename_query_ids(filter);
        tracing::debug!(collection = self.name(), ?filter, "count");
        Ok(self.collection.count_documents(filter).await?)
    }

    pub async fn find_one(&self, filter: Document) -> MResult<Option<M>> {
        let filter = rename_query_ids(filter);
        tracing::debug!(collection = self.name(), ?filter, "find one");
        match self.collection.find_one(filter).await? {
            Some(document) => Ok(Some(M::from_document(document)?)),
            None => Ok(None),
        }
    }

    /// Fetches a document by its `_id`
    pub async fn get(&self, id: ObjectId) -> MResult<Option<M>> {
        self.find_one(doc! { "_id": id }).await
    }

    pub async fn find(&self, filter: Document) -> MResult<ModelCursor<M>> {
        let filter = rename_query_ids(filter);
        tracing::debug!(collection = self.name(), ?filter, "find");
        Ok(ModelCursor::new(self.collection.find(filter).await?))
    }

    pub async fn find_many(&self, filter: Document) -> MResult<Vec<M>> {
        self.find(filter).await?.try_collect().await
    }

    /// Inserts a model, recording the assigned id and the snapshot
    pub async fn insert(&self, model: &mut M) -> MResult<ObjectId> {
        let encoded = model.encode(&EncodeOptions::default())?;
        tracing::debug!(collection = self.name(), "insert one");
        let result = self.collection.insert_one(encoded).await?;
        let id = object_id(&result.inserted_id)?;
        model.set_id(Some(id));
        let snapshot = model.to_document()?;
        model.set_snapshot(Some(snapshot));
        Ok(id)
    }

    /// Inserts every model in one round trip
    pub async fn insert_many(&self, models: Vec<M>) -> MResult<Vec<M>> {
        if models.is_empty() {
            return Ok(Vec::new());
        }
        let encoded = models
            .iter()
            .map(|model| model.encode(&EncodeOptions::default()))
            .collect::<MResult<Vec<_>>>()?;
        tracing::debug!(collection = self.name(), count = encoded.len(), "insert many");
        let result = self.collection.insert_many(encoded).await?;

        let mut inserted = Vec::with_capacity(models.len());
        for (index, mut model) in models.into_iter().enumerate() {
            if let Some(id) = result.inserted_ids.get(&index) {
                model.set_id(Some(object_id(id)?));
            }
            let snapshot = model.to_document()?;
            model.set_snapshot(Some(snapshot));
            inserted.push(model);
        }
        Ok(inserted)
    }

    /// Inserts a new model, or writes the fields that changed since its snapshot
    pub async fn save(&self, model: &mut M) -> MResult<()> {
        let Some(id) = model.id() else {
            self.insert(model).await?;
            return Ok(());
        };

        let current = model.to_document()?;
        let Some(snapshot) = model.snapshot().cloned() else {
            tracing::warn!(collection = self.name(), %id, "saving a model without snapshot, replacing the stored document");
            let encoded = model.encode(&EncodeOptions::default())?;
            self.collection
                .replace_one(doc! { "_id": id }, encoded)
                .upsert(true)
                .await?;
            model.set_snapshot(Some(current));
            return Ok(());
        };

        let changed = current
            .into_iter()
            .filter(|(key, value)| key != "id" && snapshot.get(key) != Some(value))
            .collect::<Document>();
        if changed.is_empty() {
            tracing::debug!(collection = self.name(), %id, "nothing to save");
            return Ok(());
        }

        tracing::debug!(collection = self.name(), %id, fields = ?changed.keys().collect::<Vec<_>>(), "update one");
        let encoded = M::encode_document(changed.clone())?;
        self.collection
            .update_one(doc! { "_id": id }, doc! { "$set": encoded })
            .await?;

        let mut snapshot = snapshot;
        snapshot.extend(changed);
        model.set_snapshot(Some(snapshot));
        Ok(())
    }

    /// Sets `fields` on the stored document and refreshes the model from the result
    pub async fn update<F: Serialize + ?Sized>(&self, model: &mut M, fields: &F) -> MResult<()> {
        let id = model.id().ok_or(Error::MissingId)?;
        let mut fields = bson::to_document(fields)?;
        fields.remove("id");
        fields.remove("_id");
        if fields.is_empty() {
            return Ok(());
        }

        let encoded = M::encode_document(fields)?;
        tracing::debug!(collection = self.name(), %id, "find one and update");
        let updated = self
            .collection
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": encoded })
            .return_document(ReturnDocument::After)
            .await?;

        if let Some(raw) = updated {
            let mut snapshot = model.snapshot().cloned().unwrap_or_default();
            snapshot.extend(M::decoder().decode(raw)?);
            model.set_snapshot(Some(snapshot));
            model.update_from_snapshot()?;
        }
        Ok(())
    }

    /// Applies `update` to every matching document and returns them as stored afterwards
    pub async fn update_many(&self, filter: Document, update: Document) -> MResult<Vec<M>> {
        let ids = self
            .collection
            .find(rename_query_ids(filter))
            .projection(doc! { "_id": 1 })
            .await?
            .try_collect::<Vec<Document>>()
            .await?
            .into_iter()
            .filter_map(|mut document| document.remove("_id"))
            .collect::<Vec<Bson>>();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let selection = doc! { "_id": { "$in": ids } };
        let result = self
            .collection
            .update_many(selection.clone(), update)
            .await?;
        tracing::debug!(
            collection = self.name(),
            matched = result.matched_count,
            modified = result.modified_count,
            "update many"
        );
        self.find_many(selection).await
    }

    /// Replaces the model with its stored state; a deleted document leaves it untouched
    pub async fn reload(&self, model: &mut M) -> MResult<()> {
        let id = model.id().ok_or(Error::MissingId)?;
        tracing::debug!(collection = self.name(), %id, "reload");
        if let Some(raw) = self.collection.find_one(doc! { "_id": id }).await? {
            model.set_snapshot(Some(M::decoder().decode(raw)?));
            model.update_from_snapshot()?;
        }
        Ok(())
    }

    /// Deletes the stored document and empties the snapshot. The id is kept, so a
    /// later [Collection::save] updates nothing instead of recreating the document.
    pub async fn delete(&self, model: &mut M) -> MResult<u64> {
        let id = model.id().ok_or(Error::MissingId)?;
        tracing::debug!(collection = self.name(), %id, "delete one");
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        model.set_snapshot(Some(Document::new()));
        Ok(result.deleted_count)
    }
}
