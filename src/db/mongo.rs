//! MongoDB client and collection wrapper

use bson::{doc, oid::ObjectId, Document};
use futures_util::StreamExt;
use mongodb::{
    options::{IndexOptions, ReturnDocument, UpdateModifications},
    results::{DeleteResult, UpdateResult},
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::types::PastureError;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, PastureError> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| PastureError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        // Verify connection with timeout
        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| PastureError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, PastureError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, PastureError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        // Apply indexes
        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), PastureError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| PastureError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document
    pub async fn insert_one(&self, item: T) -> Result<ObjectId, PastureError> {
        let result = self
            .inner
            .insert_one(item)
            .await
            .map_err(|e| PastureError::Database(format!("Insert failed: {}", e)))?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| PastureError::Database("Failed to get inserted ID".into()))
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, PastureError> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| PastureError::Database(format!("Find failed: {}", e)))
    }

    /// Find many documents by filter
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>, PastureError> {
        let cursor = self
            .inner
            .find(filter)
            .await
            .map_err(|e| PastureError::Database(format!("Find failed: {}", e)))?;

        Self::drain(cursor).await
    }

    /// Find many documents, capped at `limit`
    pub async fn find_many_with_limit(
        &self,
        filter: Document,
        limit: i64,
    ) -> Result<Vec<T>, PastureError> {
        let cursor = self
            .inner
            .find(filter)
            .limit(limit)
            .await
            .map_err(|e| PastureError::Database(format!("Find failed: {}", e)))?;

        Self::drain(cursor).await
    }

    async fn drain(mut cursor: mongodb::Cursor<T>) -> Result<Vec<T>, PastureError> {
        let mut results = Vec::new();
        while let Some(item) = cursor.next().await {
            let item =
                item.map_err(|e| PastureError::Database(format!("Cursor read failed: {}", e)))?;
            results.push(item);
        }
        Ok(results)
    }

    /// Count documents matching a filter
    pub async fn count_documents(&self, filter: Document) -> Result<u64, PastureError> {
        self.inner
            .count_documents(filter)
            .await
            .map_err(|e| PastureError::Database(format!("Count failed: {}", e)))
    }

    /// Update one document
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult, PastureError> {
        self.inner
            .update_one(filter, update.into())
            .await
            .map_err(|e| PastureError::Database(format!("Update failed: {}", e)))
    }

    /// Atomically apply an update and return the post-update document
    pub async fn find_one_and_update(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<Option<T>, PastureError> {
        self.inner
            .find_one_and_update(filter, update.into())
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| PastureError::Database(format!("Update failed: {}", e)))
    }

    /// Delete one document
    pub async fn delete_one(&self, filter: Document) -> Result<DeleteResult, PastureError> {
        self.inner
            .delete_one(filter)
            .await
            .map_err(|e| PastureError::Database(format!("Delete failed: {}", e)))
    }

    /// Run an aggregation pipeline, returning raw documents
    pub async fn aggregate(&self, pipeline: Vec<Document>) -> Result<Vec<Document>, PastureError> {
        let mut cursor = self
            .inner
            .aggregate(pipeline)
            .await
            .map_err(|e| PastureError::Database(format!("Aggregation failed: {}", e)))?;

        let mut results = Vec::new();
        while let Some(item) = cursor.next().await {
            let item =
                item.map_err(|e| PastureError::Database(format!("Cursor read failed: {}", e)))?;
            results.push(item);
        }
        Ok(results)
    }

    /// Get the underlying collection for advanced operations
    pub fn inner(&self) -> &Collection<T> {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    // Integration tests would require a running MongoDB instance
}
