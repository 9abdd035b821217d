use async_trait::async_trait;
use chrono::Utc;
use common::storage::BlobId;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::{CompressionRecord, MetadataError, MetadataStore, NewCompressionRecord};
use crate::entity::compression_record;

/// [`MetadataStore`] backed by the `compression_record` table.
#[derive(Clone)]
pub struct SeaOrmMetadataStore {
    db: DatabaseConnection,
}

impl SeaOrmMetadataStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_db_size(size: u64) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}

#[async_trait]
impl MetadataStore for SeaOrmMetadataStore {
    async fn insert(
        &self,
        record: NewCompressionRecord,
    ) -> Result<CompressionRecord, MetadataError> {
        let model = compression_record::ActiveModel {
            id: Set(Uuid::now_v7()),
            original_name: Set(record.original_name),
            compressed_name: Set(record.compressed_name),
            blob_id: Set(record.blob_id.as_uuid()),
            original_size: Set(to_db_size(record.original_size_bytes)),
            compressed_size: Set(to_db_size(record.compressed_size_bytes)),
            mime_type: Set(record.mime_type),
            compressed_mime_type: Set(record.compressed_mime_type),
            created_at: Set(Utc::now()),
        };

        let saved = model.insert(&self.db).await?;
        Ok(saved.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<CompressionRecord, MetadataError> {
        compression_record::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(CompressionRecord::from)
            .ok_or_else(|| MetadataError::NotFound(format!("File {id} not found")))
    }

    async fn find_by_blob_id(&self, blob_id: &BlobId) -> Result<CompressionRecord, MetadataError> {
        compression_record::Entity::find()
            .filter(compression_record::Column::BlobId.eq(blob_id.as_uuid()))
            .one(&self.db)
            .await?
            .map(CompressionRecord::from)
            .ok_or_else(|| MetadataError::NotFound(format!("No file stored as {blob_id}")))
    }

    async fn list_all(&self) -> Result<Vec<CompressionRecord>, MetadataError> {
        let rows = compression_record::Entity::find()
            .order_by_desc(compression_record::Column::CreatedAt)
            .order_by_desc(compression_record::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(CompressionRecord::from).collect())
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), MetadataError> {
        let result = compression_record::Entity::delete_by_id(id)
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(MetadataError::NotFound(format!("File {id} not found")));
        }
        Ok(())
    }
}
