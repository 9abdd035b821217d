use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "compression_record")]
pub struct Model {
    /// UUIDv7 primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Filename as uploaded. Untrusted; never used as a path.
    pub original_name: String,

    /// Name the blob was stored under (`{millis}_compressed_{original_name}`).
    pub compressed_name: String,

    /// Owned blob. Exactly one record per blob.
    #[sea_orm(unique)]
    pub blob_id: Uuid,

    pub original_size: i64,

    pub compressed_size: i64,

    /// Declared content type of the upload.
    pub mime_type: String,

    /// Content type of the stored blob.
    pub compressed_mime_type: String,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
