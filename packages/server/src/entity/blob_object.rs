use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "blob_object")]
pub struct Model {
    /// SHA-256 content hash.
    #[sea_orm(primary_key, auto_increment = false)]
    pub content_hash: String,

    /// Size of the blob in bytes.
    pub size: i64,

    pub created_at: DateTimeUtc,

    /// Last time an item write pointed at this blob. Garbage collection
    /// keeps unreferenced blobs until this is older than the grace period.
    pub last_referenced_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
