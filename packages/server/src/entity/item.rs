use common::DomainType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "item")]
pub struct Model {
    /// UUIDv7 primary key. Also the listing order and cursor key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique_key = "owner_name")]
    pub owner_id: String,

    /// Path below the synthetic root, `/`-separated. Never empty.
    #[sea_orm(unique_key = "owner_name")]
    pub name: String,

    pub mime_type: String,

    /// SHA-256 hex of the content; the blob lives in the blob store.
    pub content_hash: String,
    pub content_size: i64,

    /// Fields decoded from the content. Empty strings when the content is
    /// not a domain object.
    pub domain_id: String,
    pub domain_parent_id: String,
    pub domain_type: DomainType,
    pub domain_title: String,
    pub encryption_applied: bool,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
