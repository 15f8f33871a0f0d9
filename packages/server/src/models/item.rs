use chrono::{DateTime, Utc};
use common::DomainType;
use serde::{Deserialize, Serialize};

use crate::entity::item;
use crate::store::Page;

/// Response DTO for a single item. Never carries the content itself.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ItemResponse {
    /// Item ID (UUIDv7).
    #[schema(example = "01936f0e-1234-7abc-8000-000000000001")]
    pub id: String,
    /// Path below the root, `/`-separated.
    #[schema(example = "locks/1.json")]
    pub name: String,
    #[schema(example = "application/json")]
    pub mime_type: String,
    /// Content length in bytes.
    #[schema(example = 25)]
    pub content_size: i64,
    /// SHA-256 of the content, also served as the `ETag`.
    #[schema(example = "a1b2c3d4e5f6...")]
    pub content_hash: String,
    /// Empty when the content is not a domain object.
    #[schema(example = "00000000000000000000000000000001")]
    pub domain_id: String,
    #[schema(example = "000000000000000000000000000000f1")]
    pub domain_parent_id: String,
    pub domain_type: DomainType,
    #[schema(example = "Shopping list")]
    pub domain_title: String,
    pub encryption_applied: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<item::Model> for ItemResponse {
    fn from(model: item::Model) -> Self {
        Self {
            id: model.id.to_string(),
            name: model.name,
            mime_type: model.mime_type,
            content_size: model.content_size,
            content_hash: model.content_hash,
            domain_id: model.domain_id,
            domain_parent_id: model.domain_parent_id,
            domain_type: model.domain_type,
            domain_title: model.domain_title,
            encryption_applied: model.encryption_applied,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// One page of a children listing.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ChildrenResponse {
    pub items: Vec<ItemResponse>,
    /// Pass back as `cursor` to fetch the next page. `null` on the last page.
    #[schema(example = "0193...")]
    pub cursor: Option<String>,
    pub has_more: bool,
}

impl From<Page> for ChildrenResponse {
    fn from(page: Page) -> Self {
        Self {
            items: page.items.into_iter().map(ItemResponse::from).collect(),
            cursor: page.cursor,
            has_more: page.has_more,
        }
    }
}

/// Query parameters for children listing.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListChildrenQuery {
    /// Page size (1-1000, default 100).
    #[param(example = 100)]
    pub limit: Option<u64>,
    /// Cursor returned by the previous page.
    pub cursor: Option<String>,
}
