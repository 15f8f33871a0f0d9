//! Item persistence: path-addressed blobs with decoded domain metadata.

pub mod cursor;
pub mod error;
pub mod gc;
pub mod path;
pub mod tree;


use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::storage::{BlobStore, BoxReader, ContentHash, StoredBlob};
use common::{ContentCodec, DomainType};
use sea_orm::sea_query::{LikeExpr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::ItemsConfig;
use crate::entity::{blob_object, item};

pub use cursor::{CursorCodec, InvalidCursor};
pub use error::{ItemError, ItemResult};
pub use path::{ChildMatcher, ItemPath, PathError, PathPattern};

const OCTET_STREAM: &str = "application/octet-stream";

/// Tunables for listing, deletion and cursors.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub default_page_size: u64,
    pub max_page_size: u64,
    pub delete_batch_size: u64,
    pub cursor_secret: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self::from(&ItemsConfig::default())
    }
}

impl From<&ItemsConfig> for StoreSettings {
    fn from(config: &ItemsConfig) -> Self {
        let max_page_size = config.max_page_size.max(1);
        Self {
            default_page_size: config.default_page_size.clamp(1, max_page_size),
            max_page_size,
            delete_batch_size: config.delete_batch_size.max(1),
            cursor_secret: config.cursor_secret.clone(),
        }
    }
}

/// One page of a children listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<item::Model>,
    /// Resume token, present only when `has_more` is set.
    pub cursor: Option<String>,
    pub has_more: bool,
}

/// Metadata recomputed from the content on every write.
struct Derived {
    mime_type: String,
    domain_id: String,
    domain_parent_id: String,
    domain_type: DomainType,
    domain_title: String,
    encryption_applied: bool,
}

/// Handle to the item store. Cheap to clone; all clones share the same
/// connection pool and blob store.
#[derive(Clone)]
pub struct ItemStore {
    db: DatabaseConnection,
    blobs: Arc<dyn BlobStore>,
    codec: Arc<dyn ContentCodec>,
    cursors: CursorCodec,
    settings: StoreSettings,
    /// Shared by writers from blob upload to commit, exclusive while
    /// collection removes a blob. A writer that finds a blob file already
    /// present can then rely on it staying.
    blob_guard: Arc<RwLock<()>>,
}

impl ItemStore {
    pub fn new(
        db: DatabaseConnection,
        blobs: Arc<dyn BlobStore>,
        codec: Arc<dyn ContentCodec>,
        settings: StoreSettings,
    ) -> Self {
        Self {
            cursors: CursorCodec::new(settings.cursor_secret.as_bytes()),
            db,
            blobs,
            codec,
            settings,
            blob_guard: Arc::new(RwLock::new(())),
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Create a new item. Fails with `Conflict` if the path is taken.
    pub async fn create(
        &self,
        owner: &str,
        path: &ItemPath,
        bytes: &[u8],
    ) -> ItemResult<item::Model> {
        self.create_with_mime(owner, path, bytes, None).await
    }

    #[instrument(skip(self, path, bytes), fields(path = %path, size = bytes.len()))]
    pub async fn create_with_mime(
        &self,
        owner: &str,
        path: &ItemPath,
        bytes: &[u8],
        mime_type: Option<&str>,
    ) -> ItemResult<item::Model> {
        let name = path.require_item()?;
        let _writing = self.blob_guard.read().await;
        let stored = self.put_blob(bytes).await?;
        let derived = self.derive(name, bytes, mime_type);
        let now = Utc::now();

        let model = new_item(owner, name, &stored, derived, now);

        let txn = self.db.begin().await?;
        touch_blob(&txn, &stored, now).await?;
        let created = match model.insert(&txn).await {
            Ok(created) => created,
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(ItemError::Conflict(path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        txn.commit().await?;

        debug!(id = %created.id, "Created item");
        Ok(created)
    }

    /// Write content to a path, creating the item if it does not exist.
    pub async fn replace(
        &self,
        owner: &str,
        path: &ItemPath,
        bytes: &[u8],
    ) -> ItemResult<item::Model> {
        self.replace_with_mime(owner, path, bytes, None).await
    }

    /// Every derived column is recomputed from `bytes`; nothing from the
    /// previous version survives apart from `id`, `name` and `created_at`.
    #[instrument(skip(self, path, bytes), fields(path = %path, size = bytes.len()))]
    pub async fn replace_with_mime(
        &self,
        owner: &str,
        path: &ItemPath,
        bytes: &[u8],
        mime_type: Option<&str>,
    ) -> ItemResult<item::Model> {
        let name = path.require_item()?;
        let _writing = self.blob_guard.read().await;
        let stored = self.put_blob(bytes).await?;
        let derived = self.derive(name, bytes, mime_type);
        let now = Utc::now();

        let model = new_item(owner, name, &stored, derived, now);

        let txn = self.db.begin().await?;
        touch_blob(&txn, &stored, now).await?;
        item::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([item::Column::OwnerId, item::Column::Name])
                    .update_columns([
                        item::Column::MimeType,
                        item::Column::ContentHash,
                        item::Column::ContentSize,
                        item::Column::DomainId,
                        item::Column::DomainParentId,
                        item::Column::DomainType,
                        item::Column::DomainTitle,
                        item::Column::EncryptionApplied,
                        item::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        let saved = find_by_name(&txn, owner, name)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("item {path} missing after upsert")))?;
        txn.commit().await?;

        debug!(id = %saved.id, "Replaced item");
        Ok(saved)
    }

    pub async fn get_by_name(&self, owner: &str, path: &ItemPath) -> ItemResult<item::Model> {
        let name = path.require_item()?;
        find_by_name(&self.db, owner, name)
            .await?
            .ok_or_else(|| ItemError::NotFound(path.to_string()))
    }

    pub async fn get_by_id(&self, owner: &str, id: Uuid) -> ItemResult<item::Model> {
        item::Entity::find_by_id(id)
            .filter(item::Column::OwnerId.eq(owner))
            .one(&self.db)
            .await?
            .ok_or_else(|| ItemError::NotFound(id.to_string()))
    }

    /// The exact bytes last written to `path`.
    #[instrument(skip(self, path), fields(path = %path))]
    pub async fn get_content(&self, owner: &str, path: &ItemPath) -> ItemResult<Vec<u8>> {
        let item = self.get_by_name(owner, path).await?;
        let hash = ContentHash::from_hex(&item.content_hash)?;
        Ok(self.blobs.get(&hash).await?)
    }

    /// Metadata plus a streaming reader over the content.
    pub async fn open_content(
        &self,
        owner: &str,
        path: &ItemPath,
    ) -> ItemResult<(item::Model, BoxReader)> {
        let item = self.get_by_name(owner, path).await?;
        let hash = ContentHash::from_hex(&item.content_hash)?;
        let reader = self.blobs.get_stream(&hash).await?;
        Ok((item, reader))
    }

    pub async fn load_domain_object(
        &self,
        owner: &str,
        path: &ItemPath,
    ) -> ItemResult<common::DomainObject> {
        let bytes = self.get_content(owner, path).await?;
        self.codec
            .decode(&bytes)
            .into_object()
            .ok_or_else(|| ItemError::Undecodable(path.to_string()))
    }

    /// Domain objects whose decoded parent is `parent_id`, in id order.
    /// Items that did not decode are never included.
    pub async fn list_by_domain_parent(
        &self,
        owner: &str,
        parent_id: &str,
    ) -> ItemResult<Vec<item::Model>> {
        Ok(item::Entity::find()
            .filter(item::Column::OwnerId.eq(owner))
            .filter(item::Column::DomainParentId.eq(parent_id))
            .filter(item::Column::DomainType.ne(DomainType::Unknown))
            .order_by_asc(item::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Delete exactly the item at `path`. Descendants are untouched.
    #[instrument(skip(self, path), fields(path = %path))]
    pub async fn delete(&self, owner: &str, path: &ItemPath) -> ItemResult<()> {
        let name = path.require_item()?;
        let result = item::Entity::delete_many()
            .filter(item::Column::OwnerId.eq(owner))
            .filter(item::Column::Name.eq(name))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(ItemError::NotFound(path.to_string()));
        }
        Ok(())
    }

    /// Delete whatever `path` designates: the whole tree for the root, the
    /// item itself when one exists, otherwise everything beneath the path.
    /// Returns the number of items removed.
    pub async fn delete_at(&self, owner: &str, path: &ItemPath) -> ItemResult<u64> {
        if path.is_root() {
            return self.delete_subtree(owner, path).await;
        }

        match self.delete(owner, path).await {
            Ok(()) => Ok(1),
            Err(ItemError::NotFound(_)) => match self.delete_subtree(owner, path).await? {
                0 => Err(ItemError::NotFound(path.to_string())),
                deleted => Ok(deleted),
            },
            Err(e) => Err(e),
        }
    }

    /// Direct children of `pattern`, ordered by id.
    #[instrument(skip(self, pattern, cursor), fields(pattern = %pattern))]
    pub async fn list_children(
        &self,
        owner: &str,
        pattern: &PathPattern,
        limit: Option<u64>,
        cursor: Option<&str>,
    ) -> ItemResult<Page> {
        let limit = self.page_size(limit)?;
        let matcher = pattern.children(1);
        let scope = format!("{owner}\n{matcher}");
        let after = cursor
            .map(|c| self.cursors.decode(&scope, c))
            .transpose()?;

        let fetch = limit + 1;
        let mut items = Vec::new();
        let mut last_scanned = after;

        // Rows narrowed by the literal prefix may still fail the exact
        // predicate, so keep scanning until the page is full or rows run out.
        loop {
            let mut query = filter_candidates(owner, &matcher);
            if let Some(last) = last_scanned {
                query = query.filter(item::Column::Id.gt(last));
            }
            let batch = query
                .order_by_asc(item::Column::Id)
                .limit(fetch)
                .all(&self.db)
                .await?;

            let exhausted = (batch.len() as u64) < fetch;
            if let Some(last) = batch.last() {
                last_scanned = Some(last.id);
            }
            items.extend(batch.into_iter().filter(|m| matcher.matches(&m.name)));

            if exhausted || items.len() as u64 > limit {
                break;
            }
        }

        let has_more = items.len() as u64 > limit;
        items.truncate(limit as usize);
        let cursor = if has_more {
            items.last().map(|m| self.cursors.encode(&scope, m.id))
        } else {
            None
        };

        Ok(Page {
            items,
            cursor,
            has_more,
        })
    }

    /// Every item of the owner, in id order.
    pub async fn list_all(&self, owner: &str) -> ItemResult<Vec<item::Model>> {
        Ok(item::Entity::find()
            .filter(item::Column::OwnerId.eq(owner))
            .order_by_asc(item::Column::Id)
            .all(&self.db)
            .await?)
    }

    fn page_size(&self, limit: Option<u64>) -> ItemResult<u64> {
        match limit {
            None => Ok(self.settings.default_page_size),
            Some(0) => Err(ItemError::InvalidLimit("limit must be positive".into())),
            Some(n) if n > self.settings.max_page_size => Err(ItemError::InvalidLimit(format!(
                "limit must be at most {}",
                self.settings.max_page_size
            ))),
            Some(n) => Ok(n),
        }
    }

    /// Write the blob, registering it first so a concurrent collection pass
    /// sees a fresh reference and leaves it alone.
    async fn put_blob(&self, bytes: &[u8]) -> ItemResult<StoredBlob> {
        let expected = StoredBlob {
            hash: ContentHash::compute(bytes),
            size: bytes.len() as u64,
        };
        touch_blob(&self.db, &expected, Utc::now()).await?;
        Ok(self.blobs.put(bytes).await?)
    }

    fn derive(&self, name: &str, bytes: &[u8], mime_type: Option<&str>) -> Derived {
        let mime_type = mime_type
            .map(str::to_string)
            .unwrap_or_else(|| guess_mime(name));

        match self.codec.decode(bytes).into_object() {
            Some(object) => Derived {
                mime_type,
                domain_id: object.id,
                domain_parent_id: object.parent_id,
                domain_type: object.kind,
                domain_title: object.title,
                encryption_applied: object.encryption_applied,
            },
            None => Derived {
                mime_type,
                domain_id: String::new(),
                domain_parent_id: String::new(),
                domain_type: DomainType::Unknown,
                domain_title: String::new(),
                encryption_applied: false,
            },
        }
    }
}

fn guess_mime(name: &str) -> String {
    mime_guess::from_path(name)
        .first()
        .map(|m| m.to_string())
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}

fn new_item(
    owner: &str,
    name: &str,
    stored: &StoredBlob,
    derived: Derived,
    now: DateTime<Utc>,
) -> item::ActiveModel {
    item::ActiveModel {
        id: Set(Uuid::now_v7()),
        owner_id: Set(owner.to_string()),
        name: Set(name.to_string()),
        mime_type: Set(derived.mime_type),
        content_hash: Set(stored.hash.to_hex()),
        content_size: Set(stored.size as i64),
        domain_id: Set(derived.domain_id),
        domain_parent_id: Set(derived.domain_parent_id),
        domain_type: Set(derived.domain_type),
        domain_title: Set(derived.domain_title),
        encryption_applied: Set(derived.encryption_applied),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

/// Escape LIKE wildcard characters.
pub(crate) fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Owner-scoped query narrowed to names that can satisfy `matcher`.
fn filter_candidates(owner: &str, matcher: &ChildMatcher) -> sea_orm::Select<item::Entity> {
    let mut query = item::Entity::find().filter(item::Column::OwnerId.eq(owner));

    let prefix = escape_like(&matcher.literal_prefix());
    if !prefix.is_empty() {
        query = query.filter(
            item::Column::Name.like(LikeExpr::new(format!("{prefix}%")).escape('\\')),
        );
    }
    if matcher.is_single_level() {
        query = query.filter(
            item::Column::Name.not_like(LikeExpr::new(format!("{prefix}%/%")).escape('\\')),
        );
    }
    query
}

async fn find_by_name<C: ConnectionTrait>(
    conn: &C,
    owner: &str,
    name: &str,
) -> Result<Option<item::Model>, DbErr> {
    item::Entity::find()
        .filter(item::Column::OwnerId.eq(owner))
        .filter(item::Column::Name.eq(name))
        .one(conn)
        .await
}

/// Record a reference to a blob, creating its row on first use.
async fn touch_blob<C: ConnectionTrait>(
    conn: &C,
    stored: &StoredBlob,
    now: DateTime<Utc>,
) -> Result<(), DbErr> {
    let blob = blob_object::ActiveModel {
        content_hash: Set(stored.hash.to_hex()),
        size: Set(stored.size as i64),
        created_at: Set(now),
        last_referenced_at: Set(now),
    };
    blob_object::Entity::insert(blob)
        .on_conflict(
            OnConflict::column(blob_object::Column::ContentHash)
                .update_column(blob_object::Column::LastReferencedAt)
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}
