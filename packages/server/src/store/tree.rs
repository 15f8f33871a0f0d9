use sea_orm::sea_query::LikeExpr;
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::path::ItemPath;
use super::{ItemResult, ItemStore, escape_like};
use crate::entity::item;

impl ItemStore {
    /// Delete `path` and every item beneath it. For the root this is every
    /// item of `owner`. Returns the number of items removed; an empty
    /// subtree is not an error.
    ///
    /// Walks the owner's items in id order, one bounded batch at a time, so
    /// arbitrarily large trees never load fully into memory.
    #[instrument(skip(self, path), fields(path = %path))]
    pub async fn delete_subtree(&self, owner: &str, path: &ItemPath) -> ItemResult<u64> {
        let batch_size = self.settings.delete_batch_size;
        let mut last_seen: Option<Uuid> = None;
        let mut deleted = 0u64;

        loop {
            let mut query = item::Entity::find()
                .select_only()
                .column(item::Column::Id)
                .column(item::Column::Name)
                .filter(item::Column::OwnerId.eq(owner));
            if !path.is_root() {
                let prefix = escape_like(path.name());
                query = query.filter(
                    Condition::any()
                        .add(item::Column::Name.eq(path.name()))
                        .add(item::Column::Name.like(LikeExpr::new(format!("{prefix}/%")).escape('\\'))),
                );
            }
            if let Some(last) = last_seen {
                query = query.filter(item::Column::Id.gt(last));
            }

            let batch: Vec<(Uuid, String)> = query
                .order_by_asc(item::Column::Id)
                .limit(batch_size)
                .into_tuple()
                .all(&self.db)
                .await?;

            let Some((last_id, _)) = batch.last() else {
                break;
            };
            last_seen = Some(*last_id);
            let exhausted = (batch.len() as u64) < batch_size;

            let ids: Vec<Uuid> = batch
                .into_iter()
                .filter(|(_, name)| path.contains(name))
                .map(|(id, _)| id)
                .collect();

            if !ids.is_empty() {
                let result = item::Entity::delete_many()
                    .filter(item::Column::OwnerId.eq(owner))
                    .filter(item::Column::Id.is_in(ids))
                    .exec(&self.db)
                    .await?;
                deleted += result.rows_affected;
                debug!(batch = result.rows_affected, total = deleted, "Deleted item batch");
            }

            if exhausted {
                break;
            }
        }

        Ok(deleted)
    }
}
