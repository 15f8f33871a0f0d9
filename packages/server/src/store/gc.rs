use std::time::Duration;

use chrono::{DateTime, Utc};
use common::storage::ContentHash;
use sea_orm::sea_query::Query;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QuerySelect};
use tracing::{error, info, instrument, warn};

use super::{ItemResult, ItemStore};
use crate::entity::{blob_object, item};

/// Run blob garbage collection as a background task.
pub async fn run_blob_gc(store: ItemStore, scan_interval: Duration, grace: Duration) {
    info!(
        scan_interval_secs = scan_interval.as_secs(),
        grace_secs = grace.as_secs(),
        "Starting blob garbage collector"
    );

    let mut interval = tokio::time::interval(scan_interval);

    loop {
        interval.tick().await;

        if let Err(e) = store.collect_garbage(grace).await {
            error!(error = %e, "Blob garbage collection failed");
        }
    }
}

impl ItemStore {
    /// Remove blobs that no item references and that have not been written
    /// or re-referenced within `grace`. Returns the number of blobs removed.
    #[instrument(skip(self))]
    pub async fn collect_garbage(&self, grace: Duration) -> ItemResult<u64> {
        let grace = chrono::Duration::from_std(grace).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(grace)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let candidates: Vec<String> = blob_object::Entity::find()
            .select_only()
            .column(blob_object::Column::ContentHash)
            .filter(blob_object::Column::LastReferencedAt.lt(cutoff))
            .filter(blob_object::Column::ContentHash.not_in_subquery(referenced_hashes()))
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut removed = 0u64;
        for content_hash in candidates {
            let _sweeping = self.blob_guard.write().await;
            if self.sweep_blob(&content_hash, cutoff).await? {
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, "Collected unreferenced blobs");
        }
        Ok(removed)
    }

    /// Drop one blob if it is still unreferenced and stale. The caller holds
    /// the blob guard exclusively, so no writer is between upload and commit.
    pub(super) async fn sweep_blob(
        &self,
        content_hash: &str,
        cutoff: DateTime<Utc>,
    ) -> ItemResult<bool> {
        // A write may have claimed the blob since the scan.
        let result = blob_object::Entity::delete_many()
            .filter(blob_object::Column::ContentHash.eq(content_hash))
            .filter(blob_object::Column::LastReferencedAt.lt(cutoff))
            .filter(blob_object::Column::ContentHash.not_in_subquery(referenced_hashes()))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Ok(false);
        }

        let hash = match ContentHash::from_hex(content_hash) {
            Ok(hash) => hash,
            Err(e) => {
                warn!(content_hash, error = %e, "Skipping blob row with invalid hash");
                return Ok(false);
            }
        };
        self.blobs.delete(&hash).await?;
        Ok(true)
    }
}

fn referenced_hashes() -> sea_orm::sea_query::SelectStatement {
    Query::select()
        .column(item::Column::ContentHash)
        .from(item::Entity)
        .to_owned()
}
