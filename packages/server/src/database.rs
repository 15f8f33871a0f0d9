use std::time::Duration;

use sea_orm::sea_query::{Index, IndexCreateStatement, PostgresQueryBuilder, SqliteQueryBuilder};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr};
use tracing::{info, warn};

use crate::entity::item;

pub fn connect_options(db_url: &str) -> ConnectOptions {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(8))
        .max_lifetime(Duration::from_secs(8))
        .sqlx_logging(true);

    opt
}

pub async fn init_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    init_db_with(connect_options(db_url)).await
}

/// Connect and sync the schema of every entity under `crate::entity`.
pub async fn init_db_with(opt: ConnectOptions) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(opt).await?;
    db.get_schema_registry("item_server::entity::*")
        .sync(&db)
        .await?;

    Ok(db)
}

/// Ensure secondary indexes exist.
///
/// Schema sync only creates the unique key, so the composite lookup index
/// for domain parent listings is created here on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // SELECT ... FROM item WHERE owner_id = ? AND domain_parent_id = ? ORDER BY id
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_item_owner_domain_parent")
        .table(item::Entity)
        .col(item::Column::OwnerId)
        .col(item::Column::DomainParentId)
        .col(item::Column::Id)
        .to_owned();
    create_index(db, "idx_item_owner_domain_parent", stmt).await;

    // Keyset scans in listings and tree deletes.
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_item_owner_id")
        .table(item::Entity)
        .col(item::Column::OwnerId)
        .col(item::Column::Id)
        .to_owned();
    create_index(db, "idx_item_owner_id", stmt).await;

    Ok(())
}

async fn create_index(db: &DatabaseConnection, name: &str, stmt: IndexCreateStatement) {
    let sql = match db.get_database_backend() {
        DbBackend::Sqlite => stmt.to_string(SqliteQueryBuilder),
        _ => stmt.to_string(PostgresQueryBuilder),
    };

    match db.execute_unprepared(&sql).await {
        Ok(_) => info!("Ensured index {name} exists"),
        Err(e) => warn!("Failed to create index {name}: {e}"),
    }
}
