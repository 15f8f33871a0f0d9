use common::storage::StorageError;
use sea_orm::DbErr;

use super::cursor::InvalidCursor;
use super::path::PathError;

#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error(transparent)]
    InvalidPath(#[from] PathError),
    #[error("{0}")]
    InvalidLimit(String),
    #[error("Item already exists: {0}")]
    Conflict(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    InvalidCursor(#[from] InvalidCursor),
    #[error("Content of {0} is not a recognized domain object")]
    Undecodable(String),
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type ItemResult<T> = Result<T, ItemError>;
