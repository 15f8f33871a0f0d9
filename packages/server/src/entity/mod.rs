pub mod blob_object;
pub mod item;
