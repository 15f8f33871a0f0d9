use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::ItemStore;

#[derive(Clone)]
pub struct AppState {
    pub store: ItemStore,
    pub config: Arc<AppConfig>,
}
