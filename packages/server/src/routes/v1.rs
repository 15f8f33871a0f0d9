use axum::{Router, routing::get};

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> Router<AppState> {
    Router::new().nest("/items", item_routes(config))
}

fn item_routes(config: &AppConfig) -> Router<AppState> {
    Router::new()
        .route(
            "/{*path}",
            get(handlers::item::get_route)
                .put(handlers::item::put_route)
                .post(handlers::item::post_route)
                .delete(handlers::item::delete_route),
        )
        .layer(handlers::item::content_body_limit(
            config.storage.max_blob_size,
        ))
}
