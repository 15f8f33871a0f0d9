//! `items/<path>` endpoints.
//!
//! Item paths contain `/` and `:`, so a single catch-all route receives every
//! request and [`Target::parse`] splits off the `/content` or `/children`
//! operation suffix. A suffix only counts after a closed path (`...:`) or
//! the bare `root`, so an item literally named `a/content` stays reachable
//! as `root:/a/content:`.

use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::query::AppQuery;
use crate::models::item::{ChildrenResponse, ItemResponse, ListChildrenQuery};
use crate::state::AppState;
use crate::store::{ItemPath, PathPattern};

const OCTET_STREAM: &str = "application/octet-stream";

pub fn content_body_limit(max_blob_size: u64) -> DefaultBodyLimit {
    DefaultBodyLimit::max(usize::try_from(max_blob_size).unwrap_or(usize::MAX))
}

/// What a request under `items/` addresses.
#[derive(Debug, PartialEq, Eq)]
enum Target<'a> {
    Item(&'a str),
    Content(&'a str),
    Children(&'a str),
}

impl<'a> Target<'a> {
    fn parse(raw: &'a str) -> Self {
        let closed = |base: &str| base == "root" || base.ends_with(':');
        if let Some(base) = raw.strip_suffix("/content")
            && closed(base)
        {
            return Target::Content(base);
        }
        if let Some(base) = raw.strip_suffix("/children")
            && closed(base)
        {
            return Target::Children(base);
        }
        Target::Item(raw)
    }
}

fn method_not_allowed(target: &Target<'_>) -> AppError {
    AppError::MethodNotAllowed(format!("Method not supported for {target:?}"))
}

/// Explicit MIME type from the request, if the client sent a meaningful one.
fn mime_override(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(OCTET_STREAM))
}

pub async fn get_route(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(raw): Path<String>,
    query: Result<AppQuery<ListChildrenQuery>, AppError>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    match Target::parse(&raw) {
        Target::Item(path) => get_item(&state, &auth_user, path)
            .await
            .map(IntoResponse::into_response),
        Target::Content(path) => get_content(&state, &auth_user, path, &headers).await,
        // Only listings read the query string.
        Target::Children(path) => {
            let AppQuery(query) = query?;
            list_children(&state, &auth_user, path, query)
                .await
                .map(IntoResponse::into_response)
        }
    }
}

pub async fn put_route(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(raw): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    match Target::parse(&raw) {
        Target::Content(path) => replace_content(&state, &auth_user, path, &headers, body)
            .await
            .map(IntoResponse::into_response),
        other => Err(method_not_allowed(&other)),
    }
}

pub async fn post_route(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(raw): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    match Target::parse(&raw) {
        Target::Content(path) => create_content(&state, &auth_user, path, &headers, body)
            .await
            .map(IntoResponse::into_response),
        other => Err(method_not_allowed(&other)),
    }
}

pub async fn delete_route(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Response, AppError> {
    match Target::parse(&raw) {
        Target::Item(path) => delete_item(&state, &auth_user, path)
            .await
            .map(IntoResponse::into_response),
        other => Err(method_not_allowed(&other)),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/items/{path}",
    tag = "Items",
    operation_id = "getItem",
    summary = "Get item metadata",
    params(("path" = String, Path, description = "Item path, e.g. `root:/notes/a.md:`")),
    responses(
        (status = 200, description = "Item metadata", body = ItemResponse),
        (status = 400, description = "Malformed path (INVALID_PATH)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(owner = %auth_user.owner_id))]
pub async fn get_item(
    state: &AppState,
    auth_user: &AuthUser,
    path: &str,
) -> Result<Json<ItemResponse>, AppError> {
    let path = ItemPath::resolve(path).map_err(|e| AppError::InvalidPath(e.to_string()))?;
    let item = state.store.get_by_name(&auth_user.owner_id, &path).await?;
    Ok(Json(item.into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/items/{path}/content",
    tag = "Items",
    operation_id = "getItemContent",
    summary = "Download item content",
    description = "Streams the exact bytes last written. Supports ETag-based caching via If-None-Match.",
    params(("path" = String, Path, description = "Item path")),
    responses(
        (status = 200, description = "Item content"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 400, description = "Malformed path (INVALID_PATH)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, headers), fields(owner = %auth_user.owner_id))]
pub async fn get_content(
    state: &AppState,
    auth_user: &AuthUser,
    path: &str,
    headers: &HeaderMap,
) -> Result<Response, AppError> {
    let path = ItemPath::resolve(path).map_err(|e| AppError::InvalidPath(e.to_string()))?;

    let etag_value = |hash: &str| format!("\"{hash}\"");

    // Answer conditional requests from metadata alone.
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && let Ok(val) = if_none_match.to_str()
    {
        let item = state.store.get_by_name(&auth_user.owner_id, &path).await?;
        if val == etag_value(&item.content_hash) || val == "*" {
            return Ok(StatusCode::NOT_MODIFIED.into_response());
        }
    }

    let (item, reader) = state.store.open_content(&auth_user.owner_id, &path).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, &item.mime_type)
        .header(header::CONTENT_LENGTH, item.content_size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(path.file_name().unwrap_or("content")),
        )
        .header(header::ETAG, etag_value(&item.content_hash))
        .header(header::CACHE_CONTROL, "private, no-cache")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

#[utoipa::path(
    get,
    path = "/api/v1/items/{path}/children",
    tag = "Items",
    operation_id = "listItemChildren",
    summary = "List direct children",
    description = "Lists items exactly one level below the path, ordered by id. \
        `*` matches any single segment; a trailing `*` is the same as listing the parent.",
    params(("path" = String, Path, description = "Listing path, e.g. `root:/locks/*:`"), ListChildrenQuery),
    responses(
        (status = 200, description = "One page of children", body = ChildrenResponse),
        (status = 400, description = "Bad path, limit or cursor (INVALID_PATH, VALIDATION_ERROR, INVALID_CURSOR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(owner = %auth_user.owner_id, limit = ?query.limit))]
pub async fn list_children(
    state: &AppState,
    auth_user: &AuthUser,
    path: &str,
    query: ListChildrenQuery,
) -> Result<Json<ChildrenResponse>, AppError> {
    let pattern = PathPattern::resolve(path).map_err(|e| AppError::InvalidPath(e.to_string()))?;
    let page = state
        .store
        .list_children(
            &auth_user.owner_id,
            &pattern,
            query.limit,
            query.cursor.as_deref().filter(|c| !c.is_empty()),
        )
        .await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    put,
    path = "/api/v1/items/{path}/content",
    tag = "Items",
    operation_id = "replaceItemContent",
    summary = "Write item content",
    description = "Creates the item or replaces its content. All derived metadata is recomputed \
        from the new bytes. A request Content-Type other than application/octet-stream \
        overrides the MIME type guessed from the path.",
    params(("path" = String, Path, description = "Item path")),
    request_body(content_type = "application/octet-stream", description = "Raw content"),
    responses(
        (status = 200, description = "Item written", body = ItemResponse),
        (status = 400, description = "Malformed path (INVALID_PATH)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 413, description = "Content too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, headers, body), fields(owner = %auth_user.owner_id, size = body.len()))]
pub async fn replace_content(
    state: &AppState,
    auth_user: &AuthUser,
    path: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Json<ItemResponse>, AppError> {
    let path = ItemPath::resolve(path).map_err(|e| AppError::InvalidPath(e.to_string()))?;
    let item = state
        .store
        .replace_with_mime(&auth_user.owner_id, &path, &body, mime_override(headers))
        .await?;
    Ok(Json(item.into()))
}

#[utoipa::path(
    post,
    path = "/api/v1/items/{path}/content",
    tag = "Items",
    operation_id = "createItem",
    summary = "Create an item",
    description = "Creates a new item with the request body as content. Fails if the path is taken.",
    params(("path" = String, Path, description = "Item path")),
    request_body(content_type = "application/octet-stream", description = "Raw content"),
    responses(
        (status = 201, description = "Item created", body = ItemResponse),
        (status = 400, description = "Malformed path (INVALID_PATH)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 409, description = "Path already taken (CONFLICT)", body = ErrorBody),
        (status = 413, description = "Content too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, headers, body), fields(owner = %auth_user.owner_id, size = body.len()))]
pub async fn create_content(
    state: &AppState,
    auth_user: &AuthUser,
    path: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<ItemResponse>), AppError> {
    let path = ItemPath::resolve(path).map_err(|e| AppError::InvalidPath(e.to_string()))?;
    let item = state
        .store
        .create_with_mime(&auth_user.owner_id, &path, &body, mime_override(headers))
        .await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

#[utoipa::path(
    delete,
    path = "/api/v1/items/{path}",
    tag = "Items",
    operation_id = "deleteItem",
    summary = "Delete an item or a subtree",
    description = "`root` deletes every item of the caller. A path naming an item deletes only \
        that item; otherwise every item below the path is deleted. Blobs are kept for GC.",
    params(("path" = String, Path, description = "Item path")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Malformed path (INVALID_PATH)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Nothing at or below the path (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(owner = %auth_user.owner_id))]
pub async fn delete_item(
    state: &AppState,
    auth_user: &AuthUser,
    path: &str,
) -> Result<StatusCode, AppError> {
    let path = ItemPath::resolve(path).map_err(|e| AppError::InvalidPath(e.to_string()))?;
    let deleted = state.store.delete_at(&auth_user.owner_id, &path).await?;
    tracing::info!(deleted, "Deleted items");
    Ok(StatusCode::NO_CONTENT)
}

/// Build a safe `Content-Disposition` header value.
fn content_disposition_value(filename: &str) -> String {
    let ascii_safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_safe.is_empty() {
        "content".to_string()
    } else {
        ascii_safe
    };

    // RFC 5987 percent-encoding for filename*.
    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                String::from(b as char)
            }
            _ => format!("%{b:02X}"),
        })
        .collect();

    format!("inline; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}
