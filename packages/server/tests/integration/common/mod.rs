use std::net::SocketAddr;
use std::sync::Arc;

use ::common::NoteCodec;
use ::common::storage::FilesystemBlobStore;
use reqwest::Client;
use sea_orm::ConnectOptions;
use serde_json::Value;
use tempfile::TempDir;

use item_server::config::{
    AppConfig, AuthConfig, CorsConfig, DatabaseConfig, ItemsConfig, ServerConfig, StorageConfig,
};
use item_server::state::AppState;
use item_server::store::{ItemStore, StoreSettings};
use item_server::utils::jwt;

const JWT_SECRET: &str = "test-secret-for-integration-tests";

pub mod routes {
    pub fn item(path: &str) -> String {
        format!("/api/v1/items/{path}")
    }

    pub fn content(path: &str) -> String {
        format!("/api/v1/items/{path}/content")
    }

    pub fn children(path: &str) -> String {
        format!("/api/v1/items/{path}/children")
    }
}

/// A running test server.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    /// Keeps the blob directory alive for the lifetime of the app.
    _blob_dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    pub headers: reqwest::header::HeaderMap,
    /// Raw response body.
    pub bytes: Vec<u8>,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let bytes = res
            .bytes()
            .await
            .expect("Failed to read response body")
            .to_vec();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Self {
            status,
            headers,
            bytes,
            body,
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// `name` of every item in a children listing.
    pub fn item_names(&self) -> Vec<String> {
        self.body["items"]
            .as_array()
            .expect("response has no items array")
            .iter()
            .map(|item| item["name"].as_str().unwrap().to_string())
            .collect()
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(ItemsConfig::default()).await
    }

    pub async fn spawn_with(items: ItemsConfig) -> Self {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = item_server::database::init_db_with(opts)
            .await
            .expect("Failed to initialize test database");
        item_server::database::ensure_indexes(&db)
            .await
            .expect("Failed to create indexes");

        let blob_dir = tempfile::tempdir().expect("Failed to create blob directory");

        let app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
            },
            auth: AuthConfig {
                jwt_secret: JWT_SECRET.to_string(),
            },
            storage: StorageConfig {
                blob_dir: blob_dir.path().display().to_string(),
                max_blob_size: 1024 * 1024,
            },
            items,
        };

        let blobs = FilesystemBlobStore::new(
            blob_dir.path().to_path_buf(),
            app_config.storage.max_blob_size,
        )
        .await
        .expect("Failed to initialize blob store");

        let store = ItemStore::new(
            db,
            Arc::new(blobs),
            Arc::new(NoteCodec),
            StoreSettings::from(&app_config.items),
        );

        let state = AppState {
            store,
            config: Arc::new(app_config),
        };

        let app = item_server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            _blob_dir: blob_dir,
        }
    }

    /// Token for `owner`, signed with the server's secret.
    pub fn token(&self, owner: &str) -> String {
        jwt::sign(owner, JWT_SECRET, chrono::Duration::hours(1)).expect("Failed to sign token")
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_headers(
        &self,
        path: &str,
        token: &str,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut req = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"));
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        let res = req.send().await.expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn put_bytes(&self, path: &str, body: &[u8], token: &str) -> TestResponse {
        let res = self
            .client
            .put(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .body(body.to_vec())
            .send()
            .await
            .expect("Failed to send PUT request");

        TestResponse::from_response(res).await
    }

    pub async fn put_typed(
        &self,
        path: &str,
        body: &[u8],
        content_type: &str,
        token: &str,
    ) -> TestResponse {
        let res = self
            .client
            .put(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", content_type)
            .body(body.to_vec())
            .send()
            .await
            .expect("Failed to send PUT request");

        TestResponse::from_response(res).await
    }

    pub async fn post_bytes(&self, path: &str, body: &[u8], token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .body(body.to_vec())
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn delete_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    /// Write `content` to `path` and assert success.
    pub async fn put_item(&self, path: &str, content: &[u8], token: &str) -> Value {
        let res = self.put_bytes(&routes::content(path), content, token).await;
        assert_eq!(res.status, 200, "PUT {path} failed: {}", res.text());
        res.body
    }
}
