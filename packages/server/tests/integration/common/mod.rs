use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use ::common::storage::{
    BlobStore, ConnectionString, FilesystemBlobStore, HttpBlobStore, TransferOptions,
};
use ::common::transport::{TransportRequest, TransportResponse};
use ::common::{
    FaultInjectionTransport, HttpTransport, RetryMode, RetryOptions, ThrottlePolicy,
    TransportError,
};
use reqwest::Client;
use reqwest::redirect::Policy;
use tempfile::TempDir;
use url::Url;

use gallery_server::config::{
    AppConfig, DatabaseConfig, FaultInjectionSettings, FilesystemConfig, RetrySettings,
    SeedConfig, ServerConfig, StorageBackend, StorageConfig, TransferSettings,
};
use gallery_server::database::init_db;
use gallery_server::services::image::{ImageRepository, ImageService};
use gallery_server::state::AppState;

pub const CONTAINER: &str = "images";

pub mod routes {
    pub const HOME: &str = "/";
    pub const GALLERY: &str = "/gallery";
    pub const UPLOAD: &str = "/upload";

    pub fn gallery_page(page: i64, size: i64) -> String {
        format!("/gallery?pageNumber={page}&pageSize={size}")
    }

    pub fn detail(id: i32) -> String {
        format!("/gallery/detail/{id}")
    }

    pub fn edit(id: i32) -> String {
        format!("/gallery/edit/{id}")
    }

    pub fn delete(id: i32) -> String {
        format!("/gallery/delete/{id}")
    }

    pub fn tag(tag: &str) -> String {
        format!("/gallery/tag/{tag}")
    }
}

/// Which blob store the app under test talks to.
pub enum StoreKind {
    /// Filesystem store served by the app itself.
    Filesystem,
    /// HTTP store whose blob writes are always throttled.
    AlwaysThrottled,
}

/// A running test server.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub images: Arc<dyn ImageRepository>,
    pub blob_store: Arc<dyn BlobStore>,
    _dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// `Location` header of redirects.
    pub location: Option<String>,
    pub content_type: Option<String>,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let header = |name: reqwest::header::HeaderName| {
            res.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let location = header(reqwest::header::LOCATION);
        let content_type = header(reqwest::header::CONTENT_TYPE);
        let text = res.text().await.unwrap_or_default();
        Self {
            status,
            text,
            location,
            content_type,
        }
    }
}

fn test_config(dir: &Path, addr: SocketAddr) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: format!("sqlite://{}?mode=rwc", dir.join("gallery.db").display()),
            max_connections: 5,
            min_connections: 1,
        },
        storage: StorageConfig {
            backend: StorageBackend::Filesystem,
            container: CONTAINER.to_string(),
            max_blob_size: 1024 * 1024,
            connection_string: None,
            filesystem: FilesystemConfig {
                root: dir.join("blobs").display().to_string(),
                public_base_url: format!("http://{addr}/blobs/"),
            },
            retry: RetrySettings::default(),
            transfer: TransferSettings::default(),
            fault_injection: FaultInjectionSettings::default(),
        },
        seed: SeedConfig { enabled: false },
    }
}

/// Stand-in for the storage service: accepts every request.
pub struct AcceptingTransport;

impl AcceptingTransport {
    fn respond(request: &TransportRequest) -> TransportResponse {
        let query = request.uri().query().unwrap_or_default();
        let status = match *request.method() {
            http::Method::DELETE => http::StatusCode::NOT_FOUND,
            http::Method::PUT if query.contains("comp=acl") => http::StatusCode::OK,
            http::Method::PUT => http::StatusCode::CREATED,
            _ => http::StatusCode::OK,
        };
        let mut response = http::Response::new(Bytes::new());
        *response.status_mut() = status;
        response
    }
}

#[async_trait]
impl HttpTransport for AcceptingTransport {
    async fn process(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        Ok(Self::respond(&request))
    }

    fn process_blocking(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        Ok(Self::respond(&request))
    }
}

fn throttled_store() -> Arc<dyn BlobStore> {
    let transport = FaultInjectionTransport::with_seed(AcceptingTransport, ThrottlePolicy::new(1.0), 3);
    let retry = RetryOptions {
        max_retries: 2,
        delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        mode: RetryMode::Fixed,
        network_timeout: Duration::from_secs(5),
    };
    let connection = ConnectionString::parse("BlobEndpoint=http://127.0.0.1:10000/devstoreaccount1")
        .expect("Failed to parse connection string");
    Arc::new(HttpBlobStore::new(
        Arc::new(transport),
        connection,
        retry,
        TransferOptions::default(),
        1024 * 1024,
    ))
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(StoreKind::Filesystem, |images| images).await
    }

    /// Spawn with a chosen blob store and a wrapper around the real image
    /// repository.
    pub async fn spawn_with(
        store: StoreKind,
        wrap: impl FnOnce(Arc<dyn ImageRepository>) -> Arc<dyn ImageRepository>,
    ) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();
        let config = test_config(dir.path(), addr);

        let db = init_db(&config.database)
            .await
            .expect("Failed to initialize test database");
        let images = wrap(Arc::new(ImageService::new(db)));

        let blob_store: Arc<dyn BlobStore> = match store {
            StoreKind::Filesystem => Arc::new(
                FilesystemBlobStore::new(
                    dir.path().join("blobs"),
                    Url::parse(&config.storage.filesystem.public_base_url).unwrap(),
                    config.storage.max_blob_size,
                )
                .await
                .expect("Failed to create blob store"),
            ),
            StoreKind::AlwaysThrottled => throttled_store(),
        };

        let state = AppState {
            images: images.clone(),
            blob_store: blob_store.clone(),
            config: Arc::new(config),
        };
        let app = gallery_server::build_router(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::builder()
                .redirect(Policy::none())
                .build()
                .expect("Failed to build client"),
            images,
            blob_store,
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");
        TestResponse::from_response(res).await
    }

    pub async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .form(fields)
            .send()
            .await
            .expect("Failed to send POST request");
        TestResponse::from_response(res).await
    }

    pub async fn post_multipart(&self, path: &str, form: reqwest::multipart::Form) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart request");
        TestResponse::from_response(res).await
    }

    /// Upload form with title, tags and one PNG-typed file.
    pub fn upload_form(title: &str, tags: &str, file_name: &str, data: &[u8]) -> reqwest::multipart::Form {
        let part = reqwest::multipart::Part::bytes(data.to_vec())
            .file_name(file_name.to_string())
            .mime_str("image/png")
            .unwrap();
        reqwest::multipart::Form::new()
            .text("title", title.to_string())
            .text("tags", tags.to_string())
            .part("file", part)
    }

    /// Insert an image record directly, bypassing the upload route.
    pub async fn seed_image(&self, title: &str, tags: &str) -> i32 {
        let name = format!("{}.png", title.to_lowercase().replace(' ', "-"));
        let uri = self.blob_store.blob_url(CONTAINER, &name).unwrap();
        self.images
            .set_image(title, tags, &uri)
            .await
            .expect("Failed to seed image")
            .id
    }
}
