//! Router harness shared by handler tests.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use crate::config::Config;
use crate::db::memory::MemoryOnsenLogRepository;
use crate::middleware::rate_limit::RateLimitState;
use crate::services::geocoding::stub::StubGeocoder;
use crate::services::photos::PhotoPipeline;
use crate::services::record_store::RecordStore;
use crate::services::submission::LogSubmitter;
use crate::storage::memory::MemoryObjectStore;
use crate::{build_router, AppState};

const BOUNDARY: &str = "deepsleeping-test-boundary";

pub struct TestApp {
    pub repo: Arc<MemoryOnsenLogRepository>,
    pub geocoder: Arc<StubGeocoder>,
    pub objects: Arc<MemoryObjectStore>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_geocoder(Arc::new(StubGeocoder::found()))
    }

    pub fn with_geocoder(geocoder: Arc<StubGeocoder>) -> Self {
        Self::build(Config::for_tests(), geocoder)
    }

    pub fn with_config(config: Config) -> Self {
        Self::build(config, Arc::new(StubGeocoder::found()))
    }

    pub fn with_rate_limit(max_requests: u32) -> Self {
        let mut config = Config::for_tests();
        config.geocode_rate_limit = max_requests;
        Self::with_config(config)
    }

    fn build(config: Config, geocoder: Arc<StubGeocoder>) -> Self {
        let repo = Arc::new(MemoryOnsenLogRepository::new());
        let objects = Arc::new(MemoryObjectStore::new());
        let store = RecordStore::new(repo.clone());
        let photos = PhotoPipeline::new(objects.clone(), config.photo_target_width);

        let state = AppState {
            rate_limiter: RateLimitState::new(config.geocode_rate_limit),
            config: Arc::new(config),
            submitter: LogSubmitter::new(store.clone(), geocoder.clone(), photos),
            store,
            geocoder: geocoder.clone(),
        };
        let router = build_router(state)
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));

        Self {
            repo,
            geocoder,
            objects,
            router,
        }
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: &str) -> Response {
        self.send(json_request(Method::POST, uri, body)).await
    }

    pub async fn put_json(&self, uri: &str, body: &str) -> Response {
        self.send(json_request(Method::PUT, uri, body)).await
    }

    pub async fn post_multipart(&self, uri: &str, body: MultipartBody) -> Response {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body.finish()))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

fn json_request(method: Method, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Hand-built `multipart/form-data` body.
#[derive(Default)]
pub struct MultipartBody {
    bytes: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, data: Vec<u8>) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        self.bytes.extend_from_slice(&data);
        self.bytes.extend_from_slice(b"\r\n");
        self
    }

    fn finish(mut self) -> Vec<u8> {
        self.bytes
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.bytes
    }
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
