use std::time::Duration;

use async_trait::async_trait;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::models::onsen_log::Coordinates;

/// Appended to every query so bare names resolve to Japanese hot springs.
pub const LOCALE_QUALIFIER: &str = "温泉 日本";

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("onsenName is required")]
    MissingPlaceName,

    #[error("geocoding API key is not configured")]
    ApiKeyNotSet,

    #[error("geocoding provider returned HTTP {0}")]
    Http(reqwest::StatusCode),

    #[error("geocoding provider returned no result")]
    NoResult,

    #[error("geocoding failed: {0}")]
    Internal(#[from] anyhow::Error),
}

impl GeocodeError {
    pub fn status(&self) -> StatusCode {
        match self {
            GeocodeError::MissingPlaceName => StatusCode::BAD_REQUEST,
            GeocodeError::ApiKeyNotSet => StatusCode::INTERNAL_SERVER_ERROR,
            GeocodeError::Http(_) => StatusCode::BAD_GATEWAY,
            GeocodeError::NoResult => StatusCode::NOT_FOUND,
            GeocodeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            GeocodeError::MissingPlaceName => "onsenName is required",
            GeocodeError::ApiKeyNotSet => "geocoding_api_key_not_set",
            GeocodeError::Http(_) => "geocoding_http_error",
            GeocodeError::NoResult => "no_result",
            GeocodeError::Internal(_) => "internal_error",
        }
    }
}

impl From<reqwest::Error> for GeocodeError {
    fn from(err: reqwest::Error) -> Self {
        GeocodeError::Internal(err.into())
    }
}

impl IntoResponse for GeocodeError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.code() }))).into_response()
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Best-guess coordinates for a free-text place name.
    async fn resolve(&self, place_name: &str) -> Result<Coordinates, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    status: String,
    #[serde(default)]
    results: Vec<ProviderResult>,
}

#[derive(Debug, Deserialize)]
struct ProviderResult {
    geometry: ProviderGeometry,
}

#[derive(Debug, Deserialize)]
struct ProviderGeometry {
    location: Coordinates,
}

/// Google Geocoding API client.
pub struct GoogleGeocoder {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl GoogleGeocoder {
    pub fn new(endpoint: &str, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key,
        })
    }
}

pub fn qualified_query(place_name: &str) -> String {
    format!("{} {}", place_name.trim(), LOCALE_QUALIFIER)
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn resolve(&self, place_name: &str) -> Result<Coordinates, GeocodeError> {
        if place_name.trim().is_empty() {
            return Err(GeocodeError::MissingPlaceName);
        }
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::error!("GEOCODING_API_KEY is not set");
            return Err(GeocodeError::ApiKeyNotSet);
        };

        let address = qualified_query(place_name);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("address", address.as_str()), ("key", api_key)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Geocoding HTTP error");
            return Err(GeocodeError::Http(status));
        }

        let parsed: ProviderResponse = response.json().await?;
        if parsed.status != "OK" {
            tracing::warn!(status = %parsed.status, "Geocoding returned no result");
            return Err(GeocodeError::NoResult);
        }
        let Some(first) = parsed.results.into_iter().next() else {
            tracing::warn!(status = %parsed.status, "Geocoding returned an empty result list");
            return Err(GeocodeError::NoResult);
        };

        let location = first.geometry.location;
        if !location.is_finite() {
            return Err(GeocodeError::Internal(anyhow::anyhow!(
                "provider returned non-finite coordinates"
            )));
        }
        Ok(location)
    }
}

#[cfg(test)]
pub mod stub {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// Answers every lookup with a fixed outcome and records the queries.
    pub struct StubGeocoder {
        outcome: fn() -> Result<Coordinates, GeocodeError>,
        calls: AtomicUsize,
        queries: Mutex<Vec<String>>,
    }

    impl StubGeocoder {
        pub fn new(outcome: fn() -> Result<Coordinates, GeocodeError>) -> Self {
            Self {
                outcome,
                calls: AtomicUsize::new(0),
                queries: Mutex::new(Vec::new()),
            }
        }

        pub fn found() -> Self {
            Self::new(|| Ok(Coordinates { lat: 33.28, lng: 131.49 }))
        }

        pub fn not_found() -> Self {
            Self::new(|| Err(GeocodeError::NoResult))
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Geocoder for StubGeocoder {
        async fn resolve(&self, place_name: &str) -> Result<Coordinates, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(place_name.to_string());
            (self.outcome)()
        }
    }
}
