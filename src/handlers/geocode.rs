use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use crate::services::geocoding::GeocodeError;
use crate::AppState;

/// POST /api/geocode `{"onsenName": "..."}` -> `{"lat": .., "lng": ..}`
pub async fn geocode(State(state): State<AppState>, body: Bytes) -> Response {
    let name = match place_name(&body) {
        Ok(name) => name,
        Err(e) => return e.into_response(),
    };

    match state.geocoder.resolve(&name).await {
        Ok(coordinates) => Json(coordinates).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, onsen = %name, "Geocode request failed");
            e.into_response()
        }
    }
}

fn place_name(body: &[u8]) -> Result<String, GeocodeError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| GeocodeError::Internal(anyhow::anyhow!("unreadable request body: {e}")))?;

    value
        .get("onsenName")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .ok_or(GeocodeError::MissingPlaceName)
}
