use serde::Serialize;
use uuid::Uuid;

use crate::models::onsen_log::{Coordinates, OnsenLog};

pub const TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const TILE_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";
pub const DEFAULT_ZOOM: u8 = 13;
pub const NO_COORDINATES_MESSAGE: &str = "地図に表示できる座標付きデータがまだありません。";

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MapView {
    Placeholder {
        message: &'static str,
    },
    #[serde(rename_all = "camelCase")]
    Map {
        center: Coordinates,
        zoom: u8,
        tile_url: &'static str,
        attribution: &'static str,
        markers: Vec<Marker>,
    },
}

#[derive(Debug, Serialize)]
pub struct Marker {
    pub id: Uuid,
    pub position: Coordinates,
    pub popup: Popup,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Popup {
    pub onsen_name: String,
    pub date: String,
    pub sleep_score: f64,
    pub rating: String,
}

impl MapView {
    /// One marker per record with both coordinates, centered on the first.
    pub fn from_logs(logs: &[OnsenLog]) -> Self {
        let markers: Vec<Marker> = logs
            .iter()
            .filter_map(|log| {
                log.coordinates().map(|position| Marker {
                    id: log.id,
                    position,
                    popup: Popup {
                        onsen_name: log.onsen_name.clone(),
                        date: log.date.to_string(),
                        sleep_score: log.sleep_score,
                        rating: log.rating.to_string(),
                    },
                })
            })
            .collect();

        let Some(first) = markers.first() else {
            return MapView::Placeholder {
                message: NO_COORDINATES_MESSAGE,
            };
        };

        MapView::Map {
            center: first.position,
            zoom: DEFAULT_ZOOM,
            tile_url: TILE_URL,
            attribution: TILE_ATTRIBUTION,
            markers,
        }
    }
}
