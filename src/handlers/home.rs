use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::views::{tabs::Tab, HomeView};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct HomeQuery {
    #[serde(default)]
    pub tab: Tab,
    /// Horizontal delta of a swipe made on `tab`, in px.
    pub swipe: Option<f64>,
}

/// GET /api/home?tab=logs|map[&swipe=<dx>]
pub async fn home(
    State(state): State<AppState>,
    Query(query): Query<HomeQuery>,
) -> AppResult<Json<HomeView>> {
    let logs = state.store.recent().await?;
    let active = match query.swipe {
        Some(delta_x) => query.tab.after_swipe(delta_x),
        None => query.tab,
    };
    Ok(Json(HomeView::build(&logs, active)))
}
