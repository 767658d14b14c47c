//! View models for the list and map tabs.

pub mod list;
pub mod map;
pub mod tabs;

use serde::Serialize;

use crate::models::onsen_log::OnsenLog;
use list::{average_label, average_sleep_score, LogCard, EMPTY_LIST_MESSAGE};
use map::MapView;
use tabs::Tab;

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TabContent {
    #[serde(rename_all = "camelCase")]
    Logs {
        cards: Vec<LogCard>,
        #[serde(skip_serializing_if = "Option::is_none")]
        empty_message: Option<&'static str>,
    },
    Map {
        map: MapView,
    },
}

/// Header plus the content of the active tab.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeView {
    pub average_sleep_score: Option<i64>,
    pub average_label: String,
    pub record_count: usize,
    pub active_tab: Tab,
    pub content: TabContent,
}

impl HomeView {
    pub fn build(logs: &[OnsenLog], active_tab: Tab) -> Self {
        let average = average_sleep_score(logs);
        let content = match active_tab {
            Tab::Logs => TabContent::Logs {
                cards: logs.iter().map(LogCard::from).collect(),
                empty_message: logs.is_empty().then_some(EMPTY_LIST_MESSAGE),
            },
            Tab::Map => TabContent::Map {
                map: MapView::from_logs(logs),
            },
        };

        Self {
            average_sleep_score: average,
            average_label: average_label(average),
            record_count: logs.len(),
            active_tab,
            content,
        }
    }
}
