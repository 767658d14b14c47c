use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::models::onsen_log::OnsenLog;

pub const EMPTY_LIST_MESSAGE: &str = "まだデータがありません。";
pub const AVERAGE_PLACEHOLDER: &str = "–";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogCard {
    pub id: Uuid,
    pub date: NaiveDate,
    pub onsen_name: String,
    pub sleep_score: f64,
    pub stars: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl From<&OnsenLog> for LogCard {
    fn from(log: &OnsenLog) -> Self {
        Self {
            id: log.id,
            date: log.date,
            onsen_name: log.onsen_name.clone(),
            sleep_score: log.sleep_score,
            stars: render_stars(Some(log.rating)),
            memo: log.memo.clone(),
            photo_url: log.photo_url.clone(),
        }
    }
}

/// `★★★★☆ (4)`, or `-` without a rating.
pub fn render_stars(rating: Option<i32>) -> String {
    match rating {
        Some(r @ 1..=5) => {
            let full = r as usize;
            format!("{}{} ({r})", "★".repeat(full), "☆".repeat(5 - full))
        }
        _ => "-".into(),
    }
}

/// Mean sleep score rounded half up, `None` for an empty set.
pub fn average_sleep_score(logs: &[OnsenLog]) -> Option<i64> {
    if logs.is_empty() {
        return None;
    }
    let mean = logs.iter().map(|l| l.sleep_score).sum::<f64>() / logs.len() as f64;
    Some((mean + 0.5).floor() as i64)
}

pub fn average_label(average: Option<i64>) -> String {
    average
        .map(|a| a.to_string())
        .unwrap_or_else(|| AVERAGE_PLACEHOLDER.into())
}
