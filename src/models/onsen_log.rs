use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};

/// Stored onsen visit. Optional fields are omitted from JSON when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OnsenLog {
    pub id: Uuid,
    pub date: NaiveDate,
    pub onsen_name: String,
    pub sleep_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    pub rating: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OnsenLog {
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// Fully validated values for a new record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOnsenLog {
    pub date: NaiveDate,
    pub onsen_name: String,
    pub sleep_score: f64,
    pub memo: Option<String>,
    pub rating: i32,
    pub coordinates: Option<Coordinates>,
    pub photo_url: Option<String>,
}

// ============================================================================
// Creation form
// ============================================================================

/// Raw form input exactly as typed by the user.
///
/// Field names are the wire names so validation errors can be keyed by them.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct LogForm {
    #[validate(
        length(min = 1, message = "date is required"),
        custom(function = "validate_date", message = "date must be YYYY-MM-DD")
    )]
    pub date: String,

    #[serde(rename = "onsenName")]
    #[validate(length(min = 1, message = "onsenName is required"))]
    pub onsen_name: String,

    #[serde(rename = "sleepScore")]
    #[validate(
        length(min = 1, message = "sleepScore is required"),
        custom(function = "validate_sleep_score", message = "sleepScore must be a number")
    )]
    pub sleep_score: String,

    #[validate(
        required(message = "rating is required"),
        range(min = 1, max = 5, message = "rating must be between 1 and 5")
    )]
    pub rating: Option<i32>,

    pub memo: Option<String>,
}

fn validate_date(value: &str) -> Result<(), ValidationError> {
    // Empty input is already reported as missing.
    if value.is_empty() || parse_date(value).is_some() {
        Ok(())
    } else {
        Err(ValidationError::new("date_format"))
    }
}

fn validate_sleep_score(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || parse_score(value).is_some() {
        Ok(())
    } else {
        Err(ValidationError::new("not_a_number"))
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

fn parse_score(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Trims free text; blank text counts as absent.
pub fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl LogForm {
    /// Validates the form and converts it into insertable values.
    ///
    /// Coordinates and photo are filled in later by the submission pipeline.
    pub fn into_new_log(self) -> AppResult<NewOnsenLog> {
        let form = LogForm {
            date: self.date.trim().to_string(),
            onsen_name: self.onsen_name.trim().to_string(),
            sleep_score: self.sleep_score.trim().to_string(),
            rating: self.rating,
            memo: normalize_text(self.memo),
        };
        form.validate()?;

        let (Some(date), Some(sleep_score), Some(rating)) = (
            parse_date(&form.date),
            parse_score(&form.sleep_score),
            form.rating,
        ) else {
            return Err(AppError::Validation("Form failed validation".into()));
        };

        Ok(NewOnsenLog {
            date,
            onsen_name: form.onsen_name,
            sleep_score,
            memo: form.memo,
            rating,
            coordinates: None,
            photo_url: None,
        })
    }
}

// ============================================================================
// Partial update
// ============================================================================

/// Typed partial update.
///
/// Outer `None` leaves a column untouched; for nullable columns `Some(None)`
/// clears it. Coordinates travel as a pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnsenLogPatch {
    pub date: Option<NaiveDate>,
    pub onsen_name: Option<String>,
    pub sleep_score: Option<f64>,
    pub rating: Option<i32>,
    pub memo: Option<Option<String>>,
    pub coordinates: Option<Option<Coordinates>>,
    pub photo_url: Option<Option<String>>,
}

impl OnsenLogPatch {
    pub fn is_empty(&self) -> bool {
        *self == OnsenLogPatch::default()
    }
}

/// Distinguishes a missing key (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// PUT /api/logs/{id}
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOnsenLogRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub onsen_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub sleep_score: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub rating: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub memo: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub lat: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub lng: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub photo_url: Option<Option<String>>,
}

impl TryFrom<UpdateOnsenLogRequest> for OnsenLogPatch {
    type Error = AppError;

    fn try_from(req: UpdateOnsenLogRequest) -> AppResult<Self> {
        let date = match req.date {
            None => None,
            Some(raw) => Some(
                raw.as_deref()
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| AppError::field("date", "date is required"))
                    .and_then(|v| {
                        parse_date(v)
                            .ok_or_else(|| AppError::field("date", "date must be YYYY-MM-DD"))
                    })?,
            ),
        };

        let onsen_name = match req.onsen_name {
            None => None,
            Some(raw) => Some(
                normalize_text(raw)
                    .ok_or_else(|| AppError::field("onsenName", "onsenName is required"))?,
            ),
        };

        let sleep_score = match req.sleep_score {
            None => None,
            Some(Some(score)) if score.is_finite() => Some(score),
            Some(Some(_)) => {
                return Err(AppError::field("sleepScore", "sleepScore must be a number"))
            }
            Some(None) => return Err(AppError::field("sleepScore", "sleepScore is required")),
        };

        let rating = match req.rating {
            None => None,
            Some(Some(rating)) if (1..=5).contains(&rating) => Some(rating),
            Some(Some(_)) => {
                return Err(AppError::field("rating", "rating must be between 1 and 5"))
            }
            Some(None) => return Err(AppError::field("rating", "rating is required")),
        };

        let coordinates = match (req.lat, req.lng) {
            (None, None) => None,
            (Some(None), Some(None)) => Some(None),
            (Some(Some(lat)), Some(Some(lng))) => {
                let coordinates = Coordinates { lat, lng };
                if !coordinates.is_finite() {
                    return Err(AppError::Validation("lat and lng must be numbers".into()));
                }
                Some(Some(coordinates))
            }
            _ => {
                return Err(AppError::Validation(
                    "lat and lng must be set or cleared together".into(),
                ))
            }
        };

        Ok(OnsenLogPatch {
            date,
            onsen_name,
            sleep_score,
            rating,
            memo: req.memo.map(normalize_text),
            coordinates,
            photo_url: req.photo_url.map(normalize_text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(date: &str, name: &str, score: &str, rating: Option<i32>) -> LogForm {
        LogForm {
            date: date.into(),
            onsen_name: name.into(),
            sleep_score: score.into(),
            rating,
            memo: None,
        }
    }

    fn invalid_fields(err: AppError) -> Vec<&'static str> {
        match err {
            AppError::InvalidFields(errors) => {
                let mut fields: Vec<_> = errors.field_errors().keys().copied().collect();
                fields.sort();
                fields
            }
            other => panic!("expected field errors, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_form_converts() {
        let mut input = form("2024-05-01", " 別府温泉 ", "85", Some(4));
        input.memo = Some("  ビール1杯  ".into());

        let log = input.into_new_log().unwrap();
        assert_eq!(log.date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(log.onsen_name, "別府温泉");
        assert_eq!(log.sleep_score, 85.0);
        assert_eq!(log.rating, 4);
        assert_eq!(log.memo.as_deref(), Some("ビール1杯"));
        assert!(log.coordinates.is_none());
        assert!(log.photo_url.is_none());
    }

    #[test]
    fn test_blank_memo_is_omitted() {
        let mut input = form("2024-05-01", "別府温泉", "85", Some(3));
        input.memo = Some("   ".into());
        assert!(input.into_new_log().unwrap().memo.is_none());
    }

    #[test]
    fn test_missing_required_fields_reported_per_field() {
        let err = form("", "   ", "", Some(3)).into_new_log().unwrap_err();
        assert_eq!(invalid_fields(err), vec!["date", "onsenName", "sleepScore"]);
    }

    #[test]
    fn test_form_and_patch_errors_use_same_field_names() {
        let err = form("2024-05-01", "", "abc", Some(3)).into_new_log().unwrap_err();
        assert_eq!(invalid_fields(err), vec!["onsenName", "sleepScore"]);

        let req: UpdateOnsenLogRequest =
            serde_json::from_str(r#"{"sleepScore": null}"#).unwrap();
        let err = OnsenLogPatch::try_from(req).unwrap_err();
        assert_eq!(invalid_fields(err), vec!["sleepScore"]);
    }

    #[test]
    fn test_non_numeric_score_rejected() {
        for score in ["abc", "8five", "NaN", "inf"] {
            let err = form("2024-05-01", "別府温泉", score, Some(3))
                .into_new_log()
                .unwrap_err();
            assert_eq!(invalid_fields(err), vec!["sleepScore"], "score {score:?}");
        }
    }

    #[test]
    fn test_score_with_whitespace_and_decimals_accepted() {
        let log = form("2024-05-01", "草津", " 72.5 ", Some(5)).into_new_log().unwrap();
        assert_eq!(log.sleep_score, 72.5);
    }

    #[test]
    fn test_rating_out_of_range_rejected() {
        for rating in [Some(0), Some(6), Some(-1), None] {
            let err = form("2024-05-01", "別府温泉", "85", rating)
                .into_new_log()
                .unwrap_err();
            assert_eq!(invalid_fields(err), vec!["rating"], "rating {rating:?}");
        }
    }

    #[test]
    fn test_malformed_date_rejected() {
        let err = form("05/01/2024", "別府温泉", "85", Some(3)).into_new_log().unwrap_err();
        assert_eq!(invalid_fields(err), vec!["date"]);
    }

    #[test]
    fn test_patch_distinguishes_missing_and_null() {
        let req: UpdateOnsenLogRequest =
            serde_json::from_str(r#"{"memo": "new text", "photoUrl": null}"#).unwrap();
        let patch = OnsenLogPatch::try_from(req).unwrap();

        assert_eq!(patch.memo, Some(Some("new text".into())));
        assert_eq!(patch.photo_url, Some(None));
        assert_eq!(patch.date, None);
        assert_eq!(patch.coordinates, None);
    }

    #[test]
    fn test_patch_requires_paired_coordinates() {
        let req: UpdateOnsenLogRequest = serde_json::from_str(r#"{"lat": 33.28}"#).unwrap();
        assert!(matches!(
            OnsenLogPatch::try_from(req),
            Err(AppError::Validation(_))
        ));

        let req: UpdateOnsenLogRequest =
            serde_json::from_str(r#"{"lat": null, "lng": null}"#).unwrap();
        assert_eq!(OnsenLogPatch::try_from(req).unwrap().coordinates, Some(None));
    }

    #[test]
    fn test_patch_cannot_clear_required_fields() {
        for body in [
            r#"{"onsenName": null}"#,
            r#"{"onsenName": "  "}"#,
            r#"{"sleepScore": null}"#,
            r#"{"rating": 9}"#,
            r#"{"date": null}"#,
        ] {
            let req: UpdateOnsenLogRequest = serde_json::from_str(body).unwrap();
            assert!(
                matches!(OnsenLogPatch::try_from(req), Err(AppError::InvalidFields(_))),
                "body {body}"
            );
        }
    }

    #[test]
    fn test_serialization_omits_absent_fields() {
        let log = OnsenLog {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            onsen_name: "別府温泉".into(),
            sleep_score: 85.0,
            memo: None,
            rating: 4,
            lat: None,
            lng: None,
            photo_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["onsenName"], "別府温泉");
        assert_eq!(json["sleepScore"], 85.0);
        assert_eq!(json["date"], "2024-05-01");
        assert!(json.get("lat").is_none());
        assert!(json.get("photoUrl").is_none());
        assert!(json.get("memo").is_none());
    }
}
