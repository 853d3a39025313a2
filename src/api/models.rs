// API request/response models (DTOs)

use crate::db::players::Player;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: Some(Meta::now()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            meta: Some(Meta::now()),
        }
    }
}

/// Metadata included in all API responses
#[derive(Debug, Serialize, Deserialize)]
pub struct Meta {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub version: String,
}

impl Meta {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: uuid::Uuid::new_v4().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}

/// Player creation request. At least one identifier must be present.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePlayerRequest {
    pub name: String,
    #[serde(default)]
    pub fide_id: Option<i64>,
    #[serde(default)]
    pub chesscom_username: Option<String>,
    #[serde(default)]
    pub lichess_username: Option<String>,
}

/// A leaderboard entry: the stored player plus its 1-based rank.
#[derive(Debug, Serialize)]
pub struct RankedPlayer {
    pub rank: usize,
    #[serde(flatten)]
    pub player: Player,
}

/// One row of the live per-provider snapshot. Missing data renders as "-".
#[derive(Debug, Serialize, Deserialize)]
pub struct LiveRatingRow {
    pub name: String,
    pub fide_id: String,
    pub fide_rating: String,
    pub chesscom_rating: String,
    pub lichess_rating: String,
}

impl LiveRatingRow {
    /// Sort key for the snapshot table: numeric FIDE rating, "-" sorts last.
    pub fn fide_sort_key(&self) -> f64 {
        self.fide_rating.parse::<f64>().unwrap_or(-1.0)
    }
}

/// Query parameters for the sheet import endpoint.
#[derive(Debug, Deserialize)]
pub struct SheetSyncRequest {
    pub spreadsheet_id: String,
    #[serde(default)]
    pub gid: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_rows_with_no_fide_rating_sort_last() {
        let rated = LiveRatingRow {
            name: "a".into(),
            fide_id: "1".into(),
            fide_rating: "1875".into(),
            chesscom_rating: "-".into(),
            lichess_rating: "-".into(),
        };
        let unrated = LiveRatingRow {
            name: "b".into(),
            fide_id: "-".into(),
            fide_rating: "-".into(),
            chesscom_rating: "2000".into(),
            lichess_rating: "-".into(),
        };
        assert!(rated.fide_sort_key() > unrated.fide_sort_key());
        assert_eq!(unrated.fide_sort_key(), -1.0);
    }

    #[test]
    fn error_envelope_carries_no_data() {
        let resp = ApiResponse::<()>::error("nope");
        assert!(!resp.success);
        assert!(resp.data.is_none());
        assert_eq!(resp.error.as_deref(), Some("nope"));
    }
}
