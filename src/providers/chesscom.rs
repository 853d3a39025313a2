//! Chess.com public stats API client.

use anyhow::{bail, Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

const STATS_URL_BASE: &str = "https://api.chess.com/pub/player";

// Rated categories the stats payload may carry, each with a `last.rating`.
const TIME_CONTROLS: [&str; 4] = ["chess_daily", "chess_rapid", "chess_blitz", "chess_bullet"];

/// Fetch the best Chess.com rating for `username` across all time controls.
/// Returns Ok(None) when the account does not exist; transport errors and
/// unexpected statuses are returned as errors so the caller's retry applies.
pub async fn fetch_rating(http: &Client, username: &str) -> Result<Option<f64>> {
    let url = format!("{STATS_URL_BASE}/{}/stats", urlencoding::encode(username));
    let resp = http
        .get(&url)
        .send()
        .await
        .with_context(|| format!("chess.com stats request for {username}"))?;

    match resp.status() {
        StatusCode::NOT_FOUND => {
            debug!(username, "chess.com: player not found");
            Ok(None)
        }
        s if s.is_success() => {
            let body: Value = resp
                .json()
                .await
                .context("chess.com stats body was not JSON")?;
            Ok(best_rating(&body))
        }
        s => bail!("chess.com stats returned HTTP {s} for {username}"),
    }
}

/// Highest `last.rating` across the rated time controls. Zero ratings count
/// as missing: the API reports 0 for categories never played.
pub fn best_rating(stats: &Value) -> Option<f64> {
    let best = TIME_CONTROLS
        .iter()
        .filter_map(|tc| {
            stats
                .get(tc)
                .and_then(|v| v.get("last"))
                .and_then(|v| v.get("rating"))
                .and_then(Value::as_f64)
        })
        .fold(0.0f64, f64::max);
    (best > 0.0).then_some(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn picks_the_highest_time_control() {
        let stats = json!({
            "chess_daily": { "last": { "rating": 1200 } },
            "chess_rapid": { "last": { "rating": 1850 } },
            "chess_blitz": { "last": { "rating": 1790 } },
            "chess_bullet": { "last": { "rating": 1600 } },
        });
        assert_eq!(best_rating(&stats), Some(1850.0));
    }

    #[test]
    fn tolerates_missing_categories() {
        let stats = json!({
            "chess_blitz": { "last": { "rating": 1500 } },
            "tactics": { "highest": { "rating": 2900 } },
        });
        assert_eq!(best_rating(&stats), Some(1500.0));
    }

    #[test]
    fn all_zero_or_absent_means_unrated() {
        assert_eq!(best_rating(&json!({})), None);
        let stats = json!({
            "chess_daily": { "last": { "rating": 0 } },
            "chess_blitz": { "last": { "rating": 0 } },
        });
        assert_eq!(best_rating(&stats), None);
    }

    #[test]
    fn ignores_malformed_rating_fields() {
        let stats = json!({
            "chess_rapid": { "last": { "rating": "not-a-number" } },
            "chess_blitz": { "last": { "rating": 1402 } },
        });
        assert_eq!(best_rating(&stats), Some(1402.0));
    }
}
