//! Lichess public user API client.

use anyhow::{bail, Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

const USER_URL_BASE: &str = "https://lichess.org/api/user";

const PERF_KEYS: [&str; 4] = ["bullet", "blitz", "rapid", "classical"];

/// Fetch the best Lichess rating for `username` across standard perfs.
/// Returns Ok(None) when the account does not exist.
pub async fn fetch_rating(http: &Client, username: &str) -> Result<Option<f64>> {
    let url = format!("{USER_URL_BASE}/{}", urlencoding::encode(username));
    let resp = http
        .get(&url)
        .send()
        .await
        .with_context(|| format!("lichess user request for {username}"))?;

    match resp.status() {
        StatusCode::NOT_FOUND => {
            debug!(username, "lichess: player not found");
            Ok(None)
        }
        s if s.is_success() => {
            let body: Value = resp
                .json()
                .await
                .context("lichess user body was not JSON")?;
            Ok(best_rating(&body))
        }
        s => bail!("lichess user endpoint returned HTTP {s} for {username}"),
    }
}

/// Highest rating across the standard perfs, None when absent or zero.
pub fn best_rating(user: &Value) -> Option<f64> {
    let perfs = user.get("perfs")?;
    let best = PERF_KEYS
        .iter()
        .filter_map(|key| {
            perfs
                .get(key)
                .and_then(|v| v.get("rating"))
                .and_then(Value::as_f64)
        })
        .fold(0.0f64, f64::max);
    (best > 0.0).then_some(best)
}
