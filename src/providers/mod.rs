//! Rating providers: Chess.com and Lichess over JSON, FIDE over scraped HTML.

pub mod chesscom;
pub mod fide;
pub mod lichess;

use crate::retry::{self, RetryPolicy};
use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

// The federation site rejects obvious bot agents, so the shared client
// identifies as a plain desktop browser.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Shared HTTP client plus the retry policy applied to every provider call.
#[derive(Clone)]
pub struct ProviderClient {
    http: Client,
    retry: RetryPolicy,
}

impl ProviderClient {
    pub fn new(retry: RetryPolicy) -> Result<Self> {
        let timeout_secs = crate::util::env::env_parse("HTTP_TIMEOUT_SECS", 10u64);
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("building http client")?;
        Ok(Self { http, retry })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(RetryPolicy::from_env())
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Best Chess.com rating across time controls; None for unknown accounts.
    pub async fn chesscom_rating(&self, username: &str) -> Result<Option<f64>> {
        retry::with_backoff(self.retry, "chess.com rating", || {
            chesscom::fetch_rating(&self.http, username)
        })
        .await
    }

    /// Best Lichess rating across time controls; None for unknown accounts.
    pub async fn lichess_rating(&self, username: &str) -> Result<Option<f64>> {
        retry::with_backoff(self.retry, "lichess rating", || {
            lichess::fetch_rating(&self.http, username)
        })
        .await
    }

    /// Full scraped FIDE profile; None for unknown ids or unparseable pages.
    pub async fn fide_profile(&self, fide_id: i64) -> Result<Option<fide::FideProfile>> {
        retry::with_backoff(self.retry, "fide profile", || {
            fide::fetch_profile(&self.http, fide_id)
        })
        .await
    }

    /// Best of the three published FIDE ratings.
    pub async fn fide_rating(&self, fide_id: i64) -> Result<Option<f64>> {
        Ok(self
            .fide_profile(fide_id)
            .await?
            .and_then(|p| p.highest_rating()))
    }
}
