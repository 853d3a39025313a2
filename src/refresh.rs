//! Rating refresh: pull fresh numbers from every provider a player has an
//! identifier for, fold them into the stored row, and re-derive the highest
//! rating. Provider failures downgrade to "no fresh data" so a flaky
//! upstream never wipes a known rating.

use crate::db::players::Player;
use crate::db::{self, Db};
use crate::providers::ProviderClient;
use crate::ranking;
use anyhow::Result;
use tracing::{info, warn};

#[derive(Debug, Default, Clone, Copy)]
pub struct RefreshOutcome {
    /// Providers the player has an identifier for.
    pub attempted: usize,
    /// Providers that gave a definitive answer (including "not found").
    pub succeeded: usize,
}

impl RefreshOutcome {
    /// Every provider we asked exhausted its retries.
    pub fn all_failed(&self) -> bool {
        self.attempted > 0 && self.succeeded == 0
    }
}

/// Refresh one player's ratings in place. The three provider calls run
/// concurrently; each failed call keeps the previously stored value.
pub async fn refresh_player(
    db: &Db,
    providers: &ProviderClient,
    player: &Player,
) -> Result<RefreshOutcome> {
    let fide_call = async {
        match player.fide_id {
            Some(id) => Some(providers.fide_rating(id).await),
            None => None,
        }
    };
    let chesscom_call = async {
        match player.chesscom_username.as_deref() {
            Some(username) => Some(providers.chesscom_rating(username).await),
            None => None,
        }
    };
    let lichess_call = async {
        match player.lichess_username.as_deref() {
            Some(username) => Some(providers.lichess_rating(username).await),
            None => None,
        }
    };
    let (fide_res, chesscom_res, lichess_res) =
        tokio::join!(fide_call, chesscom_call, lichess_call);

    let mut outcome = RefreshOutcome::default();
    let fide = settle(&mut outcome, "fide", player.fide_rating, fide_res);
    let chesscom = settle(
        &mut outcome,
        "chess.com",
        player.chesscom_rating,
        chesscom_res,
    );
    let lichess = settle(&mut outcome, "lichess", player.lichess_rating, lichess_res);

    let highest = ranking::highest_rating([fide, chesscom, lichess]);
    db::players::update_ratings(db, player.id, fide, chesscom, lichess, highest).await?;

    info!(
        player = %player.name,
        attempted = outcome.attempted,
        succeeded = outcome.succeeded,
        ?highest,
        "refreshed ratings"
    );
    Ok(outcome)
}

fn settle(
    outcome: &mut RefreshOutcome,
    provider: &str,
    previous: Option<f64>,
    fetched: Option<Result<Option<f64>>>,
) -> Option<f64> {
    match fetched {
        None => previous,
        Some(Ok(rating)) => {
            outcome.attempted += 1;
            outcome.succeeded += 1;
            rating.or(previous)
        }
        Some(Err(e)) => {
            outcome.attempted += 1;
            warn!(provider, error = %e, "rating fetch failed; keeping previous value");
            previous
        }
    }
}

/// Refresh every player sequentially, then recompute the ranking once.
/// Returns how many players were refreshed without an internal error.
pub async fn refresh_all(db: &Db, providers: &ProviderClient) -> Result<usize> {
    let players = db::players::list(db).await?;
    let mut refreshed = 0usize;
    for player in &players {
        match refresh_player(db, providers, player).await {
            Ok(_) => refreshed += 1,
            Err(e) => warn!(player = %player.name, error = %e, "refresh failed"),
        }
    }
    ranking::recompute(db).await?;
    Ok(refreshed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn settle_prefers_fresh_data_and_falls_back_to_previous() {
        let mut outcome = RefreshOutcome::default();

        // No identifier: untouched, not attempted.
        assert_eq!(settle(&mut outcome, "p", Some(1500.0), None), Some(1500.0));
        assert_eq!(outcome.attempted, 0);

        // Fresh rating wins.
        assert_eq!(
            settle(&mut outcome, "p", Some(1500.0), Some(Ok(Some(1600.0)))),
            Some(1600.0)
        );

        // Definitive "not found" keeps the previous value but counts as answered.
        assert_eq!(
            settle(&mut outcome, "p", Some(1500.0), Some(Ok(None))),
            Some(1500.0)
        );
        assert_eq!(outcome.succeeded, 2);

        // Exhausted retries keep the previous value and count as failed.
        assert_eq!(
            settle(&mut outcome, "p", Some(1500.0), Some(Err(anyhow!("down")))),
            Some(1500.0)
        );
        assert_eq!(outcome.attempted, 3);
        assert_eq!(outcome.succeeded, 2);
    }

    #[test]
    fn all_failed_requires_at_least_one_attempt() {
        assert!(!RefreshOutcome::default().all_failed());
        assert!(RefreshOutcome {
            attempted: 2,
            succeeded: 0
        }
        .all_failed());
        assert!(!RefreshOutcome {
            attempted: 2,
            succeeded: 1
        }
        .all_failed());
    }
}
