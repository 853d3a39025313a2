//! Rating aggregation and rank recomputation.
//!
//! A player's "highest rating" is always derived from the per-platform
//! columns; it is never authoritative on its own. Ranks are the 1-based
//! positions in a strict descending sort with unrated players last, and the
//! primary keys are renumbered to match after every rating change.

use crate::db::players::Player;
use crate::db::{self, Db};
use anyhow::Result;
use std::cmp::Ordering;
use tracing::info;

/// Max of the present ratings; None when no provider reported one.
pub fn highest_rating<I>(ratings: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    ratings
        .into_iter()
        .flatten()
        .fold(None, |best, r| match best {
            Some(b) => Some(b.max(r)),
            None => Some(r),
        })
}

/// Descending by highest rating, unrated players last; ties (including ties
/// between unrated players) break on the existing id so repeated
/// recomputations leave the order unchanged.
pub fn order_for_ranking(mut players: Vec<Player>) -> Vec<Player> {
    players.sort_by(compare_for_ranking);
    players
}

fn compare_for_ranking(a: &Player, b: &Player) -> Ordering {
    match (a.highest_rating, b.highest_rating) {
        (Some(ra), Some(rb)) => rb.total_cmp(&ra).then(a.id.cmp(&b.id)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    }
}

/// Reload the full player set, sort it, and renumber the primary keys 1..=n
/// by rank position. Runs after every rating mutation (create, refresh,
/// sheet import).
pub async fn recompute(db: &Db) -> Result<()> {
    let players = db::players::list(db).await?;
    let ordered = order_for_ranking(players);
    let ids: Vec<i64> = ordered.iter().map(|p| p.id).collect();
    db::players::renumber(db, &ids).await?;
    info!(players = ids.len(), "recomputed ranking");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn player(id: i64, highest: Option<f64>) -> Player {
        Player {
            id,
            name: format!("player-{id}"),
            fide_id: None,
            chesscom_username: None,
            lichess_username: None,
            fide_rating: None,
            chesscom_rating: None,
            lichess_rating: None,
            highest_rating: highest,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn highest_rating_is_max_of_present_values() {
        assert_eq!(
            highest_rating([Some(2100.0), None, Some(1850.0)]),
            Some(2100.0)
        );
        assert_eq!(highest_rating([None, Some(1500.0), None]), Some(1500.0));
        assert_eq!(highest_rating([None, None, None]), None);
    }

    #[test]
    fn orders_descending_with_unrated_last() {
        let ordered = order_for_ranking(vec![
            player(1, Some(1500.0)),
            player(2, None),
            player(3, Some(2200.0)),
            player(4, Some(1900.0)),
        ]);
        let ids: Vec<i64> = ordered.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 4, 1, 2]);
    }

    #[test]
    fn ties_break_on_original_id() {
        let ordered = order_for_ranking(vec![
            player(7, Some(1800.0)),
            player(2, Some(1800.0)),
            player(9, None),
            player(4, None),
        ]);
        let ids: Vec<i64> = ordered.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 7, 4, 9]);
    }

    #[test]
    fn ordering_is_stable_across_recomputations() {
        let once = order_for_ranking(vec![
            player(5, Some(1700.0)),
            player(6, Some(1700.0)),
            player(1, Some(2000.0)),
        ]);
        let twice = order_for_ranking(once.clone());
        let a: Vec<i64> = once.iter().map(|p| p.id).collect();
        let b: Vec<i64> = twice.iter().map(|p| p.id).collect();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn recompute_renumbers_ids_to_match_rank() {
        let db = Db::connect_in_memory().await.expect("in-memory db");
        for (name, rating) in [
            ("alice", Some(1600.0)),
            ("bob", Some(2100.0)),
            ("carol", None),
            ("dave", Some(1900.0)),
        ] {
            let p = db::players::insert(
                &db,
                &db::players::NewPlayer {
                    name: name.to_string(),
                    fide_id: None,
                    chesscom_username: Some(format!("cc-{name}")),
                    lichess_username: None,
                },
            )
            .await
            .expect("insert");
            db::players::update_ratings(&db, p.id, None, rating, None, rating)
                .await
                .expect("set rating");
        }

        recompute(&db).await.expect("recompute");

        let players = db::players::list(&db).await.expect("list");
        let by_rank: Vec<(i64, String)> =
            players.into_iter().map(|p| (p.id, p.name)).collect();
        assert_eq!(
            by_rank,
            vec![
                (1, "bob".to_string()),
                (2, "dave".to_string()),
                (3, "alice".to_string()),
                (4, "carol".to_string()),
            ]
        );
    }
}
