// HTTP request handlers for API endpoints

use crate::api::models::*;
use crate::api::server::ApiConfig;
use crate::db::players::{NewPlayer, Player};
use crate::db::{self, Db};
use crate::providers::ProviderClient;
use crate::ranking;
use crate::refresh;
use crate::sheet;
use actix_files::NamedFile;
use actix_web::{web, HttpResponse, Result};
use tracing::{error, warn};

fn bad_request(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiResponse::<()>::error(message))
}

fn not_found(message: impl Into<String>) -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::<()>::error(message))
}

fn internal_error(context: &str, err: anyhow::Error) -> HttpResponse {
    error!(error = %err, "{context}");
    HttpResponse::InternalServerError().json(ApiResponse::<()>::error(context))
}

fn normalize_opt(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn fmt_rating(rating: f64) -> String {
    if rating.fract() == 0.0 {
        format!("{rating:.0}")
    } else {
        rating.to_string()
    }
}

/// Health check endpoint
pub async fn health_check(db: web::Data<Db>) -> Result<HttpResponse> {
    let db_status = match sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&db.pool)
        .await
    {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    let response = ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        database: db_status.to_string(),
    });
    Ok(HttpResponse::Ok().json(response))
}

/// Serve the bundled frontend.
pub async fn index(config: web::Data<ApiConfig>) -> Result<NamedFile> {
    let path = config.static_dir.join("index.html");
    NamedFile::open_async(path)
        .await
        .map_err(|_| actix_web::error::ErrorNotFound("index file not found"))
}

/// Create a player and fetch its initial ratings.
pub async fn create_player(
    payload: web::Json<CreatePlayerRequest>,
    db: web::Data<Db>,
    providers: web::Data<ProviderClient>,
) -> Result<HttpResponse> {
    let request = payload.into_inner();
    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Ok(bad_request("name is required"));
    }

    let new = NewPlayer {
        name,
        fide_id: request.fide_id,
        chesscom_username: normalize_opt(request.chesscom_username),
        lichess_username: normalize_opt(request.lichess_username),
    };
    if !new.has_identifier() {
        return Ok(bad_request(
            "at least one identifier (FIDE ID, Chess.com username, or Lichess username) is required",
        ));
    }

    let player = match db::players::insert(&db, &new).await {
        Ok(p) => p,
        Err(e) if db::players::is_unique_violation(&e) => {
            return Ok(bad_request(
                "a player with that name or identifier already exists",
            ));
        }
        Err(e) => return Ok(internal_error("failed to create player", e)),
    };

    // Creation is user-initiated: if every supplied identifier exhausts its
    // retries, roll the row back and report the failure instead of silently
    // keeping an unrated player.
    match refresh::refresh_player(&db, &providers, &player).await {
        Ok(outcome) if outcome.all_failed() => {
            if let Err(e) = db::players::delete(&db, player.id).await {
                warn!(player_id = player.id, error = %e, "rollback after failed creation");
            }
            return Ok(HttpResponse::BadGateway().json(ApiResponse::<()>::error(
                "could not reach any rating provider for the supplied identifiers",
            )));
        }
        Ok(_) => {}
        Err(e) => return Ok(internal_error("failed to store initial ratings", e)),
    }

    if let Err(e) = ranking::recompute(&db).await {
        return Ok(internal_error("failed to recompute ranking", e));
    }

    // The recompute may have renumbered the new row; reload it by name.
    match db::players::find_by_name(&db, &new.name).await {
        Ok(Some(created)) => Ok(HttpResponse::Ok().json(ApiResponse::success(created))),
        Ok(None) => Ok(internal_error(
            "created player disappeared",
            anyhow::anyhow!("no row named {}", new.name),
        )),
        Err(e) => Ok(internal_error("failed to reload created player", e)),
    }
}

/// List all players.
pub async fn get_players(db: web::Data<Db>) -> Result<HttpResponse> {
    match db::players::list(&db).await {
        Ok(players) => Ok(HttpResponse::Ok().json(ApiResponse::success(players))),
        Err(e) => Ok(internal_error("failed to list players", e)),
    }
}

/// Ranked leaderboard: descending by highest rating, unrated last.
pub async fn get_rankings(db: web::Data<Db>) -> Result<HttpResponse> {
    let players = match db::players::list(&db).await {
        Ok(players) => players,
        Err(e) => return Ok(internal_error("failed to list players", e)),
    };

    let rankings: Vec<RankedPlayer> = ranking::order_for_ranking(players)
        .into_iter()
        .enumerate()
        .map(|(i, player)| RankedPlayer {
            rank: i + 1,
            player,
        })
        .collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(rankings)))
}

/// Refresh one player's ratings from every provider it has an identifier for.
pub async fn update_player(
    path: web::Path<i64>,
    db: web::Data<Db>,
    providers: web::Data<ProviderClient>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    let player = match db::players::get(&db, id).await {
        Ok(Some(p)) => p,
        Ok(None) => return Ok(not_found("player not found")),
        Err(e) => return Ok(internal_error("failed to load player", e)),
    };

    if let Err(e) = refresh::refresh_player(&db, &providers, &player).await {
        return Ok(internal_error("failed to update player ratings", e));
    }
    if let Err(e) = ranking::recompute(&db).await {
        return Ok(internal_error("failed to recompute ranking", e));
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
        "message": "ratings updated successfully"
    }))))
}

/// Live per-provider snapshot for every player. Nothing is stored; each
/// provider failure renders as "-" in that cell.
pub async fn get_player_ratings(
    db: web::Data<Db>,
    providers: web::Data<ProviderClient>,
) -> Result<HttpResponse> {
    let players = match db::players::list(&db).await {
        Ok(players) => players,
        Err(e) => return Ok(internal_error("failed to list players", e)),
    };

    let mut rows = Vec::with_capacity(players.len());
    for player in &players {
        rows.push(live_row(&providers, player).await);
    }
    rows.sort_by(|a, b| b.fide_sort_key().total_cmp(&a.fide_sort_key()));

    Ok(HttpResponse::Ok().json(ApiResponse::success(rows)))
}

async fn live_row(providers: &ProviderClient, player: &Player) -> LiveRatingRow {
    let fide_call = async {
        match player.fide_id {
            Some(id) => Some(providers.fide_profile(id).await),
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
    let (fide, chesscom, lichess) = tokio::join!(fide_call, chesscom_call, lichess_call);

    // The snapshot table shows the rapid rating for FIDE, matching the
    // column the club plays under.
    let fide_rating = match fide {
        Some(Ok(Some(profile))) => profile.rapid_rating.map(fmt_rating),
        Some(Ok(None)) => None,
        Some(Err(e)) => {
            warn!(player = %player.name, error = %e, "live FIDE fetch failed");
            None
        }
        None => None,
    };

    LiveRatingRow {
        name: player.name.clone(),
        fide_id: player
            .fide_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string()),
        fide_rating: fide_rating.unwrap_or_else(|| "-".to_string()),
        chesscom_rating: settle_live(player, "chess.com", chesscom),
        lichess_rating: settle_live(player, "lichess", lichess),
    }
}

fn settle_live(
    player: &Player,
    provider: &str,
    fetched: Option<anyhow::Result<Option<f64>>>,
) -> String {
    match fetched {
        Some(Ok(Some(rating))) => fmt_rating(rating),
        Some(Err(e)) => {
            warn!(player = %player.name, provider, error = %e, "live rating fetch failed");
            "-".to_string()
        }
        _ => "-".to_string(),
    }
}

/// Delete a player by display name.
pub async fn delete_player(path: web::Path<String>, db: web::Data<Db>) -> Result<HttpResponse> {
    let name = path.into_inner();
    match db::players::delete_by_name(&db, &name).await {
        Ok(true) => Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
            "message": format!("player {name} deleted successfully")
        })))),
        Ok(false) => Ok(not_found(format!("player {name} not found"))),
        Err(e) => Ok(internal_error("failed to delete player", e)),
    }
}

/// Replace the roster from a published Google Sheet.
pub async fn sync_sheet(
    query: web::Query<SheetSyncRequest>,
    db: web::Data<Db>,
    providers: web::Data<ProviderClient>,
) -> Result<HttpResponse> {
    let gid = query.gid.unwrap_or(0);
    match sheet::import_from_sheet(&db, &providers, &query.spreadsheet_id, gid).await {
        Ok(summary) => Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
            "message": format!(
                "successfully synced {} players from sheet",
                summary.success_count
            ),
            "details": summary,
        })))),
        Err(e) if e.is::<sheet::EmptySheet>() => Ok(bad_request("no data found in sheet")),
        Err(e) => Ok(internal_error("failed to sync data from sheet", e)),
    }
}
