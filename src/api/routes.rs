// API route configuration

use crate::api::handlers;
use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Health check and frontend (no auth required)
        .route("/health", web::get().to(handlers::health_check))
        .route("/", web::get().to(handlers::index))
        // Player CRUD
        .route("/players/", web::post().to(handlers::create_player))
        .route("/players/", web::get().to(handlers::get_players))
        .route(
            "/players/rankings/",
            web::get().to(handlers::get_rankings),
        )
        .route(
            "/players/ratings/",
            web::get().to(handlers::get_player_ratings),
        )
        .route(
            "/players/{id}/update/",
            web::post().to(handlers::update_player),
        )
        .route(
            "/players/delete/{name}",
            web::delete().to(handlers::delete_player),
        )
        // Roster import
        .route("/sync/sheet/", web::post().to(handlers::sync_sheet));
}
