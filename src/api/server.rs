// API server implementation using actix-web

use crate::api::{auth, middleware, routes};
use crate::db::Db;
use crate::providers::ProviderClient;
use crate::util::env as env_util;
use actix_files::Files;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Shared request-handler configuration.
#[derive(Clone)]
pub struct ApiConfig {
    pub static_dir: PathBuf,
}

pub struct ApiServer {
    pub host: String,
    pub port: u16,
    pub api_secret: Option<String>,
    pub allowed_origins: String,
    pub static_dir: PathBuf,
}

impl ApiServer {
    /// Create server from environment variables
    pub fn from_env() -> Result<Self> {
        env_util::init_env();

        let host = env_util::env_opt("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = env_util::env_parse("API_PORT", 8000u16);
        let api_secret = env_util::env_opt("API_SECRET");
        let allowed_origins =
            env_util::env_opt("ALLOWED_ORIGINS").unwrap_or_else(|| "*".to_string());
        let static_dir =
            PathBuf::from(env_util::env_opt("STATIC_DIR").unwrap_or_else(|| "static".to_string()));

        Ok(Self {
            host,
            port,
            api_secret,
            allowed_origins,
            static_dir,
        })
    }

    /// Start the HTTP server
    pub async fn run(self, db: Db, providers: ProviderClient) -> Result<()> {
        let bind_addr = format!("{}:{}", self.host, self.port);

        tracing::info!(
            host = %self.host,
            port = %self.port,
            auth = self.api_secret.is_some(),
            "starting chess-ladder API server"
        );

        let db_data = web::Data::new(db);
        let providers_data = web::Data::new(providers);
        let config_data = web::Data::new(ApiConfig {
            static_dir: self.static_dir.clone(),
        });
        let api_secret = self.api_secret.clone();
        let allowed_origins = self.allowed_origins.clone();
        let static_dir = self.static_dir.clone();

        HttpServer::new(move || {
            let (logger, compress) = middleware::setup_middleware();
            let cors = middleware::setup_cors(&allowed_origins);
            let auth = auth::Auth::new(api_secret.clone());

            App::new()
                .app_data(db_data.clone())
                .app_data(providers_data.clone())
                .app_data(config_data.clone())
                .wrap(logger)
                .wrap(compress)
                .wrap(cors)
                .wrap(auth)
                .configure(routes::configure_routes)
                .service(Files::new("/static", static_dir.clone()))
        })
        .bind(&bind_addr)
        .with_context(|| format!("failed to bind to {bind_addr}"))?
        .run()
        .await
        .context("HTTP server error")?;

        Ok(())
    }
}
