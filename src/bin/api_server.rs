// HTTP API server binary for chess-ladder

use anyhow::Result;
use chess_ladder::api::ApiServer;
use chess_ladder::db::Db;
use chess_ladder::providers::ProviderClient;
use chess_ladder::util::env as env_util;

#[actix_web::main]
async fn main() -> Result<()> {
    chess_ladder::logging::init_tracing("info,sqlx=warn")?;

    tracing::info!("initializing chess-ladder API server");

    env_util::init_env();

    let server = ApiServer::from_env()?;

    let database_url = env_util::db_url();
    let max_connections: u32 = env_util::env_parse("DB_MAX_CONNS", 5u32);
    let db = Db::connect(&database_url, max_connections).await?;

    let providers = ProviderClient::from_env()?;

    server.run(db, providers).await?;

    Ok(())
}
