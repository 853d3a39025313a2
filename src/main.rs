use anyhow::{Context, Result};
use chess_ladder::api::ApiServer;
use chess_ladder::db::{self, Db};
use chess_ladder::providers::ProviderClient;
use chess_ladder::util::env as env_util;
use chess_ladder::{logging, ranking, refresh, sheet};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "chess-ladder", version, about = "Chess club ladder admin CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Run the HTTP API server
    Serve,
    /// Print the current leaderboard
    Rankings {
        /// Optional override for the database URL
        #[arg(long)]
        db_url: Option<String>,
    },
    /// Refresh stored ratings from every provider (one player, or everyone)
    Refresh {
        /// Player id to refresh; refreshes all players when omitted
        #[arg(long)]
        player: Option<i64>,
        /// Optional override for the database URL
        #[arg(long)]
        db_url: Option<String>,
    },
    /// Replace the roster from a published Google Sheet
    ImportSheet {
        /// Spreadsheet id from the sheet URL
        #[arg(long)]
        spreadsheet_id: String,
        /// Worksheet gid within the spreadsheet
        #[arg(long, default_value_t = 0)]
        gid: u64,
        /// Optional override for the database URL
        #[arg(long)]
        db_url: Option<String>,
    },
}

#[actix_web::main]
async fn main() -> Result<()> {
    logging::init_tracing("info,sqlx=warn")?;
    env_util::init_env();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve => {
            let server = ApiServer::from_env()?;
            let db = connect(None).await?;
            let providers = ProviderClient::from_env()?;
            server.run(db, providers).await
        }
        Commands::Rankings { db_url } => {
            let db = connect(db_url).await?;
            let players = ranking::order_for_ranking(db::players::list(&db).await?);
            for (i, player) in players.iter().enumerate() {
                let rating = player
                    .highest_rating
                    .map(|r| format!("{r:.0}"))
                    .unwrap_or_else(|| "unrated".to_string());
                println!("{:>3}. {:<30} {rating}", i + 1, player.name);
            }
            Ok(())
        }
        Commands::Refresh { player, db_url } => {
            let db = connect(db_url).await?;
            let providers = ProviderClient::from_env()?;
            match player {
                Some(id) => {
                    let player = db::players::get(&db, id)
                        .await?
                        .with_context(|| format!("no player with id {id}"))?;
                    let outcome = refresh::refresh_player(&db, &providers, &player).await?;
                    ranking::recompute(&db).await?;
                    println!(
                        "refreshed {}: {}/{} providers answered",
                        player.name, outcome.succeeded, outcome.attempted
                    );
                }
                None => {
                    let count = refresh::refresh_all(&db, &providers).await?;
                    println!("refreshed {count} players");
                }
            }
            Ok(())
        }
        Commands::ImportSheet {
            spreadsheet_id,
            gid,
            db_url,
        } => {
            let db = connect(db_url).await?;
            let providers = ProviderClient::from_env()?;
            let summary = sheet::import_from_sheet(&db, &providers, &spreadsheet_id, gid).await?;
            println!(
                "imported {} players ({} rows, {} errors)",
                summary.success_count, summary.total_rows, summary.error_count
            );
            Ok(())
        }
    }
}

async fn connect(db_url: Option<String>) -> Result<Db> {
    let url = db_url.unwrap_or_else(env_util::db_url);
    let max_connections = env_util::env_parse("DB_MAX_CONNS", 5u32);
    Db::connect(&url, max_connections).await
}
