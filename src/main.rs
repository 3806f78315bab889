use std::sync::Arc;

use anyhow::Context;
use log::info;

use studydeck::routes::{self, AppState};
use studydeck::services::{ContentGenerator, DatabaseService, OracleClient};
use studydeck::AppConfig;

fn setup_logging(level: log::LevelFilter) -> anyhow::Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()
        .context("failed to install logger")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    setup_logging(config.log_level)?;

    let db = Arc::new(DatabaseService::new(&config.db_path)?);
    let removed = db.delete_expired_sessions()?;
    if removed > 0 {
        info!("removed {} expired sessions", removed);
    }

    let generator = Arc::new(ContentGenerator::new(OracleClient::new(&config)));
    let state = AppState { db, generator };

    info!("studydeck listening on {}", config.addr);
    routes::serve(&config.addr, state).await
}
