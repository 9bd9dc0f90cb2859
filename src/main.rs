use std::sync::Arc;

use anyhow::Result;
use sewa_gedung::background::completion_loop;
use sewa_gedung::config::config_loader;
use sewa_gedung::infrastructure::axum_http::http_serve;
use sewa_gedung::infrastructure::axum_http::routers::bookings;
use sewa_gedung::infrastructure::postgres::postgres_connection;
use sewa_gedung::observability;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Backend exited with error: {}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    observability::init_observability("backend")?;

    let stage = config_loader::get_stage();
    let dotenvy_env = config_loader::load()?;
    info!(stage = stage.as_str(), "ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(&dotenvy_env.database.url)?;
    info!("Postgres connection has been established");

    let config = Arc::new(dotenvy_env);
    let db_pool = Arc::new(postgres_pool);

    let sweeper_usecase = bookings::build_usecase(Arc::clone(&db_pool), &config)?;
    tokio::spawn(async move {
        if let Err(error) = completion_loop::run_completion_loop(sweeper_usecase).await {
            error!("Completion loop exited with error: {}", error);
        }
    });

    http_serve::start(config, db_pool).await?;

    Ok(())
}
