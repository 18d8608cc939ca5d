pub mod api;
pub mod booking;
pub mod cli;
pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod payments;
pub mod rate_limiter;
pub mod rating;
pub mod services;
pub mod weather;

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use cli::Cli;
use log::info;

use crate::cli::Command;
use crate::config::settings::AppConfig;
use crate::database::setup;
use crate::services::notifications::NotificationHub;
use crate::services::server::ServerService;
use crate::services::sweeper::CancellationSweeper;
use crate::weather::OpenWeatherClient;

pub fn interpret() -> Command {
    let cli = Cli::parse();
    cli.command
}

pub fn handle_serve(port: u16) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let config = AppConfig::from_env();
        let service = ServerService::new(port, config);
        service.run().await
    })
}

pub fn handle_sweep() -> Result<()> {
    let config = AppConfig::from_env();
    let Some(forecast) = OpenWeatherClient::from_settings(&config.weather, config.server.user_agent)? else {
        bail!("WEATHER_API_KEY is not set, cannot run the weather sweep");
    };
    let pool = database::create_pool(&config.server.database_path)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let sweeper = CancellationSweeper::new(pool, Arc::new(forecast), NotificationHub::new(), config.sweep.clone());
        let processed = sweeper.sweep().await?;
        info!("Processed {} bookings", processed);
        Ok(())
    })
}

pub fn handle_init_db() -> Result<()> {
    let config = AppConfig::from_env();
    let pool = database::create_pool(&config.server.database_path)?;
    let conn = database::get_connection(&pool)?;
    setup::initialize_database(&conn)?;
    info!("Database ready at {}", config.server.database_path);
    Ok(())
}
