pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use tracing::info;

use crate::commands::AppState;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::error::AppResult;

/// Initializes logging, opens (and migrates) the database and builds the
/// command state.
pub fn bootstrap(config: &AppConfig) -> AppResult<AppState> {
    crate::utils::logger::init_logging(config)?;

    std::fs::create_dir_all(&config.data_dir)?;
    let pool = DbPool::new(config.database_path())?;
    let state = AppState::new(pool, config)?;

    info!(
        target: "app::config",
        database = %config.database_path().display(),
        "scheduler backend ready"
    );
    Ok(state)
}
