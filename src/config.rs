use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::weekday::DayOfWeek;

pub const ENV_DATA_DIR: &str = "SCHEDULER_DATA_DIR";
pub const ENV_DATABASE_FILE: &str = "SCHEDULER_DATABASE_FILE";
pub const ENV_LOG: &str = "SCHEDULER_LOG";
pub const ENV_LOG_TO_FILE: &str = "SCHEDULER_LOG_TO_FILE";

pub const DEFAULT_LOG_DIRECTIVES: &str = "info,app::schedule=debug,app::db=info";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub database_file: String,
    pub log_directives: String,
    pub log_to_file: bool,
    /// Weekday numbers (2 = Monday .. 8 = Sunday) offered by the option filter.
    pub weekdays: Vec<u8>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            database_file: "scheduler.sqlite".to_string(),
            log_directives: DEFAULT_LOG_DIRECTIVES.to_string(),
            log_to_file: true,
            weekdays: DayOfWeek::ALL.iter().map(|day| day.number()).collect(),
        }
    }
}

impl AppConfig {
    /// Reads `path` when given (missing fields fall back to defaults), then
    /// applies environment overrides and validates the result.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|err| {
                    AppError::config(format!("cannot read {}: {err}", path.display()))
                })?;
                Self::from_yaml(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.weekday_list()?;

        info!(
            target: "app::config",
            data_dir = %config.data_dir.display(),
            database = %config.database_file,
            log_to_file = config.log_to_file,
            "configuration loaded"
        );
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> AppResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn apply_env_overrides(&mut self) -> AppResult<()> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(file) = lookup(ENV_DATABASE_FILE) {
            self.database_file = file;
        }
        if let Some(directives) = lookup(ENV_LOG) {
            self.log_directives = directives;
        }
        if let Some(flag) = lookup(ENV_LOG_TO_FILE) {
            self.log_to_file = match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => {
                    return Err(AppError::config(format!(
                        "{ENV_LOG_TO_FILE} must be a boolean, got {other:?}"
                    )))
                }
            };
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn weekday_list(&self) -> AppResult<Vec<DayOfWeek>> {
        if self.weekdays.is_empty() {
            return Err(AppError::config("at least one weekday must be enabled"));
        }
        let mut days = Vec::with_capacity(self.weekdays.len());
        for number in &self.weekdays {
            let day = DayOfWeek::new(*number).map_err(|err| AppError::config(err.to_string()))?;
            if !days.contains(&day) {
                days.push(day);
            }
        }
        Ok(days)
    }
}
