use std::str::FromStr;

use crate::middleware::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_namespace: String,
    pub db_database: String,
    pub db_password: Option<String>,
    pub db_username: Option<String>,
    pub db_url: String,
    pub sentry_project_link: Option<String>,
    pub transfer_max_attempts: u32,
    pub history_max_page_size: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_namespace: "namespace".to_string(),
            db_database: "database".to_string(),
            db_password: None,
            db_username: None,
            db_url: "mem://".to_string(),
            sentry_project_link: None,
            transfer_max_attempts: 5,
            history_max_page_size: 100,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let defaults = Self::default();
        let db_namespace = lookup("DB_NAMESPACE").unwrap_or(defaults.db_namespace);
        let db_database = lookup("DB_DATABASE").unwrap_or(defaults.db_database);
        let db_password = lookup("DB_PASSWORD");
        let db_username = lookup("DB_USERNAME");
        let db_url = lookup("DB_URL").unwrap_or(defaults.db_url);
        let sentry_project_link = lookup("SENTRY_PROJECT_LINK").filter(|v| !v.is_empty());

        let transfer_max_attempts: u32 = parse_var(
            "TRANSFER_MAX_ATTEMPTS",
            lookup("TRANSFER_MAX_ATTEMPTS"),
            defaults.transfer_max_attempts,
        )?;
        if transfer_max_attempts == 0 {
            return Err(AppError::validation("TRANSFER_MAX_ATTEMPTS must be at least 1"));
        }
        let history_max_page_size: u64 = parse_var(
            "HISTORY_MAX_PAGE_SIZE",
            lookup("HISTORY_MAX_PAGE_SIZE"),
            defaults.history_max_page_size,
        )?;
        if history_max_page_size == 0 {
            return Err(AppError::validation("HISTORY_MAX_PAGE_SIZE must be at least 1"));
        }

        Ok(Self {
            db_namespace,
            db_database,
            db_password,
            db_username,
            db_url,
            sentry_project_link,
            transfer_max_attempts,
            history_max_page_size,
        })
    }
}

fn parse_var<T: FromStr>(name: &str, value: Option<String>, default: T) -> AppResult<T> {
    match value {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::validation(format!("{name} must be number"))),
    }
}
