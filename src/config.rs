// src/config.rs

use std::env;

use dotenvy::dotenv;
use thiserror::Error;

use crate::entitlement::OperatorAllowlist;

/// Questions kept in a timed attempt after the bank has been shuffled.
pub const TIMED_QUESTION_CAP: usize = 25;

/// Default countdown for a timed attempt, in seconds.
pub const TIMED_LIMIT_SECONDS: u32 = 1500;

/// Newest results returned by the history endpoint.
pub const RESULT_HISTORY_LIMIT: i64 = 50;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: String,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    /// Emails that bypass the subscription check.
    pub operator_emails: Vec<String>,
    pub timed_limit_seconds: u32,
    pub timed_question_cap: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let jwt_secret = lookup("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let jwt_expiration = parse_or(&lookup, "JWT_EXPIRATION", 86_400)?;
        let timed_limit_seconds = parse_or(&lookup, "TIMED_LIMIT_SECONDS", TIMED_LIMIT_SECONDS)?;
        let timed_question_cap = parse_or(&lookup, "TIMED_QUESTION_CAP", TIMED_QUESTION_CAP)?;

        if timed_limit_seconds == 0 {
            return Err(ConfigError::Invalid {
                key: "TIMED_LIMIT_SECONDS",
                value: "0".to_string(),
            });
        }
        if timed_question_cap == 0 {
            return Err(ConfigError::Invalid {
                key: "TIMED_QUESTION_CAP",
                value: "0".to_string(),
            });
        }

        let operator_emails = lookup("OPERATOR_EMAILS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|email| !email.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            admin_email: lookup("ADMIN_EMAIL"),
            admin_password: lookup("ADMIN_PASSWORD"),
            operator_emails,
            timed_limit_seconds,
            timed_question_cap,
        })
    }

    pub fn operator_allowlist(&self) -> OperatorAllowlist {
        OperatorAllowlist::new(self.operator_emails.iter().cloned())
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
