use std::env;
use std::time::Duration;

use secrecy::SecretString;

use crate::engine::transition::TransitionPolicy;
use crate::error::AppError;

const DEFAULT_PUSH_API_URL: &str = "https://onesignal.com/api/v1/notifications";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected compact or json, got {other}")),
        }
    }
}

/// Credentials and endpoint for the push-delivery API.
#[derive(Debug, Clone)]
pub struct PushSettings {
    pub app_id: String,
    pub api_key: SecretString,
    pub endpoint: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub notification_queue_size: usize,
    pub event_buffer_size: usize,
    pub transition_policy: TransitionPolicy,
    pub push: Option<PushSettings>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            http_port: parse_or_default(&lookup, "HTTP_PORT", 3000)?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format: parse_or_default(&lookup, "LOG_FORMAT", LogFormat::Compact)?,
            notification_queue_size: parse_positive(&lookup, "NOTIFICATION_QUEUE_SIZE", 1024)?,
            event_buffer_size: parse_positive(&lookup, "EVENT_BUFFER_SIZE", 1024)?,
            transition_policy: parse_or_default(
                &lookup,
                "TRANSITION_POLICY",
                TransitionPolicy::Strict,
            )?,
            push: push_settings(&lookup)?,
        })
    }
}

fn push_settings<F>(lookup: &F) -> Result<Option<PushSettings>, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let app_id = lookup("PUSH_APP_ID").filter(|value| !value.trim().is_empty());
    let api_key = lookup("PUSH_API_KEY").filter(|value| !value.trim().is_empty());

    let (Some(app_id), Some(api_key)) = (app_id, api_key) else {
        return Ok(None);
    };

    let timeout_secs: u64 = parse_or_default(lookup, "PUSH_TIMEOUT_SECS", 30)?;

    Ok(Some(PushSettings {
        app_id,
        api_key: SecretString::from(api_key),
        endpoint: lookup("PUSH_API_URL").unwrap_or_else(|| DEFAULT_PUSH_API_URL.to_string()),
        timeout: Duration::from_secs(timeout_secs),
    }))
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        None => Ok(default),
    }
}

/// Channel capacities; tokio rejects a zero-sized bounded channel.
fn parse_positive<F>(lookup: &F, key: &str, default: usize) -> Result<usize, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_or_default(lookup, key, default)? {
        0 => Err(AppError::Internal(format!("invalid {key}: must be > 0"))),
        value => Ok(value),
    }
}
