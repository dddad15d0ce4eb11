use crate::domain::Decimal;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub telegram_bot_token: String,
    pub telegram_api_url: String,
    pub event_log: EventLogLocation,
    pub admin_ids: BTreeSet<i64>,
    pub reference_bank: Decimal,
    pub share_fraction: Decimal,
    pub poll_interval: Duration,
    pub replay_history: bool,
    pub deposit_address: Option<String>,
    pub deposit_network: String,
}

/// Where the trading bot's event log is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventLogLocation {
    Url(String),
    Path(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| env_value(&env_map, key);
        let required = |key: &str| {
            env_value(&env_map, key)
                .map(str::to_string)
                .ok_or_else(|| ConfigError::MissingEnv(key.to_string()))
        };

        let port = get("PORT").unwrap_or("8080").parse::<u16>().map_err(|_| {
            ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
        })?;

        let database_path = required("DATABASE_PATH")?;
        let telegram_bot_token = required("TELEGRAM_BOT_TOKEN")?;
        let telegram_api_url = get("TELEGRAM_API_URL")
            .unwrap_or("https://api.telegram.org")
            .to_string();

        let event_log = match (get("EVENT_LOG_URL"), get("EVENT_LOG_PATH")) {
            (Some(url), _) => EventLogLocation::Url(url.to_string()),
            (None, Some(path)) => EventLogLocation::Path(path.to_string()),
            (None, None) => return Err(ConfigError::MissingEnv("EVENT_LOG_URL".to_string())),
        };

        let admin_ids = parse_admin_ids(&required("ADMIN_IDS")?);
        if admin_ids.is_empty() {
            return Err(ConfigError::InvalidValue(
                "ADMIN_IDS".to_string(),
                "must contain at least one numeric id".to_string(),
            ));
        }

        let reference_bank = parse_decimal(get("REFERENCE_BANK_USDT"), "1000", "REFERENCE_BANK_USDT")?;
        if !reference_bank.is_positive() {
            return Err(ConfigError::InvalidValue(
                "REFERENCE_BANK_USDT".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let share_fraction =
            parse_decimal(get("PROFIT_SHARE_FRACTION"), "0.30", "PROFIT_SHARE_FRACTION")?;
        if share_fraction.is_negative() || share_fraction > Decimal::from_i64(1) {
            return Err(ConfigError::InvalidValue(
                "PROFIT_SHARE_FRACTION".to_string(),
                "must be between 0 and 1".to_string(),
            ));
        }

        let poll_secs = get("POLL_INTERVAL_SECS")
            .unwrap_or("10")
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "POLL_INTERVAL_SECS".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        let replay_history = match get("REPLAY_HISTORY").map(str::to_lowercase).as_deref() {
            None | Some("false") | Some("0") | Some("no") => false,
            Some("true") | Some("1") | Some("yes") => true,
            Some(other) => {
                return Err(ConfigError::InvalidValue(
                    "REPLAY_HISTORY".to_string(),
                    format!("must be true or false, got {}", other),
                ))
            }
        };

        Ok(Config {
            port,
            database_path,
            telegram_bot_token,
            telegram_api_url,
            event_log,
            admin_ids,
            reference_bank,
            share_fraction,
            poll_interval: Duration::from_secs(poll_secs),
            replay_history,
            deposit_address: get("DEPOSIT_ADDRESS").map(str::to_string),
            deposit_network: get("DEPOSIT_NETWORK")
                .unwrap_or("TRON / TRC-20")
                .to_string(),
        })
    }
}

/// Trimmed value; blank counts as unset.
fn env_value<'a>(env_map: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env_map
        .get(key)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

fn parse_decimal(raw: Option<&str>, default: &str, key: &str) -> Result<Decimal, ConfigError> {
    Decimal::parse_lenient(raw.unwrap_or(default)).ok_or_else(|| {
        ConfigError::InvalidValue(key.to_string(), "must be a decimal number".to_string())
    })
}

/// Parse admin ids given as a JSON list (`[1, "2"]`), a single number, or
/// numbers separated by whitespace, commas or semicolons. Non-numeric tokens
/// are ignored.
pub fn parse_admin_ids(raw: &str) -> BTreeSet<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return BTreeSet::new();
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) {
        let from_json = |v: &serde_json::Value| match v {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        match &value {
            serde_json::Value::Array(items) => return items.iter().filter_map(from_json).collect(),
            other => {
                if let Some(id) = from_json(other) {
                    return BTreeSet::from([id]);
                }
            }
        }
    }

    raw.split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .map(|token| token.trim_matches(|c| matches!(c, '[' | ']' | '(' | ')' | '{' | '}' | '"' | '\'')))
        .filter_map(|token| token.parse::<i64>().ok())
        .collect()
}
