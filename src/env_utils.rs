use std::env;

use anyhow::Context;
use chrono::{FixedOffset, Offset, Utc};
use tracing::error;
use url::Url;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
const DEFAULT_GEO_API_URL: &str = "http://ip-api.com";
const DEFAULT_UTC_OFFSET_HOURS: i32 = 3;

/// Process-wide settings, read once at startup and shared read-only with every request.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    pub telegram_api_url: Url,
    pub geo_api_url: Url,
    pub utc_offset: FixedOffset,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let telegram_bot_token = get_required("TELEGRAM_BOT_TOKEN")?;
        let telegram_chat_id = get_required("TELEGRAM_CHAT_ID")?;

        let telegram_api_url = get_url("TELEGRAM_API_URL", DEFAULT_TELEGRAM_API_URL)?;
        let geo_api_url = get_url("GEO_API_URL", DEFAULT_GEO_API_URL)?;

        Ok(AppConfig {
            telegram_bot_token,
            telegram_chat_id,
            telegram_api_url,
            geo_api_url,
            utc_offset: get_utc_offset(),
        })
    }
}

fn get_required(key: &str) -> anyhow::Result<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(anyhow::anyhow!("{key} environment variable must be set")),
    }
}

fn get_url(key: &str, default: &str) -> anyhow::Result<Url> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).with_context(|| format!("Failed to parse {key} as a URL: {raw}"))
}

pub fn get_port() -> u16 {
    let port = match env::var("PORT") {
        Ok(port) => port,
        _ => DEFAULT_PORT.to_string(),
    };
    let port: u16 = match port.parse::<_>() {
        Ok(port) => port,
        _ => {
            error!("Failed to parse PORT env var, using default");
            DEFAULT_PORT
        }
    };

    port
}

fn get_utc_offset() -> FixedOffset {
    let hours = match env::var("NOTIFY_UTC_OFFSET_HOURS") {
        Ok(hours) => match hours.parse::<i32>() {
            Ok(hours) => hours,
            _ => {
                error!("Failed to parse NOTIFY_UTC_OFFSET_HOURS env var, using default");
                DEFAULT_UTC_OFFSET_HOURS
            }
        },
        _ => DEFAULT_UTC_OFFSET_HOURS,
    };

    match hours.checked_mul(3600).and_then(FixedOffset::east_opt) {
        Some(offset) => offset,
        None => {
            error!("NOTIFY_UTC_OFFSET_HOURS out of range, using default");
            default_utc_offset()
        }
    }
}

pub fn default_utc_offset() -> FixedOffset {
    FixedOffset::east_opt(DEFAULT_UTC_OFFSET_HOURS * 3600).unwrap_or_else(|| Utc.fix())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // env vars are process-global, serialize the tests touching them
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const KEYS: [&str; 5] = [
        "TELEGRAM_BOT_TOKEN",
        "TELEGRAM_CHAT_ID",
        "TELEGRAM_API_URL",
        "GEO_API_URL",
        "NOTIFY_UTC_OFFSET_HOURS",
    ];

    fn clear_env() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    fn missing_bot_token_fails() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        env::set_var("TELEGRAM_CHAT_ID", "42");

        let err = AppConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_BOT_TOKEN"));
    }

    #[test]
    fn empty_chat_id_counts_as_missing() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        env::set_var("TELEGRAM_BOT_TOKEN", "123:abc");
        env::set_var("TELEGRAM_CHAT_ID", "  ");

        let err = AppConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_CHAT_ID"));
    }

    #[test]
    fn defaults_are_applied() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        env::set_var("TELEGRAM_BOT_TOKEN", "123:abc");
        env::set_var("TELEGRAM_CHAT_ID", "42");

        let config = AppConfig::from_env().expect("config should load");
        assert_eq!(config.telegram_bot_token, "123:abc");
        assert_eq!(config.telegram_chat_id, "42");
        assert_eq!(config.telegram_api_url.as_str(), "https://api.telegram.org/");
        assert_eq!(config.geo_api_url.as_str(), "http://ip-api.com/");
        assert_eq!(config.utc_offset.local_minus_utc(), 3 * 3600);
    }

    #[test]
    fn bad_offset_falls_back_to_default() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        env::set_var("TELEGRAM_BOT_TOKEN", "123:abc");
        env::set_var("TELEGRAM_CHAT_ID", "42");
        env::set_var("NOTIFY_UTC_OFFSET_HOURS", "99");

        let config = AppConfig::from_env().expect("config should load");
        assert_eq!(config.utc_offset, default_utc_offset());

        env::set_var("NOTIFY_UTC_OFFSET_HOURS", "1000000");
        let config = AppConfig::from_env().expect("config should load");
        assert_eq!(config.utc_offset, default_utc_offset());

        env::set_var("NOTIFY_UTC_OFFSET_HOURS", "-1000000");
        let config = AppConfig::from_env().expect("config should load");
        assert_eq!(config.utc_offset, default_utc_offset());

        env::set_var("NOTIFY_UTC_OFFSET_HOURS", "-5");
        let config = AppConfig::from_env().expect("config should load");
        assert_eq!(config.utc_offset.local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn invalid_api_url_fails() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        env::set_var("TELEGRAM_BOT_TOKEN", "123:abc");
        env::set_var("TELEGRAM_CHAT_ID", "42");
        env::set_var("GEO_API_URL", "not a url");

        assert!(AppConfig::from_env().is_err());
    }
}
