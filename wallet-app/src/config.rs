//! Configuration loading from environment.

use std::env;
use std::str::FromStr;

use wallet_types::{MAX_AMOUNT, TOKEN_TTL_MINUTES};

const DEFAULT_FROM: &str = "\"Wallet\" <no-reply@wallet.local>";

/// Longest accepted payment token lifetime.
pub const MAX_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Largest accepted recharge or payment
    pub max_amount: i64,
    pub token_ttl_secs: i64,
    pub rate_limit_per_minute: u32,
    /// Rate limit by the proxy-appended `X-Forwarded-For` hop
    pub trust_forwarded_for: bool,
    /// Mail relay endpoint; without one notifications are only logged
    pub notify_relay_url: Option<String>,
    /// Permits running without a relay, which discloses payment tokens
    pub notify_log_only: bool,
    pub notify_relay_secret: String,
    pub notify_from: String,
    /// Enables the expired payment reaper
    pub reaper_interval_secs: Option<u64>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which returns a variable's value if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_amount: i64 = parse_or(var("MAX_AMOUNT"), "MAX_AMOUNT", MAX_AMOUNT)?;
        if max_amount <= 0 {
            anyhow::bail!("MAX_AMOUNT must be positive, got {}", max_amount);
        }

        let token_ttl_secs: i64 = parse_or(
            var("TOKEN_TTL_SECS"),
            "TOKEN_TTL_SECS",
            TOKEN_TTL_MINUTES * 60,
        )?;
        if !(1..=MAX_TOKEN_TTL_SECS).contains(&token_ttl_secs) {
            anyhow::bail!(
                "TOKEN_TTL_SECS must be between 1 and {}, got {}",
                MAX_TOKEN_TTL_SECS,
                token_ttl_secs
            );
        }

        let notify_relay_url = var("NOTIFY_RELAY_URL");
        let notify_log_only = parse_or(var("NOTIFY_LOG_ONLY"), "NOTIFY_LOG_ONLY", false)?;
        if notify_relay_url.is_none() && !notify_log_only {
            anyhow::bail!(
                "NOTIFY_RELAY_URL is required; set NOTIFY_LOG_ONLY=true to only log notifications and return payment tokens in responses"
            );
        }

        let reaper_interval_secs = match var("REAPER_INTERVAL_SECS") {
            Some(v) => Some(parse("REAPER_INTERVAL_SECS", &v)?),
            None => None,
        };

        Ok(Self {
            port: parse_or(var("PORT"), "PORT", 3000)?,
            database_url,
            max_amount,
            token_ttl_secs,
            rate_limit_per_minute: parse_or(
                var("RATE_LIMIT_PER_MINUTE"),
                "RATE_LIMIT_PER_MINUTE",
                100,
            )?,
            trust_forwarded_for: parse_or(
                var("TRUST_FORWARDED_FOR"),
                "TRUST_FORWARDED_FOR",
                false,
            )?,
            notify_relay_url,
            notify_log_only,
            notify_relay_secret: lookup("NOTIFY_RELAY_SECRET").unwrap_or_default(),
            notify_from: var("NOTIFY_FROM").unwrap_or_else(|| DEFAULT_FROM.to_string()),
            reaper_interval_secs,
        })
    }
}

fn parse<T>(key: &str, value: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid {}={:?}: {}", key, value, e))
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => parse(key, &v),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("NOTIFY_LOG_ONLY", "true"),
        ])
        .unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.max_amount, 10_000_000);
        assert_eq!(config.token_ttl_secs, 600);
        assert_eq!(config.rate_limit_per_minute, 100);
        assert!(!config.trust_forwarded_for);
        assert!(config.notify_relay_url.is_none());
        assert!(config.notify_log_only);
        assert_eq!(config.notify_relay_secret, "");
        assert_eq!(config.notify_from, DEFAULT_FROM);
        assert!(config.reaper_interval_secs.is_none());
    }

    #[test]
    fn test_database_url_required() {
        assert!(load(&[]).is_err());
        assert!(load(&[("DATABASE_URL", "  ")]).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/wallet"),
            ("PORT", "8080"),
            ("MAX_AMOUNT", "500000"),
            ("TOKEN_TTL_SECS", "120"),
            ("RATE_LIMIT_PER_MINUTE", "10"),
            ("TRUST_FORWARDED_FOR", "true"),
            ("NOTIFY_RELAY_URL", "http://localhost:4000/send"),
            ("NOTIFY_RELAY_SECRET", "s3cret"),
            ("REAPER_INTERVAL_SECS", "30"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.max_amount, 500_000);
        assert_eq!(config.token_ttl_secs, 120);
        assert_eq!(config.rate_limit_per_minute, 10);
        assert!(config.trust_forwarded_for);
        assert_eq!(
            config.notify_relay_url.as_deref(),
            Some("http://localhost:4000/send")
        );
        assert_eq!(config.notify_relay_secret, "s3cret");
        assert!(!config.notify_log_only);
        assert_eq!(config.reaper_interval_secs, Some(30));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let with = |extra: (&str, &str)| {
            load(&[
                ("DATABASE_URL", "sqlite::memory:"),
                ("NOTIFY_LOG_ONLY", "true"),
                extra,
            ])
        };

        assert!(with(("PORT", "http")).is_err());
        assert!(with(("MAX_AMOUNT", "0")).is_err());
        assert!(with(("TOKEN_TTL_SECS", "-5")).is_err());
        assert!(with(("REAPER_INTERVAL_SECS", "soon")).is_err());
        assert!(with(("TRUST_FORWARDED_FOR", "yes")).is_err());
    }

    #[test]
    fn test_token_ttl_upper_bound() {
        let base = ("DATABASE_URL", "sqlite::memory:");
        let log_only = ("NOTIFY_LOG_ONLY", "true");

        let config = load(&[base, log_only, ("TOKEN_TTL_SECS", "86400")]).unwrap();
        assert_eq!(config.token_ttl_secs, MAX_TOKEN_TTL_SECS);

        assert!(load(&[base, log_only, ("TOKEN_TTL_SECS", "86401")]).is_err());
        assert!(load(&[base, log_only, ("TOKEN_TTL_SECS", "10000000000000")]).is_err());
    }

    #[test]
    fn test_relay_required_unless_log_only() {
        let base = ("DATABASE_URL", "sqlite::memory:");

        assert!(load(&[base]).is_err());
        assert!(load(&[base, ("NOTIFY_LOG_ONLY", "false")]).is_err());
        assert!(load(&[base, ("NOTIFY_RELAY_URL", "http://localhost:4000/send")]).is_ok());
        assert!(load(&[base, ("NOTIFY_LOG_ONLY", "true")]).is_ok());
    }
}
