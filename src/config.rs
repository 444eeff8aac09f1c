use anyhow::{Context, Result};
use std::{str::FromStr, time::Duration};

use crate::encoder::BASE62;

/// How new long URLs get their key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Shared counter + base-N encoding.
    Sequence,
    /// Random codes, checked unused against the store.
    Random,
}

impl FromStr for StrategyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequence" | "seq" => Ok(StrategyKind::Sequence),
            "random" => Ok(StrategyKind::Random),
            other => {
                anyhow::bail!("unknown allocation strategy {other:?} (expected sequence or random)")
            }
        }
    }
}

/// Settings the shortening core depends on.
#[derive(Debug, Clone)]
pub struct ShortenerConfig {
    /// Prepended verbatim to every code, e.g. "http://short.ly/"
    pub short_url_prefix: String,

    /// Sliding TTL applied to cache entries. Zero disables caching.
    pub cache_ttl: Duration,

    pub alphabet: String,

    pub strategy: StrategyKind,

    /// Length of codes drawn by the random strategy
    pub random_code_length: usize,

    /// Attempts the random strategy makes before giving up
    pub max_collision_retries: u32,
}

impl Default for ShortenerConfig {
    fn default() -> Self {
        Self {
            short_url_prefix: "http://localhost:3000/".into(),
            cache_ttl: Duration::from_secs(60),
            alphabet: BASE62.into(),
            strategy: StrategyKind::Sequence,
            random_code_length: 7,
            max_collision_retries: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite connection string, e.g. "sqlite:./tinylink.db"
    pub database_url: String,

    /// Host to bind the HTTP server to, e.g. "0.0.0.0"
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Public base URL, e.g. "https://go.example.com". Never has a trailing slash.
    pub base_url: String,

    /// How often expired cache entries are swept
    pub cache_sweep_interval: Duration,

    /// Name of the counter row used by the sequence strategy
    pub sequence_name: String,

    pub shortener: ShortenerConfig,
}

impl AppConfig {
    /// Load configuration from environment variables (populated by dotenvy before this is called).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] but reads variables through `var`.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = var("PORT")
            .unwrap_or_else(|| "3000".into())
            .parse::<u16>()
            .context("PORT must be a valid port number (1–65535)")?;

        let base_url = var("BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_owned();

        let short_url_prefix = var("SHORT_URL_PREFIX").unwrap_or_else(|| format!("{base_url}/"));

        let cache_ttl = parse_or("CACHE_TTL_SECS", &var, 60u64)
            .context("CACHE_TTL_SECS must be a whole number of seconds")?;

        let cache_sweep = parse_or("CACHE_SWEEP_SECS", &var, 30u64)
            .context("CACHE_SWEEP_SECS must be a whole number of seconds")?;
        if cache_sweep == 0 {
            anyhow::bail!("CACHE_SWEEP_SECS must be greater than zero");
        }

        let alphabet = var("CODE_ALPHABET").unwrap_or_else(|| BASE62.into());

        let strategy = match var("ALLOCATION_STRATEGY") {
            Some(raw) => raw
                .parse::<StrategyKind>()
                .context("invalid ALLOCATION_STRATEGY")?,
            None => StrategyKind::Sequence,
        };

        let random_code_length = parse_or("RANDOM_CODE_LENGTH", &var, 7usize)
            .context("RANDOM_CODE_LENGTH must be a positive integer")?;
        if random_code_length == 0 {
            anyhow::bail!("RANDOM_CODE_LENGTH must be greater than zero");
        }

        let max_collision_retries = parse_or("MAX_COLLISION_RETRIES", &var, 10u32)
            .context("MAX_COLLISION_RETRIES must be a positive integer")?;
        if max_collision_retries == 0 {
            anyhow::bail!("MAX_COLLISION_RETRIES must be greater than zero");
        }

        Ok(Self {
            database_url: var("DATABASE_URL").unwrap_or_else(|| "sqlite:./tinylink.db".into()),
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            base_url,
            cache_sweep_interval: Duration::from_secs(cache_sweep),
            sequence_name: var("SEQUENCE_NAME").unwrap_or_else(|| "short_links".into()),
            shortener: ShortenerConfig {
                short_url_prefix,
                cache_ttl: Duration::from_secs(cache_ttl),
                alphabet,
                strategy,
                random_code_length,
                max_collision_retries,
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(key: &str, var: &impl Fn(&str) -> Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => Ok(raw.trim().parse::<T>()?),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
        assert_eq!(config.shortener.short_url_prefix, "http://localhost:3000/");
        assert_eq!(config.shortener.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.shortener.alphabet, BASE62);
        assert_eq!(config.shortener.strategy, StrategyKind::Sequence);
        assert_eq!(config.shortener.max_collision_retries, 10);
        assert_eq!(config.sequence_name, "short_links");
    }

    #[test]
    fn prefix_follows_base_url_unless_set() {
        let config = load(&[("BASE_URL", "https://go.example.com/")]).unwrap();
        assert_eq!(config.base_url, "https://go.example.com");
        assert_eq!(config.shortener.short_url_prefix, "https://go.example.com/");

        let config = load(&[("SHORT_URL_PREFIX", "http://short.ly/")]).unwrap();
        assert_eq!(config.shortener.short_url_prefix, "http://short.ly/");
    }

    #[test]
    fn strategy_and_limits() {
        let config = load(&[
            ("ALLOCATION_STRATEGY", "Random"),
            ("RANDOM_CODE_LENGTH", "9"),
            ("MAX_COLLISION_RETRIES", "3"),
            ("CACHE_TTL_SECS", "0"),
        ])
        .unwrap();
        assert_eq!(config.shortener.strategy, StrategyKind::Random);
        assert_eq!(config.shortener.random_code_length, 9);
        assert_eq!(config.shortener.max_collision_retries, 3);
        assert!(config.shortener.cache_ttl.is_zero());
    }

    #[test]
    fn bad_values_fail_with_context() {
        let err = load(&[("PORT", "99999")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        let err = load(&[("ALLOCATION_STRATEGY", "snowflake")]).unwrap_err();
        assert!(err.to_string().contains("ALLOCATION_STRATEGY"));

        assert!(load(&[("MAX_COLLISION_RETRIES", "0")]).is_err());
        assert!(load(&[("RANDOM_CODE_LENGTH", "-1")]).is_err());
        assert!(load(&[("CACHE_SWEEP_SECS", "0")]).is_err());
    }
}
