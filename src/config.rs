use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{bail, Context, Result};

pub const MIN_PASSWORD_COST: u32 = 4;
pub const MAX_PASSWORD_COST: u32 = 31;
/// Ten years. Keeps `now + ttl` well inside an `i64` timestamp.
pub const MAX_SESSION_TTL_SECS: u64 = 60 * 60 * 24 * 365 * 10;

// Runtime settings, read from the environment (and `.env`) at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub addr: SocketAddr,
    pub cors_origin: String,
    pub session_ttl: Duration,
    pub session_purge_interval: Duration,
    pub password_cost: u32,
    pub cookie_secure: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://todo.db".to_string(),
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            cors_origin: "http://localhost:3000".to_string(),
            session_ttl: Duration::from_secs(60 * 60 * 24 * 7),
            session_purge_interval: Duration::from_secs(300),
            password_cost: bcrypt::DEFAULT_COST,
            cookie_secure: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup; unset keys keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("HOST").unwrap_or_else(|| defaults.addr.ip().to_string());
        let port: u16 = parse_or(&lookup, "PORT", defaults.addr.port())?;
        let addr = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid HOST/PORT: {host}:{port}"))?;

        let password_cost = parse_or(&lookup, "BCRYPT_COST", defaults.password_cost)?;
        if !(MIN_PASSWORD_COST..=MAX_PASSWORD_COST).contains(&password_cost) {
            bail!(
                "BCRYPT_COST must be between {} and {}, got {}",
                MIN_PASSWORD_COST,
                MAX_PASSWORD_COST,
                password_cost
            );
        }

        let session_ttl = parse_or(&lookup, "SESSION_TTL_SECS", defaults.session_ttl.as_secs())?;
        if session_ttl == 0 || session_ttl > MAX_SESSION_TTL_SECS {
            bail!(
                "SESSION_TTL_SECS must be between 1 and {}, got {}",
                MAX_SESSION_TTL_SECS,
                session_ttl
            );
        }
        let purge_every = parse_or(
            &lookup,
            "SESSION_PURGE_SECS",
            defaults.session_purge_interval.as_secs(),
        )?;
        if purge_every == 0 {
            bail!("SESSION_PURGE_SECS must be positive");
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            addr,
            cors_origin: lookup("CORS_ORIGIN").unwrap_or(defaults.cors_origin),
            session_ttl: Duration::from_secs(session_ttl),
            session_purge_interval: Duration::from_secs(purge_every),
            password_cost,
            cookie_secure: parse_or(&lookup, "COOKIE_SECURE", defaults.cookie_secure)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.database_url, "sqlite://todo.db");
        assert_eq!(config.addr, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.password_cost, bcrypt::DEFAULT_COST);
        assert!(!config.cookie_secure);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "memory"),
            ("HOST", "0.0.0.0"),
            ("PORT", "8080"),
            ("BCRYPT_COST", "4"),
            ("SESSION_TTL_SECS", "60"),
            ("COOKIE_SECURE", "true"),
        ]))
        .unwrap();
        assert_eq!(config.database_url, "memory");
        assert_eq!(config.addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.password_cost, 4);
        assert_eq!(config.session_ttl, Duration::from_secs(60));
        assert!(config.cookie_secure);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Config::from_lookup(lookup(&[("PORT", "http")])).is_err());
        assert!(Config::from_lookup(lookup(&[("BCRYPT_COST", "2")])).is_err());
        assert!(Config::from_lookup(lookup(&[("SESSION_TTL_SECS", "0")])).is_err());
        assert!(
            Config::from_lookup(lookup(&[("SESSION_TTL_SECS", "18446744073709551615")])).is_err()
        );
        let just_over = (MAX_SESSION_TTL_SECS + 1).to_string();
        assert!(Config::from_lookup(lookup(&[("SESSION_TTL_SECS", &just_over)])).is_err());
        let at_limit = MAX_SESSION_TTL_SECS.to_string();
        assert!(Config::from_lookup(lookup(&[("SESSION_TTL_SECS", &at_limit)])).is_ok());
    }
}
