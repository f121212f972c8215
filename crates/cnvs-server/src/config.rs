//! Process configuration from environment variables

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use cnvs_core::client::CNVS_BASE_URL;
use cnvs_core::{ClientConfig, LoginVerification, SessionConfig};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Access token for the site login (`TOKEN`, required)
    pub token: String,
    /// Bind address (`HOST`, default: 0.0.0.0)
    pub host: String,
    /// Bind port (`PORT`, default: 5000)
    pub port: u16,
    /// Site origin (`BASE_URL`)
    pub base_url: String,
    /// Per-request timeout (`REQUEST_TIMEOUT_SECS`, default: 30)
    pub request_timeout: Duration,
    /// Keep-alive tick interval (`KEEP_ALIVE_SECS`, default: 180)
    pub keep_alive_interval: Duration,
    /// Login verification (`LOGIN_VERIFICATION`, default: lenient)
    pub login_verification: LoginVerification,
    /// Default tracing filter when `RUST_LOG` is unset (`LOG_LEVEL`)
    pub log_level: String,
}

impl ServerConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let parse = |key: &str| var(key).map(|raw| (key.to_string(), raw));

        let token = var("TOKEN").context("TOKEN must be set to the site access token")?;
        let timeout_secs: u64 = parse_or(parse("REQUEST_TIMEOUT_SECS"), 30)?;
        let keep_alive_secs: u64 = parse_or(parse("KEEP_ALIVE_SECS"), 180)?;

        Ok(Self {
            token,
            host: var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(parse("PORT"), DEFAULT_PORT)?,
            base_url: var("BASE_URL").unwrap_or_else(|| CNVS_BASE_URL.to_string()),
            request_timeout: Duration::from_secs(timeout_secs),
            keep_alive_interval: Duration::from_secs(keep_alive_secs),
            login_verification: parse_or(parse("LOGIN_VERIFICATION"), LoginVerification::default())?,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }

    /// `host:port` to bind the listener to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            timeout_secs: self.request_timeout.as_secs(),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            request_timeout: self.request_timeout,
            login_verification: self.login_verification,
            ..SessionConfig::new(self.token.clone())
        }
    }
}

/// Parse a `(key, raw)` pair, or fall back to `default` when unset.
fn parse_or<T>(var: Option<(String, String)>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match var {
        Some((key, raw)) => raw.parse().map_err(|e| anyhow!("invalid {key}={raw}: {e}")),
        None => Ok(default),
    }
}
