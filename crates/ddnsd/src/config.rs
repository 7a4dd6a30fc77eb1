//! Environment configuration for ddnsd

use anyhow::{Context, Result};
use ddns_core::config::{
    DEFAULT_ALIDNS_ENDPOINT, DEFAULT_ALIDNS_RECORD_LINE, DEFAULT_DNSPOD_API_BASE,
    DEFAULT_DNSPOD_RECORD_LINE, DEFAULT_MAX_CACHED_CLIENTS, DEFAULT_TIMEOUT_SECS,
};
use ddns_core::{ProviderConfig, RegistryConfig};
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::Level;

/// Provider types ddnsd knows how to serve
pub const SUPPORTED_PROVIDERS: &[&str] = &["dnspod", "alidns"];

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub log_level: String,
    pub http_timeout_secs: u64,
    pub max_cached_clients: usize,
    pub shutdown_timeout_secs: u64,
    pub workers: Option<usize>,
    pub user_agent: String,
    pub dnspod_api_base: String,
    pub dnspod_record_line: String,
    pub alidns_endpoint: String,
    pub alidns_record_line: String,
    pub providers: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        Ok(Self {
            listen_addr: get("DDNS_LISTEN_ADDR", "0.0.0.0:7000"),
            log_level: get("DDNS_LOG_LEVEL", "info"),
            http_timeout_secs: parse_var(&lookup, "DDNS_HTTP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            max_cached_clients: parse_var(
                &lookup,
                "DDNS_MAX_CACHED_CLIENTS",
                DEFAULT_MAX_CACHED_CLIENTS,
            )?,
            shutdown_timeout_secs: parse_var(&lookup, "DDNS_SHUTDOWN_TIMEOUT_SECS", 30)?,
            workers: lookup("DDNS_WORKERS")
                .map(|s| {
                    s.trim()
                        .parse()
                        .with_context(|| format!("DDNS_WORKERS is not a number: '{}'", s))
                })
                .transpose()?,
            user_agent: get(
                "DDNS_USER_AGENT",
                &format!("ddns-relay/{}", env!("CARGO_PKG_VERSION")),
            ),
            dnspod_api_base: get("DDNS_DNSPOD_API_BASE", DEFAULT_DNSPOD_API_BASE),
            dnspod_record_line: get("DDNS_DNSPOD_RECORD_LINE", DEFAULT_DNSPOD_RECORD_LINE),
            alidns_endpoint: get("DDNS_ALIDNS_ENDPOINT", DEFAULT_ALIDNS_ENDPOINT),
            alidns_record_line: get("DDNS_ALIDNS_RECORD_LINE", DEFAULT_ALIDNS_RECORD_LINE),
            providers: get("DDNS_PROVIDERS", "dnspod,alidns")
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;

        if !(1..=120).contains(&self.http_timeout_secs) {
            anyhow::bail!(
                "DDNS_HTTP_TIMEOUT_SECS must be between 1 and 120 seconds. Got: {}",
                self.http_timeout_secs
            );
        }

        if self.max_cached_clients == 0 {
            anyhow::bail!("DDNS_MAX_CACHED_CLIENTS must be at least 1");
        }

        if !(1..=300).contains(&self.shutdown_timeout_secs) {
            anyhow::bail!(
                "DDNS_SHUTDOWN_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                self.shutdown_timeout_secs
            );
        }

        if let Some(workers) = self.workers
            && !(1..=256).contains(&workers)
        {
            anyhow::bail!("DDNS_WORKERS must be between 1 and 256. Got: {}", workers);
        }

        if self.user_agent.trim().is_empty() {
            anyhow::bail!("DDNS_USER_AGENT cannot be empty");
        }

        if self.providers.is_empty() {
            anyhow::bail!(
                "DDNS_PROVIDERS must name at least one provider. \
                Supported providers: {}",
                SUPPORTED_PROVIDERS.join(", ")
            );
        }

        for provider in &self.providers {
            if !SUPPORTED_PROVIDERS.contains(&provider.as_str()) {
                anyhow::bail!(
                    "DDNS_PROVIDERS entry '{}' is not supported. \
                    Supported providers: {}",
                    provider,
                    SUPPORTED_PROVIDERS.join(", ")
                );
            }
        }

        for provider in self.provider_configs() {
            provider.validate()?;
        }

        self.level()?;

        Ok(())
    }

    /// Parsed listen address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_addr.parse().with_context(|| {
            format!(
                "DDNS_LISTEN_ADDR must be an address like 0.0.0.0:7000. Got: {}",
                self.listen_addr
            )
        })
    }

    /// Parsed log level
    pub fn level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "DDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }

    /// Settings for every enabled provider
    pub fn provider_configs(&self) -> Vec<ProviderConfig> {
        self.providers
            .iter()
            .filter_map(|name| match name.as_str() {
                "dnspod" => Some(ProviderConfig::Dnspod {
                    api_base: self.dnspod_api_base.clone(),
                    record_line: self.dnspod_record_line.clone(),
                    user_agent: self.user_agent.clone(),
                    timeout_secs: self.http_timeout_secs,
                }),
                "alidns" => Some(ProviderConfig::Alidns {
                    endpoint: self.alidns_endpoint.clone(),
                    record_line: self.alidns_record_line.clone(),
                    user_agent: self.user_agent.clone(),
                    timeout_secs: self.http_timeout_secs,
                }),
                _ => None,
            })
            .collect()
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            max_cached_clients: self.max_cached_clients,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} is not a valid number: '{}'", name, raw)),
        None => Ok(default),
    }
}
