//! Configuration types for the DDNS reconciler
//!
//! Provider settings are immutable values handed to each provider factory
//! at startup; nothing here is mutated at request time.

use serde::{Deserialize, Serialize};

/// Default per-call timeout for provider requests
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default DNSPod API base URL
pub const DEFAULT_DNSPOD_API_BASE: &str = "https://dnsapi.cn";

/// Default DNSPod routing line ("默认" is the provider's name for the default line)
pub const DEFAULT_DNSPOD_RECORD_LINE: &str = "默认";

/// Default AliDNS RPC endpoint
pub const DEFAULT_ALIDNS_ENDPOINT: &str = "https://alidns.cn-hangzhou.aliyuncs.com";

/// Default AliDNS routing line
pub const DEFAULT_ALIDNS_RECORD_LINE: &str = "default";

/// Default upper bound on cached provider clients
pub const DEFAULT_MAX_CACHED_CLIENTS: usize = 256;

/// DNS provider configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// DNSPod-style provider (login token, form POST)
    Dnspod {
        /// API base URL, without trailing slash
        #[serde(default = "default_dnspod_api_base")]
        api_base: String,
        /// Routing line used for record updates
        #[serde(default = "default_dnspod_record_line")]
        record_line: String,
        /// User-Agent header sent with every request
        #[serde(default = "default_user_agent")]
        user_agent: String,
        /// Per-call timeout in seconds
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },

    /// AliDNS-style provider (signed RPC requests)
    Alidns {
        /// RPC endpoint URL, without trailing slash
        #[serde(default = "default_alidns_endpoint")]
        endpoint: String,
        /// Routing line used for record updates
        #[serde(default = "default_alidns_record_line")]
        record_line: String,
        /// User-Agent header sent with every request
        #[serde(default = "default_user_agent")]
        user_agent: String,
        /// Per-call timeout in seconds
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl ProviderConfig {
    /// DNSPod settings with all defaults
    pub fn dnspod() -> Self {
        ProviderConfig::Dnspod {
            api_base: default_dnspod_api_base(),
            record_line: default_dnspod_record_line(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// AliDNS settings with all defaults
    pub fn alidns() -> Self {
        ProviderConfig::Alidns {
            endpoint: default_alidns_endpoint(),
            record_line: default_alidns_record_line(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        let (url, line, timeout_secs) = match self {
            ProviderConfig::Dnspod {
                api_base,
                record_line,
                timeout_secs,
                ..
            } => (api_base, record_line, *timeout_secs),
            ProviderConfig::Alidns {
                endpoint,
                record_line,
                timeout_secs,
                ..
            } => (endpoint, record_line, *timeout_secs),
        };

        if !url.starts_with("https://") && !url.starts_with("http://") {
            return Err(crate::Error::config(format!(
                "{} base URL must use HTTP or HTTPS scheme. Got: {}",
                self.type_name(),
                url
            )));
        }
        if url.ends_with('/') {
            return Err(crate::Error::config(format!(
                "{} base URL must not end with '/'. Got: {}",
                self.type_name(),
                url
            )));
        }
        if line.is_empty() {
            return Err(crate::Error::config(format!(
                "{} record line cannot be empty",
                self.type_name()
            )));
        }
        if !(1..=120).contains(&timeout_secs) {
            return Err(crate::Error::config(format!(
                "{} timeout must be between 1 and 120 seconds. Got: {}",
                self.type_name(),
                timeout_secs
            )));
        }

        Ok(())
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &'static str {
        match self {
            ProviderConfig::Dnspod { .. } => "dnspod",
            ProviderConfig::Alidns { .. } => "alidns",
        }
    }

    /// Per-call timeout
    pub fn timeout(&self) -> std::time::Duration {
        let secs = match self {
            ProviderConfig::Dnspod { timeout_secs, .. }
            | ProviderConfig::Alidns { timeout_secs, .. } => *timeout_secs,
        };
        std::time::Duration::from_secs(secs)
    }
}

/// Client registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Maximum number of provider clients kept alive
    ///
    /// Past this bound, clients are built per request and dropped afterwards,
    /// so arbitrary caller-supplied credentials cannot grow memory unbounded.
    #[serde(default = "default_max_cached_clients")]
    pub max_cached_clients: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_cached_clients: default_max_cached_clients(),
        }
    }
}

fn default_dnspod_api_base() -> String {
    DEFAULT_DNSPOD_API_BASE.to_string()
}

fn default_dnspod_record_line() -> String {
    DEFAULT_DNSPOD_RECORD_LINE.to_string()
}

fn default_alidns_endpoint() -> String {
    DEFAULT_ALIDNS_ENDPOINT.to_string()
}

fn default_alidns_record_line() -> String {
    DEFAULT_ALIDNS_RECORD_LINE.to_string()
}

fn default_user_agent() -> String {
    format!("ddns-relay/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_cached_clients() -> usize {
    DEFAULT_MAX_CACHED_CLIENTS
}
