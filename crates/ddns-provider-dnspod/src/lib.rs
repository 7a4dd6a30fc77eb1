// # DNSPod DNS Provider
//
// This crate provides a DNSPod provider implementation for the DDNS reconciler.
//
// ## Protocol
//
// Every call is a form-encoded POST to `<api_base>/<Endpoint>`. The body
// always carries the login token plus `format=json`, `lang=en` and
// `error_on_empty=no`, merged with the operation parameters. Keys are sent
// in sorted order.
//
// Success is decided by `status.code == "1"` in the JSON body. HTTP 200
// with any other code is a provider rejection.
//
// ## Security Requirements
//
// - The login token NEVER appears in logs or Debug output
// - Empty tokens are rejected when the client is built
//
// ## API Reference
//
// - Domain.List: POST `/Domain.List` (`type`, `offset`, `length`)
// - Record.List: POST `/Record.List` (`domain_id`, `sub_domain`, `offset`, `length`)
// - Record.Modify: POST `/Record.Modify` (`domain_id`, `record_id`, `sub_domain`, `record_type`, `record_line`, `value`)

mod types;

use async_trait::async_trait;
use ddns_core::config::ProviderConfig;
use ddns_core::traits::{Credentials, DnsProvider, DnsProviderFactory, Domain, Record};
use ddns_core::{ClientRegistry, Error, Result};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;
use types::{DomainListResponse, RecordListResponse, Status, StatusResponse};

/// Name the provider is registered under
pub const PROVIDER_NAME: &str = "dnspod";

/// Page size used when listing domains
const DOMAIN_LIST_LENGTH: &str = "20";

/// DNSPod DNS provider
///
/// Holds one login token for its whole lifetime. A new client is built for
/// every distinct token; see [`ClientRegistry`].
pub struct DnspodProvider {
    /// Login token (`<id>,<token>`)
    /// ⚠️ NEVER log this value
    login_token: String,

    /// API base URL without trailing slash
    api_base: String,

    /// Routing line sent with Record.Modify
    record_line: String,

    /// Shared HTTP client (timeout and User-Agent already applied)
    client: reqwest::Client,
}

// Custom Debug implementation that hides the login token
impl std::fmt::Debug for DnspodProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnspodProvider")
            .field("login_token", &"<REDACTED>")
            .field("api_base", &self.api_base)
            .field("record_line", &self.record_line)
            .finish()
    }
}

impl DnspodProvider {
    /// Create a provider with default settings
    pub fn new(login_token: impl Into<String>) -> Result<Self> {
        let factory = DnspodFactory::from_config(&ProviderConfig::dnspod())?;
        factory.build(login_token.into())
    }

    /// POST one operation and decode the JSON body
    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        params: &[(&'static str, &str)],
    ) -> Result<T> {
        let mut form: BTreeMap<&str, &str> = BTreeMap::new();
        form.insert("login_token", &self.login_token);
        form.insert("format", "json");
        form.insert("lang", "en");
        form.insert("error_on_empty", "no");
        form.extend(params.iter().copied());

        let url = format!("{}/{}", self.api_base, endpoint);
        tracing::debug!(provider = PROVIDER_NAME, endpoint, "Calling DNSPod API");

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::transport(format!("{} request failed: {}", endpoint, e.without_url())))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("{} body read failed: {}", endpoint, e.without_url())))?;

        if !status.is_success() {
            return Err(Error::transport(format!(
                "{} returned HTTP {}",
                endpoint, status
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::malformed(format!("{} response: {}", endpoint, e)))
    }

    fn check(endpoint: &'static str, status: &Status) -> Result<()> {
        if status.is_success() {
            return Ok(());
        }
        Err(Error::rejected(
            PROVIDER_NAME,
            endpoint,
            status.code.clone(),
            status.message.clone(),
        ))
    }
}

/// Compare zone names ignoring case and a trailing root dot
fn same_name(a: &str, b: &str) -> bool {
    a.trim_end_matches('.')
        .eq_ignore_ascii_case(b.trim_end_matches('.'))
}

#[async_trait]
impl DnsProvider for DnspodProvider {
    async fn resolve_domain(&self, name: &str) -> Result<Domain> {
        let response: DomainListResponse = self
            .call(
                "Domain.List",
                &[("type", "all"), ("offset", "0"), ("length", DOMAIN_LIST_LENGTH)],
            )
            .await?;
        Self::check("Domain.List", &response.status)?;

        let domain = response
            .domains
            .into_iter()
            .find(|d| same_name(&d.name, name))
            .ok_or_else(|| Error::not_found(format!("domain {} not in DNSPod account", name)))?;

        tracing::debug!(provider = PROVIDER_NAME, domain = name, domain_id = %domain.id, "Domain resolved");
        Ok(Domain::new(domain.id.to_string(), domain.name))
    }

    async fn resolve_record(&self, domain: &Domain, sub_domain: &str) -> Result<Record> {
        let response: RecordListResponse = self
            .call(
                "Record.List",
                &[
                    ("domain_id", domain.id.as_str()),
                    ("sub_domain", sub_domain),
                    ("offset", "0"),
                    ("length", "1"),
                ],
            )
            .await?;
        Self::check("Record.List", &response.status)?;

        let record = response
            .records
            .into_iter()
            .find(|r| r.name.eq_ignore_ascii_case(sub_domain))
            .ok_or_else(|| {
                Error::not_found(format!("A record {} not found in {}", sub_domain, domain.name))
            })?;

        tracing::debug!(
            provider = PROVIDER_NAME,
            domain = %domain.name,
            record = sub_domain,
            record_id = %record.id,
            value = %record.value,
            "Record resolved"
        );
        Ok(Record::new(record.id.to_string(), record.name, record.value))
    }

    async fn update_record(&self, domain: &Domain, record: &Record, value: &str) -> Result<()> {
        let response: StatusResponse = self
            .call(
                "Record.Modify",
                &[
                    ("domain_id", domain.id.as_str()),
                    ("record_id", record.id.as_str()),
                    ("sub_domain", record.sub_domain.as_str()),
                    ("record_type", "A"),
                    ("record_line", self.record_line.as_str()),
                    ("value", value),
                ],
            )
            .await?;
        Self::check("Record.Modify", &response.status)?;

        tracing::debug!(provider = PROVIDER_NAME, domain = %domain.name, record = %record.sub_domain, value, "Record modified");
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// Factory for creating DNSPod providers
///
/// Settings come from [`ProviderConfig::Dnspod`]; the token comes from each
/// request's [`Credentials::Token`].
#[derive(Debug, Clone)]
pub struct DnspodFactory {
    api_base: String,
    record_line: String,
    client: reqwest::Client,
}

impl DnspodFactory {
    /// Build a factory from validated provider settings
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;
        match config {
            ProviderConfig::Dnspod {
                api_base,
                record_line,
                user_agent,
                ..
            } => {
                let client = reqwest::Client::builder()
                    .timeout(config.timeout())
                    .user_agent(user_agent.as_str())
                    .build()
                    .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

                Ok(Self {
                    api_base: api_base.clone(),
                    record_line: record_line.clone(),
                    client,
                })
            }
            _ => Err(Error::config("Invalid config for DNSPod provider")),
        }
    }

    fn build(&self, login_token: String) -> Result<DnspodProvider> {
        if login_token.trim().is_empty() {
            return Err(Error::invalid_input("DNSPod login token cannot be empty"));
        }
        Ok(DnspodProvider {
            login_token,
            api_base: self.api_base.clone(),
            record_line: self.record_line.clone(),
            client: self.client.clone(),
        })
    }
}

impl DnsProviderFactory for DnspodFactory {
    fn create(&self, credentials: &Credentials) -> Result<Arc<dyn DnsProvider>> {
        match credentials {
            Credentials::Token(token) => Ok(Arc::new(self.build(token.clone())?)),
            _ => Err(Error::invalid_input("DNSPod expects a login token")),
        }
    }
}

/// Register the DNSPod provider with a registry
///
/// # Example
///
/// ```rust,ignore
/// use ddns_core::{ClientRegistry, ProviderConfig};
///
/// let registry = ClientRegistry::new();
/// ddns_provider_dnspod::register(&registry, &ProviderConfig::dnspod())?;
/// ```
pub fn register(registry: &ClientRegistry, config: &ProviderConfig) -> Result<()> {
    registry.register_provider(PROVIDER_NAME, Box::new(DnspodFactory::from_config(config)?));
    Ok(())
}
