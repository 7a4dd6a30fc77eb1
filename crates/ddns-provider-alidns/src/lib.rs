// # AliDNS DNS Provider
//
// This crate provides an AliDNS provider implementation for the DDNS reconciler.
//
// ## Protocol
//
// RPC style: every call is a POST to `<endpoint>/?<canonical query>` with an
// empty body. Each request is signed with ACS3-HMAC-SHA256 using the access
// key secret, a fresh UUID nonce and the current UTC timestamp.
//
// A JSON body carrying `Code`/`Message` is a rejection, whatever the HTTP
// status.
//
// ## Security Requirements
//
// - The access key secret NEVER appears in logs, Debug output or request headers
// - Empty key pairs are rejected when the client is built
//
// ## API Reference
//
// - DescribeDomains: `KeyWord`, `SearchMode`, `PageNumber`, `PageSize`
// - DescribeSubDomainRecords: `SubDomain`, `Type`, `PageNumber`, `PageSize`
// - UpdateDomainRecord: `RecordId`, `RR`, `Type`, `Value`, `Line`

mod sign;
mod types;

use async_trait::async_trait;
use chrono::Utc;
use ddns_core::config::ProviderConfig;
use ddns_core::traits::{Credentials, DnsProvider, DnsProviderFactory, Domain, Record};
use ddns_core::{ClientRegistry, Error, Result};
use serde::de::DeserializeOwned;
use sign::{EMPTY_BODY_SHA256, SigningInput};
use std::collections::BTreeMap;
use std::sync::Arc;
use types::{
    ApiError, DescribeDomainsResponse, DescribeSubDomainRecordsResponse,
    UpdateDomainRecordResponse, canonical_query,
};

/// Name the provider is registered under
pub const PROVIDER_NAME: &str = "alidns";

/// AliDNS API version
const API_VERSION: &str = "2015-01-09";

/// Largest page DescribeDomains accepts
const DOMAIN_PAGE_SIZE: u64 = 100;

/// AliDNS DNS provider
///
/// Holds one access key pair for its whole lifetime.
pub struct AlidnsProvider {
    /// Access key id (public half)
    access_key_id: String,

    /// Access key secret
    /// ⚠️ NEVER log this value
    access_key_secret: String,

    settings: Arc<Settings>,
}

/// Immutable per-factory settings shared by every client
#[derive(Debug)]
struct Settings {
    endpoint: String,
    host: String,
    record_line: String,
    client: reqwest::Client,
}

// Custom Debug implementation that hides the access key secret
impl std::fmt::Debug for AlidnsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlidnsProvider")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<REDACTED>")
            .field("endpoint", &self.settings.endpoint)
            .field("record_line", &self.settings.record_line)
            .finish()
    }
}

impl AlidnsProvider {
    /// Create a provider with default settings
    pub fn new(access_key_id: impl Into<String>, access_key_secret: impl Into<String>) -> Result<Self> {
        let factory = AlidnsFactory::from_config(&ProviderConfig::alidns())?;
        factory.build(access_key_id.into(), access_key_secret.into())
    }

    /// Sign and send one RPC action, decoding the JSON body
    async fn request<T: DeserializeOwned>(
        &self,
        action: &'static str,
        params: BTreeMap<&str, String>,
    ) -> Result<T> {
        let query = canonical_query(&params);
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let nonce = uuid::Uuid::new_v4().to_string();

        let authorization = sign::authorization(
            &self.access_key_id,
            &self.access_key_secret,
            &SigningInput {
                host: &self.settings.host,
                action,
                version: API_VERSION,
                canonical_query: &query,
                timestamp: &timestamp,
                nonce: &nonce,
            },
        )?;

        let url = format!("{}/?{}", self.settings.endpoint, query);
        tracing::debug!(provider = PROVIDER_NAME, action, "Calling AliDNS API");

        let response = self
            .settings
            .client
            .post(&url)
            .header("x-acs-action", action)
            .header("x-acs-version", API_VERSION)
            .header("x-acs-date", &timestamp)
            .header("x-acs-signature-nonce", &nonce)
            .header("x-acs-content-sha256", EMPTY_BODY_SHA256)
            .header("Authorization", authorization)
            .send()
            .await
            .map_err(|e| Error::transport(format!("{} request failed: {}", action, e.without_url())))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("{} body read failed: {}", action, e.without_url())))?;

        // Structured errors win over HTTP status
        if let Ok(api_error) = serde_json::from_str::<ApiError>(&body) {
            return Err(Error::rejected(
                PROVIDER_NAME,
                action,
                api_error.code,
                api_error.message,
            ));
        }

        if !status.is_success() {
            return Err(Error::transport(format!("{} returned HTTP {}", action, status)));
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::malformed(format!("{} response: {}", action, e)))
    }
}

/// Fully-qualified name DescribeSubDomainRecords expects
fn sub_domain_fqdn(sub_domain: &str, domain: &str) -> String {
    if sub_domain == "@" {
        domain.to_string()
    } else {
        format!("{}.{}", sub_domain, domain)
    }
}

#[async_trait]
impl DnsProvider for AlidnsProvider {
    async fn resolve_domain(&self, name: &str) -> Result<Domain> {
        let wanted = name.trim_end_matches('.');
        let mut page: u64 = 1;

        loop {
            let mut params = BTreeMap::new();
            params.insert("KeyWord", wanted.to_string());
            params.insert("SearchMode", "EXACT".to_string());
            params.insert("PageNumber", page.to_string());
            params.insert("PageSize", DOMAIN_PAGE_SIZE.to_string());

            let response: DescribeDomainsResponse = self.request("DescribeDomains", params).await?;
            let returned = response.domains.domain.len() as u64;

            if let Some(domain) = response
                .domains
                .domain
                .into_iter()
                .find(|d| d.domain_name.trim_end_matches('.').eq_ignore_ascii_case(wanted))
            {
                tracing::debug!(provider = PROVIDER_NAME, domain = name, domain_id = %domain.domain_id, "Domain resolved");
                return Ok(Domain::new(domain.domain_id, domain.domain_name));
            }

            if returned == 0 || page * DOMAIN_PAGE_SIZE >= response.total_count {
                return Err(Error::not_found(format!("domain {} not in AliDNS account", name)));
            }
            page += 1;
        }
    }

    async fn resolve_record(&self, domain: &Domain, sub_domain: &str) -> Result<Record> {
        let mut params = BTreeMap::new();
        params.insert("SubDomain", sub_domain_fqdn(sub_domain, &domain.name));
        params.insert("Type", "A".to_string());
        params.insert("PageNumber", "1".to_string());
        params.insert("PageSize", "1".to_string());

        let response: DescribeSubDomainRecordsResponse =
            self.request("DescribeSubDomainRecords", params).await?;

        let record = response
            .domain_records
            .record
            .into_iter()
            .find(|r| r.record_type == "A" && r.rr.eq_ignore_ascii_case(sub_domain))
            .ok_or_else(|| {
                Error::not_found(format!("A record {} not found in {}", sub_domain, domain.name))
            })?;

        tracing::debug!(
            provider = PROVIDER_NAME,
            domain = %domain.name,
            record = sub_domain,
            record_id = %record.record_id,
            value = %record.value,
            "Record resolved"
        );
        Ok(Record::new(record.record_id, record.rr, record.value))
    }

    async fn update_record(&self, domain: &Domain, record: &Record, value: &str) -> Result<()> {
        let mut params = BTreeMap::new();
        params.insert("RecordId", record.id.clone());
        params.insert("RR", record.sub_domain.clone());
        params.insert("Type", "A".to_string());
        params.insert("Value", value.to_string());
        params.insert("Line", self.settings.record_line.clone());

        let response: UpdateDomainRecordResponse =
            self.request("UpdateDomainRecord", params).await?;

        tracing::debug!(
            provider = PROVIDER_NAME,
            domain = %domain.name,
            record = %record.sub_domain,
            record_id = %response.record_id,
            value,
            "Record updated"
        );
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// Factory for creating AliDNS providers
///
/// Settings come from [`ProviderConfig::Alidns`]; the key pair comes from
/// each request's [`Credentials::KeyPair`].
#[derive(Debug, Clone)]
pub struct AlidnsFactory {
    settings: Arc<Settings>,
}

impl AlidnsFactory {
    /// Build a factory from validated provider settings
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;
        match config {
            ProviderConfig::Alidns {
                endpoint,
                record_line,
                user_agent,
                ..
            } => {
                let host = endpoint
                    .split_once("://")
                    .map(|(_, rest)| rest)
                    .unwrap_or(endpoint)
                    .split('/')
                    .next()
                    .unwrap_or_default()
                    .to_string();
                if host.is_empty() {
                    return Err(Error::config(format!("AliDNS endpoint has no host: {}", endpoint)));
                }

                let client = reqwest::Client::builder()
                    .timeout(config.timeout())
                    .user_agent(user_agent.as_str())
                    .build()
                    .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

                Ok(Self {
                    settings: Arc::new(Settings {
                        endpoint: endpoint.clone(),
                        host,
                        record_line: record_line.clone(),
                        client,
                    }),
                })
            }
            _ => Err(Error::config("Invalid config for AliDNS provider")),
        }
    }

    fn build(&self, access_key_id: String, access_key_secret: String) -> Result<AlidnsProvider> {
        if access_key_id.trim().is_empty() || access_key_secret.trim().is_empty() {
            return Err(Error::invalid_input("AliDNS access key id and secret are required"));
        }
        Ok(AlidnsProvider {
            access_key_id,
            access_key_secret,
            settings: Arc::clone(&self.settings),
        })
    }
}

impl DnsProviderFactory for AlidnsFactory {
    fn create(&self, credentials: &Credentials) -> Result<Arc<dyn DnsProvider>> {
        match credentials {
            Credentials::KeyPair { key_id, secret } => {
                Ok(Arc::new(self.build(key_id.clone(), secret.clone())?))
            }
            _ => Err(Error::invalid_input("AliDNS expects an access key pair")),
        }
    }
}

/// Register the AliDNS provider with a registry
pub fn register(registry: &ClientRegistry, config: &ProviderConfig) -> Result<()> {
    registry.register_provider(PROVIDER_NAME, Box::new(AlidnsFactory::from_config(config)?));
    Ok(())
}
