// # DNS Provider Trait
//
// Defines the three-operation capability set every provider client offers:
// resolve a domain, resolve a record inside it, update that record.
//
// ## Implementations
//
// - DNSPod: `ddns-provider-dnspod` crate
// - AliDNS: `ddns-provider-alidns` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::DnsProvider;
//
// async fn show(provider: &dyn DnsProvider) -> ddns_core::Result<()> {
//     let domain = provider.resolve_domain("example.com").await?;
//     let record = provider.resolve_record(&domain, "home").await?;
//     println!("{} -> {}", record.sub_domain, record.value);
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// A DNS zone as seen by one provider
///
/// `id` is provider-opaque (DNSPod hands out integers, AliDNS strings). The
/// name is kept next to it because some providers address records by zone
/// name rather than by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    /// Provider-specific identifier
    pub id: String,
    /// Zone name as published by the provider
    pub name: String,
}

impl Domain {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A single host-address (`A`) record within a [`Domain`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Provider-specific record identifier
    pub id: String,
    /// Subdomain label, e.g. "home" or "@" for the apex
    pub sub_domain: String,
    /// Currently published value (an IP address string)
    pub value: String,
}

impl Record {
    pub fn new(
        id: impl Into<String>,
        sub_domain: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            sub_domain: sub_domain.into(),
            value: value.into(),
        }
    }
}

/// Authentication material for one provider client
///
/// # Security
///
/// The Debug implementation never prints secrets.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Credentials {
    /// Static login token (DNSPod-style)
    Token(String),
    /// Access key pair used to sign each request (AliDNS-style)
    KeyPair {
        /// Public access key id
        key_id: String,
        /// Signing secret
        secret: String,
    },
}

impl Credentials {
    pub fn token(token: impl Into<String>) -> Self {
        Self::Token(token.into())
    }

    pub fn key_pair(key_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::KeyPair {
            key_id: key_id.into(),
            secret: secret.into(),
        }
    }

    /// True when any required part of the credential is empty
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Token(token) => token.is_empty(),
            Self::KeyPair { key_id, secret } => key_id.is_empty() || secret.is_empty(),
        }
    }

    /// Bytes that uniquely identify this credential, used for cache keys
    pub(crate) fn fingerprint_material(&self) -> Vec<u8> {
        match self {
            Self::Token(token) => [b"token\0".as_slice(), token.as_bytes()].concat(),
            Self::KeyPair { key_id, secret } => [
                b"keypair\0".as_slice(),
                key_id.as_bytes(),
                b"\0",
                secret.as_bytes(),
            ]
            .concat(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(_) => f.debug_tuple("Token").field(&"<REDACTED>").finish(),
            Self::KeyPair { key_id, .. } => f
                .debug_struct("KeyPair")
                .field("key_id", key_id)
                .field("secret", &"<REDACTED>")
                .finish(),
        }
    }
}

/// Trait for DNS provider clients
///
/// Each implementation owns one provider's authentication, request
/// formatting and response parsing. The [`Reconciler`](crate::Reconciler)
/// only ever talks to this trait.
///
/// # Thread Safety
///
/// Clients are shared across concurrent requests through the
/// [`ClientRegistry`](crate::ClientRegistry). They must be stateless after
/// construction: immutable credentials and settings only.
///
/// # Errors
///
/// - [`Error::Transport`](crate::Error::Transport): the provider was unreachable
/// - [`Error::ProviderRejected`](crate::Error::ProviderRejected): non-success status in the body
/// - [`Error::NotFound`](crate::Error::NotFound): empty result set
/// - [`Error::MalformedResponse`](crate::Error::MalformedResponse): unparsable body
///
/// Clients never retry; a failed call fails the request.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Resolve a zone name to the provider's domain identifier
    ///
    /// Searches the provider's domain listing for an exact name match and
    /// returns the first one.
    async fn resolve_domain(&self, name: &str) -> Result<Domain, crate::Error>;

    /// Look up the `A` record for `sub_domain` inside `domain`
    ///
    /// Requests at most one result from the provider.
    async fn resolve_record(&self, domain: &Domain, sub_domain: &str)
    -> Result<Record, crate::Error>;

    /// Point `record` at `value`
    ///
    /// Always writes record type `A` on the provider's default line.
    /// Success is judged by the provider status in the response body.
    async fn update_record(
        &self,
        domain: &Domain,
        record: &Record,
        value: &str,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS provider clients from credentials
///
/// Factories carry the provider's immutable settings (base URL, default
/// line, timeout); each call binds one credential to a new client.
pub trait DnsProviderFactory: Send + Sync {
    /// Create a client bound to `credentials`
    fn create(&self, credentials: &Credentials) -> Result<Arc<dyn DnsProvider>, crate::Error>;
}
