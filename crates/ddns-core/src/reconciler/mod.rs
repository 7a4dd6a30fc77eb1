//! Record reconciler
//!
//! The Reconciler is the provider-independent compare-then-update routine:
//! - Resolve the domain via DnsProvider
//! - Resolve the subdomain's record inside it
//! - Compare the published value with the desired one
//! - Update only when they differ
//!
//! ## State machine
//!
//! ```text
//! Start ──resolve_domain──▶ DomainResolved ──resolve_record──▶ RecordResolved
//!   │                            │                                 │
//!   ▼                            ▼                 equal ┌─────────┴────────┐ differ
//! Failed                       Failed                    ▼                  ▼
//!                                                    UpToDate        update_record
//!                                                                     │          │
//!                                                                  Updated     Failed
//! ```
//!
//! UpToDate and Updated are both success; the caller only learns that DNS
//! now matches the reported address.

use crate::error::{Error, Result};
use crate::traits::DnsProvider;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use tracing::{debug, info};

/// Desired state for one record, validated on construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileRequest {
    domain: String,
    sub_domain: String,
    ip: Ipv4Addr,
}

impl ReconcileRequest {
    /// Build a request from caller-supplied strings
    ///
    /// # Errors
    ///
    /// `Error::InvalidInput` when the domain or label is not a valid DNS
    /// name, or when `ip` is not an IPv4 address (only `A` records are managed).
    pub fn new(
        domain: impl Into<String>,
        sub_domain: impl Into<String>,
        ip: &str,
    ) -> Result<Self> {
        let domain: String = domain.into();
        let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
        let sub_domain: String = sub_domain.into();
        let sub_domain = sub_domain.trim().to_string();

        validate_domain_name(&domain)?;
        validate_sub_domain(&sub_domain)?;

        let ip = ip
            .trim()
            .parse::<Ipv4Addr>()
            .map_err(|_| Error::invalid_input(format!("Not an IPv4 address: '{}'", ip)))?;

        Ok(Self {
            domain,
            sub_domain,
            ip,
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn sub_domain(&self) -> &str {
        &self.sub_domain
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }
}

/// Terminal success states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Record already had the desired value; no write issued
    UpToDate {
        /// The published value
        value: String,
    },
    /// Record was rewritten
    Updated {
        /// Value before the update
        previous: String,
        /// Value after the update
        current: String,
    },
}

impl ReconcileOutcome {
    /// True when a write was issued
    pub fn wrote(&self) -> bool {
        matches!(self, ReconcileOutcome::Updated { .. })
    }
}

/// Step of the workflow a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStage {
    ResolveDomain,
    ResolveRecord,
    UpdateRecord,
}

impl ReconcileStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileStage::ResolveDomain => "resolve_domain",
            ReconcileStage::ResolveRecord => "resolve_record",
            ReconcileStage::UpdateRecord => "update_record",
        }
    }
}

impl fmt::Display for ReconcileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure state: the stage that failed and why
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {source}")]
pub struct ReconcileError {
    pub stage: ReconcileStage,
    #[source]
    pub source: Error,
}

impl ReconcileError {
    fn at(stage: ReconcileStage) -> impl FnOnce(Error) -> Self {
        move |source| Self { stage, source }
    }
}

/// Provider-independent record reconciler
///
/// Holds nothing but the provider client; every call resolves identifiers
/// from scratch.
pub struct Reconciler {
    provider: Arc<dyn DnsProvider>,
}

impl Reconciler {
    pub fn new(provider: Arc<dyn DnsProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Bring the record described by `request` in line with its desired IP
    ///
    /// At most one write is issued, and only when the published value
    /// differs from the desired one.
    pub async fn reconcile(
        &self,
        request: &ReconcileRequest,
    ) -> std::result::Result<ReconcileOutcome, ReconcileError> {
        let provider = self.provider.provider_name();
        let desired = request.ip().to_string();

        let domain = self
            .provider
            .resolve_domain(request.domain())
            .await
            .map_err(ReconcileError::at(ReconcileStage::ResolveDomain))?;
        debug!(provider, domain = %domain.name, domain_id = %domain.id, "Domain resolved");

        let record = self
            .provider
            .resolve_record(&domain, request.sub_domain())
            .await
            .map_err(ReconcileError::at(ReconcileStage::ResolveRecord))?;
        debug!(
            provider,
            record = %record.sub_domain,
            record_id = %record.id,
            current = %record.value,
            "Record resolved"
        );

        if values_match(&record.value, request.ip()) {
            debug!(
                provider,
                domain = request.domain(),
                record = request.sub_domain(),
                "Record already up to date"
            );
            return Ok(ReconcileOutcome::UpToDate {
                value: record.value,
            });
        }

        info!(
            provider,
            domain = request.domain(),
            record = request.sub_domain(),
            previous = %record.value,
            current = %desired,
            "Updating record"
        );
        self.provider
            .update_record(&domain, &record, &desired)
            .await
            .map_err(ReconcileError::at(ReconcileStage::UpdateRecord))?;

        info!(
            provider,
            domain = request.domain(),
            record = request.sub_domain(),
            "Record updated"
        );
        Ok(ReconcileOutcome::Updated {
            previous: record.value,
            current: desired,
        })
    }
}

/// Compare a published value with the desired address
///
/// Parses the published value when possible so formatting differences do
/// not cause writes; falls back to exact string comparison.
fn values_match(published: &str, desired: Ipv4Addr) -> bool {
    match published.trim().parse::<IpAddr>() {
        Ok(ip) => ip == IpAddr::V4(desired),
        Err(_) => published == desired.to_string(),
    }
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks: total length, label length, characters, hyphens.
fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.is_empty() {
        return Err(Error::invalid_input("Domain name cannot be empty"));
    }

    let wire_len = if domain.is_ascii() {
        domain.len()
    } else {
        to_punycode(domain)?.len()
    };
    if wire_len > 253 {
        return Err(Error::invalid_input(format!(
            "Domain name too long: {} chars (max 253)",
            wire_len
        )));
    }

    if !domain.contains('.') {
        return Err(Error::invalid_input(format!(
            "Domain name needs at least two labels: '{}'",
            domain
        )));
    }

    for label in domain.split('.') {
        validate_label(label, domain)?;
    }

    Ok(())
}

/// Validate a subdomain label; "@" (apex) and "*" (wildcard) are allowed
///
/// Multi-level labels such as "a.b" are accepted.
fn validate_sub_domain(sub_domain: &str) -> Result<()> {
    match sub_domain {
        "" => Err(Error::invalid_input("Subdomain label cannot be empty")),
        "@" | "*" => Ok(()),
        _ => {
            for (i, label) in sub_domain.split('.').enumerate() {
                if i == 0 && label == "*" {
                    continue;
                }
                validate_label(label, sub_domain)?;
            }
            Ok(())
        }
    }
}

/// IDNA conversion of a Unicode name or label
fn to_punycode(name: &str) -> Result<String> {
    idna::domain_to_ascii(name)
        .map_err(|_| Error::invalid_input(format!("Not a valid internationalized name: '{}'", name)))
}

/// Validate one label; Unicode labels are checked in their punycode form
/// and still passed to the provider as given
fn validate_label(label: &str, whole: &str) -> Result<()> {
    if label.is_empty() {
        return Err(Error::invalid_input(format!(
            "Name has empty label: '{}'",
            whole
        )));
    }

    let punycode;
    let label = if label.is_ascii() {
        label
    } else {
        punycode = to_punycode(label)?;
        punycode.as_str()
    };

    if label.len() > 63 {
        return Err(Error::invalid_input(format!(
            "Label too long: {} chars (max 63). Label: '{}'",
            label.len(),
            label
        )));
    }

    if !label
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::invalid_input(format!(
            "Label contains invalid characters: '{}'",
            label
        )));
    }

    if label.starts_with('-') || label.ends_with('-') {
        return Err(Error::invalid_input(format!(
            "Label cannot start or end with hyphen: '{}'",
            label
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_normalizes_domain() {
        let req = ReconcileRequest::new(" Example.COM. ", "home", "5.6.7.8").unwrap();
        assert_eq!(req.domain(), "example.com");
        assert_eq!(req.sub_domain(), "home");
        assert_eq!(req.ip(), Ipv4Addr::new(5, 6, 7, 8));
    }

    #[test]
    fn request_rejects_ipv6_and_garbage() {
        assert!(ReconcileRequest::new("example.com", "home", "::1").is_err());
        assert!(ReconcileRequest::new("example.com", "home", "").is_err());
        assert!(ReconcileRequest::new("example.com", "home", "1.2.3").is_err());
    }

    #[test]
    fn request_rejects_bad_names() {
        assert!(ReconcileRequest::new("", "home", "1.2.3.4").is_err());
        assert!(ReconcileRequest::new("localhost", "home", "1.2.3.4").is_err());
        assert!(ReconcileRequest::new("exa mple.com", "home", "1.2.3.4").is_err());
        assert!(ReconcileRequest::new("-bad.com", "home", "1.2.3.4").is_err());
        assert!(ReconcileRequest::new("example.com", "", "1.2.3.4").is_err());
        assert!(ReconcileRequest::new("example.com", "a..b", "1.2.3.4").is_err());
    }

    #[test]
    fn request_accepts_apex_wildcard_and_nested_labels() {
        assert!(ReconcileRequest::new("example.com", "@", "1.2.3.4").is_ok());
        assert!(ReconcileRequest::new("example.com", "*", "1.2.3.4").is_ok());
        assert!(ReconcileRequest::new("example.com", "*.lab", "1.2.3.4").is_ok());
        assert!(ReconcileRequest::new("example.com", "nas.home", "1.2.3.4").is_ok());
    }

    #[test]
    fn request_accepts_internationalized_names() {
        let req = ReconcileRequest::new("例子.中国", "家", "1.2.3.4").unwrap();
        assert_eq!(req.domain(), "例子.中国");
        assert_eq!(req.sub_domain(), "家");

        assert!(ReconcileRequest::new("bücher.de", "home", "1.2.3.4").is_ok());
        assert!(ReconcileRequest::new("例子.中国", "nas.家", "1.2.3.4").is_ok());
    }

    #[test]
    fn request_rejects_bad_internationalized_names() {
        assert!(ReconcileRequest::new("例 子.中国", "home", "1.2.3.4").is_err());
        assert!(ReconcileRequest::new("例子..中国", "home", "1.2.3.4").is_err());
        let long = format!("{}.中国", "例".repeat(70));
        assert!(ReconcileRequest::new(long, "home", "1.2.3.4").is_err());
    }

    #[test]
    fn values_match_ignores_formatting() {
        let ip = Ipv4Addr::new(1, 2, 3, 4);
        assert!(values_match("1.2.3.4", ip));
        assert!(values_match(" 1.2.3.4\n", ip));
        assert!(!values_match("1.2.3.5", ip));
        assert!(!values_match("", ip));
        assert!(!values_match("::ffff:1.2.3.4", ip));
    }

    #[test]
    fn stage_names() {
        assert_eq!(ReconcileStage::ResolveDomain.to_string(), "resolve_domain");
        assert_eq!(ReconcileStage::UpdateRecord.as_str(), "update_record");
    }
}
