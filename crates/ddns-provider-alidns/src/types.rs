//! AliDNS API response bodies and query encoding

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Write;

/// RFC3986 percent-encoding: only unreserved characters pass through
pub(crate) fn url_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => {
                let _ = write!(out, "%{:02X}", byte);
            }
        }
    }
    out
}

/// Sorted, encoded `k=v&k=v` query string
pub(crate) fn canonical_query(params: &BTreeMap<&str, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", url_encode(k), url_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Error body, returned with HTTP 4xx/5xx and occasionally with 200
#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "Message", default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DescribeDomainsResponse {
    #[serde(rename = "TotalCount", default)]
    pub total_count: u64,
    #[serde(rename = "Domains", default)]
    pub domains: DomainsWrapper,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DomainsWrapper {
    #[serde(rename = "Domain", default)]
    pub domain: Vec<AlidnsDomain>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlidnsDomain {
    #[serde(rename = "DomainId")]
    pub domain_id: String,
    #[serde(rename = "DomainName")]
    pub domain_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DescribeSubDomainRecordsResponse {
    #[serde(rename = "DomainRecords", default)]
    pub domain_records: RecordsWrapper,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RecordsWrapper {
    #[serde(rename = "Record", default)]
    pub record: Vec<AlidnsRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlidnsRecord {
    #[serde(rename = "RecordId")]
    pub record_id: String,
    #[serde(rename = "RR")]
    pub rr: String,
    #[serde(rename = "Type")]
    pub record_type: String,
    #[serde(rename = "Value")]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateDomainRecordResponse {
    #[serde(rename = "RecordId")]
    pub record_id: String,
}
