//! DNSPod API response bodies

use serde::Deserialize;
use std::fmt;

/// Status block present in every DNSPod response
#[derive(Debug, Deserialize)]
pub(crate) struct Status {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl Status {
    pub fn is_success(&self) -> bool {
        self.code == "1"
    }
}

/// DNSPod returns domain ids as numbers and record ids as strings,
/// depending on endpoint and API version
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Id {
    Number(u64),
    Text(String),
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Number(n) => write!(f, "{}", n),
            Id::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DomainEntry {
    pub id: Id,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DomainListResponse {
    pub status: Status,
    #[serde(default)]
    pub domains: Vec<DomainEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordEntry {
    pub id: Id,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordListResponse {
    pub status: Status,
    #[serde(default)]
    pub records: Vec<RecordEntry>,
}

/// Record.Modify only matters for its status
#[derive(Debug, Deserialize)]
pub(crate) struct StatusResponse {
    pub status: Status,
}
