//! Test doubles and common utilities for reconciler contract tests
//!
//! The scripted provider answers from canned data and records every call,
//! so tests can assert exactly which provider operations were issued.

#![allow(dead_code)]

use ddns_core::error::{Error, Result};
use ddns_core::traits::{Credentials, DnsProvider, DnsProviderFactory, Domain, Record};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// What `update_record` should answer
#[derive(Debug, Clone)]
pub enum UpdateBehavior {
    Succeed,
    Reject { code: String, message: String },
    TransportFailure,
}

/// One recorded `update_record` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCall {
    pub domain_id: String,
    pub record_id: String,
    pub sub_domain: String,
    pub value: String,
}

/// Shared call counters, so a test can keep observing a provider after
/// handing it to a Reconciler
#[derive(Default)]
pub struct CallLog {
    pub domain_lookups: AtomicUsize,
    pub record_lookups: AtomicUsize,
    pub updates: Mutex<Vec<UpdateCall>>,
}

impl CallLog {
    pub fn domain_lookups(&self) -> usize {
        self.domain_lookups.load(Ordering::SeqCst)
    }

    pub fn record_lookups(&self) -> usize {
        self.record_lookups.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> Vec<UpdateCall> {
        self.updates.lock().unwrap().clone()
    }
}

/// A DnsProvider that serves one domain and its records from memory
///
/// A successful update rewrites the stored value, like a real provider.
pub struct ScriptedProvider {
    domain: Option<Domain>,
    records: Mutex<Vec<Record>>,
    update_behavior: UpdateBehavior,
    log: Arc<CallLog>,
}

impl ScriptedProvider {
    /// Provider with no domains at all
    pub fn empty() -> Self {
        Self {
            domain: None,
            records: Mutex::new(Vec::new()),
            update_behavior: UpdateBehavior::Succeed,
            log: Arc::new(CallLog::default()),
        }
    }

    /// Provider hosting `domain` with id `domain_id`
    pub fn with_domain(domain_id: &str, domain: &str) -> Self {
        Self {
            domain: Some(Domain::new(domain_id, domain)),
            ..Self::empty()
        }
    }

    pub fn with_record(self, record_id: &str, sub_domain: &str, value: &str) -> Self {
        self.records
            .lock()
            .unwrap()
            .push(Record::new(record_id, sub_domain, value));
        self
    }

    pub fn with_update_behavior(mut self, behavior: UpdateBehavior) -> Self {
        self.update_behavior = behavior;
        self
    }

    pub fn log(&self) -> Arc<CallLog> {
        Arc::clone(&self.log)
    }
}

#[async_trait::async_trait]
impl DnsProvider for ScriptedProvider {
    async fn resolve_domain(&self, name: &str) -> Result<Domain> {
        self.log.domain_lookups.fetch_add(1, Ordering::SeqCst);
        self.domain
            .clone()
            .filter(|d| d.name == name)
            .ok_or_else(|| Error::not_found(format!("domain {}", name)))
    }

    async fn resolve_record(&self, _domain: &Domain, sub_domain: &str) -> Result<Record> {
        self.log.record_lookups.fetch_add(1, Ordering::SeqCst);
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.sub_domain == sub_domain)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("record {}", sub_domain)))
    }

    async fn update_record(&self, domain: &Domain, record: &Record, value: &str) -> Result<()> {
        self.log.updates.lock().unwrap().push(UpdateCall {
            domain_id: domain.id.clone(),
            record_id: record.id.clone(),
            sub_domain: record.sub_domain.clone(),
            value: value.to_string(),
        });

        match &self.update_behavior {
            UpdateBehavior::Succeed => {
                let mut records = self.records.lock().unwrap();
                if let Some(stored) = records.iter_mut().find(|r| r.id == record.id) {
                    stored.value = value.to_string();
                }
                Ok(())
            }
            UpdateBehavior::Reject { code, message } => Err(Error::rejected(
                "scripted",
                "Record.Modify",
                code.clone(),
                message.clone(),
            )),
            UpdateBehavior::TransportFailure => Err(Error::transport("connection reset")),
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// A provider that remembers which credential built it
pub struct CredentialEcho {
    pub credentials: Credentials,
}

#[async_trait::async_trait]
impl DnsProvider for CredentialEcho {
    async fn resolve_domain(&self, name: &str) -> Result<Domain> {
        // Hand back the credential through the domain id so tests can see it
        let id = match &self.credentials {
            Credentials::Token(token) => token.clone(),
            Credentials::KeyPair { key_id, .. } => key_id.clone(),
        };
        tokio::task::yield_now().await;
        Ok(Domain::new(id, name))
    }

    async fn resolve_record(&self, domain: &Domain, sub_domain: &str) -> Result<Record> {
        Ok(Record::new(domain.id.clone(), sub_domain, "0.0.0.0"))
    }

    async fn update_record(&self, _domain: &Domain, _record: &Record, _value: &str) -> Result<()> {
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "echo"
    }
}

/// Factory producing [`CredentialEcho`] clients
pub struct EchoFactory;

impl DnsProviderFactory for EchoFactory {
    fn create(&self, credentials: &Credentials) -> Result<Arc<dyn DnsProvider>> {
        Ok(Arc::new(CredentialEcho {
            credentials: credentials.clone(),
        }))
    }
}
