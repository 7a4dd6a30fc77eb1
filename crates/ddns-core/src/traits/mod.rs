//! Core traits for the DDNS reconciler
//!
//! - [`DnsProvider`]: resolve domains and records, update records via a provider API
//! - [`DnsProviderFactory`]: bind credentials to a new provider client

pub mod dns_provider;

pub use dns_provider::{Credentials, DnsProvider, DnsProviderFactory, Domain, Record};
