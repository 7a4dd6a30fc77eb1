// # ddns-core
//
// Core library for the HTTP-triggered DDNS reconciler.
//
// ## Architecture Overview
//
// - **DnsProvider**: Trait for resolving and updating records via provider APIs
// - **DnsProviderFactory**: Binds credentials to a new provider client
// - **Reconciler**: Compare-then-update workflow over any DnsProvider
// - **ClientRegistry**: Factories by name, clients keyed by credential fingerprint
//
// ## Design Principles
//
// 1. **Provider-agnostic core**: the Reconciler only sees the trait
// 2. **Stateless requests**: identifiers are resolved from scratch every time
// 3. **Idempotency**: a write is issued only when the published value differs
// 4. **No retries**: a failed provider call fails the request

pub mod config;
pub mod error;
pub mod reconciler;
pub mod registry;
pub mod traits;

// Re-export core types for convenience
pub use config::{ProviderConfig, RegistryConfig};
pub use error::{Error, Result};
pub use reconciler::{
    ReconcileError, ReconcileOutcome, ReconcileRequest, ReconcileStage, Reconciler,
};
pub use registry::ClientRegistry;
pub use traits::{Credentials, DnsProvider, DnsProviderFactory, Domain, Record};
