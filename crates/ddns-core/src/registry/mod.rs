//! Keyed client registry
//!
//! Provider factories are registered by name at startup. Clients are built
//! lazily on first use and cached per `(provider, credential fingerprint)`,
//! so concurrent requests carrying different credentials never share a
//! client while repeated requests with the same credentials reuse one.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ddns_core::{ClientRegistry, Credentials};
//!
//! let registry = ClientRegistry::new();
//! ddns_provider_dnspod::register(&registry, &ProviderConfig::dnspod())?;
//!
//! let client = registry.client_for("dnspod", &Credentials::token("id,token"))?;
//! ```
//!
//! ## Registration
//!
//! Provider crates expose a `register()` function:
//!
//! ```rust,ignore
//! pub fn register(registry: &ClientRegistry, config: &ProviderConfig) -> Result<()> {
//!     registry.register_provider("dnspod", Box::new(DnspodFactory::from_config(config)?));
//!     Ok(())
//! }
//! ```

use crate::config::RegistryConfig;
use crate::error::{Error, Result};
use crate::traits::{Credentials, DnsProvider, DnsProviderFactory};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Cache key: provider name plus a SHA-256 digest of the credentials
///
/// Plain secrets are never used as map keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    provider: String,
    fingerprint: String,
}

impl ClientKey {
    fn new(provider: &str, credentials: &Credentials) -> Self {
        let digest = Sha256::digest(credentials.fingerprint_material());
        Self {
            provider: provider.to_string(),
            fingerprint: hex::encode(digest),
        }
    }
}

/// Registry of provider factories and the clients built from them
///
/// ## Thread Safety
///
/// Both maps sit behind `RwLock`s. The request path only takes read locks
/// once a client exists; the write lock is taken on first use of a
/// credential.
pub struct ClientRegistry {
    /// Registered DNS provider factories
    providers: RwLock<HashMap<String, Box<dyn DnsProviderFactory>>>,

    /// Constructed clients
    clients: RwLock<HashMap<ClientKey, Arc<dyn DnsProvider>>>,

    /// Upper bound on `clients`
    max_cached_clients: usize,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::with_config(&RegistryConfig::default())
    }
}

impl ClientRegistry {
    /// Create a new empty registry with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty registry
    pub fn with_config(config: &RegistryConfig) -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
            clients: RwLock::new(HashMap::new()),
            max_cached_clients: config.max_cached_clients,
        }
    }

    /// Register a DNS provider factory
    ///
    /// Re-registering a name replaces the factory and drops the clients it built.
    pub fn register_provider(&self, name: impl Into<String>, factory: Box<dyn DnsProviderFactory>) {
        let name = name.into();
        {
            let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
            clients.retain(|key, _| key.provider != name);
        }
        let mut providers = self.providers.write().unwrap_or_else(PoisonError::into_inner);
        providers.insert(name, factory);
    }

    /// Get the client for `provider` bound to `credentials`
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn DnsProvider>)`: cached or freshly built client
    /// - `Err(Error::Config)`: provider not registered
    /// - `Err(Error::InvalidInput)`: empty credentials, or the factory refused them
    pub fn client_for(
        &self,
        provider: &str,
        credentials: &Credentials,
    ) -> Result<Arc<dyn DnsProvider>> {
        if credentials.is_empty() {
            return Err(Error::invalid_input(format!(
                "Empty credentials for provider {}",
                provider
            )));
        }

        let key = ClientKey::new(provider, credentials);

        {
            let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(client) = clients.get(&key) {
                return Ok(Arc::clone(client));
            }
        }

        let client = {
            let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
            let factory = providers
                .get(provider)
                .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider)))?;
            factory.create(credentials)?
        };

        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = clients.get(&key) {
            // Another request built one first
            return Ok(Arc::clone(existing));
        }
        if clients.len() >= self.max_cached_clients {
            debug!(
                provider,
                cached = clients.len(),
                "Client cache full, using an uncached client"
            );
            return Ok(client);
        }

        debug!(provider, "Cached new provider client");
        clients.insert(key, Arc::clone(&client));
        Ok(client)
    }

    /// List all registered provider types
    pub fn list_providers(&self) -> Vec<String> {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a provider type is registered
    pub fn has_provider(&self, name: &str) -> bool {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        providers.contains_key(name)
    }

    /// Number of clients currently cached
    pub fn cached_clients(&self) -> usize {
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        clients.len()
    }
}
