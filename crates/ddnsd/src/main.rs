// # ddnsd - DDNS trigger daemon
//
// The ddnsd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Registering the enabled DNS providers
// 3. Serving the HTTP trigger routes until SIGTERM/SIGINT
//
// All reconcile logic lives in ddns-core; provider protocols live in the
// provider crates. This binary only wires them to HTTP.
//
// ## Routes
//
// - `POST|GET /dnspod`: `token`, `domain`, `record`, `ip`
// - `POST|GET /aliyun` (alias `/alidns`): `key`, `secret`, `domain`, `record`, `ip`
// - `GET /healthz`
//
// Trigger routes answer `1` (record current or updated) or `0` (anything else).
//
// ## Configuration
//
// - `DDNS_LISTEN_ADDR`: Listen address (default `0.0.0.0:7000`)
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn, error (default `info`)
// - `DDNS_HTTP_TIMEOUT_SECS`: Per provider call timeout (default 10)
// - `DDNS_MAX_CACHED_CLIENTS`: Provider client cache bound (default 256)
// - `DDNS_SHUTDOWN_TIMEOUT_SECS`: Graceful shutdown window (default 30)
// - `DDNS_WORKERS`: HTTP worker threads (default: one per core)
// - `DDNS_USER_AGENT`: User-Agent for provider calls
// - `DDNS_PROVIDERS`: Enabled providers (default `dnspod,alidns`)
// - `DDNS_DNSPOD_API_BASE`, `DDNS_DNSPOD_RECORD_LINE`
// - `DDNS_ALIDNS_ENDPOINT`, `DDNS_ALIDNS_RECORD_LINE`
//
// ## Example
//
// ```bash
// export DDNS_LISTEN_ADDR=127.0.0.1:7000
// export DDNS_PROVIDERS=dnspod
//
// ddnsd
// curl -d 'token=10000,abcdef&domain=example.com&record=home&ip=5.6.7.8' http://127.0.0.1:7000/dnspod
// ```

mod config;
mod routes;

use actix_web::{App, HttpServer, web};
use anyhow::Result;
use config::Config;
use ddns_core::{ClientRegistry, ProviderConfig};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration validation error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ddnsd daemon");

    let registry = match build_registry(&config) {
        Ok(registry) => registry,
        Err(e) => {
            error!("Failed to register providers: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let system = actix_web::rt::System::new();
    let result = system.block_on(async {
        if let Err(e) = run_daemon(config, registry).await {
            error!("Daemon error: {:#}", e);
            DdnsExitCode::RuntimeError
        } else {
            DdnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Register every enabled provider
fn build_registry(config: &Config) -> Result<ClientRegistry> {
    let registry = ClientRegistry::with_config(&config.registry_config());

    for provider in config.provider_configs() {
        match &provider {
            #[cfg(feature = "dnspod")]
            ProviderConfig::Dnspod { api_base, .. } => {
                info!(api_base = %api_base, "Registering DNSPod provider");
                ddns_provider_dnspod::register(&registry, &provider)?;
            }
            #[cfg(feature = "alidns")]
            ProviderConfig::Alidns { endpoint, .. } => {
                info!(endpoint = %endpoint, "Registering AliDNS provider");
                ddns_provider_alidns::register(&registry, &provider)?;
            }
            #[allow(unreachable_patterns)]
            other => {
                warn!(
                    provider = other.type_name(),
                    "Provider enabled but not compiled into this build"
                );
            }
        }
    }

    if registry.list_providers().is_empty() {
        anyhow::bail!("No DNS provider available; check DDNS_PROVIDERS and build features");
    }

    Ok(registry)
}

/// Run the HTTP server until a shutdown signal arrives
async fn run_daemon(config: Config, registry: ClientRegistry) -> Result<()> {
    let addr = config.socket_addr()?;
    let registry = web::Data::new(registry);
    let providers = registry.list_providers();

    let mut server = HttpServer::new({
        let registry = registry.clone();
        move || {
            App::new()
                .app_data(registry.clone())
                .configure(routes::configure)
        }
    })
    .shutdown_timeout(config.shutdown_timeout_secs)
    .disable_signals();

    if let Some(workers) = config.workers {
        server = server.workers(workers);
    }

    let server = server.bind(addr)?.run();
    let handle = server.handle();

    info!(%addr, providers = ?providers, "Listening for DDNS triggers");

    actix_web::rt::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => {
                info!("Received shutdown signal: {}", signal);
                info!("Shutting down daemon");
            }
            Err(e) => error!("Shutdown error: {:#}", e),
        }
        handle.stop(true).await;
    });

    server.await?;

    info!(
        grace = ?Duration::from_secs(config.shutdown_timeout_secs),
        "Daemon stopped"
    );
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
