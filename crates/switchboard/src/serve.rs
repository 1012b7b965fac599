// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `switchboard serve` command implementation.
//!
//! Opens the SQLite store, builds the enabled provider channels, wires the
//! hub, router, assignment engine, and archiver together, and serves the
//! gateway until SIGINT/SIGTERM.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use switchboard_config::SwitchboardConfig;
use switchboard_config::model::ProviderConfig;
use switchboard_config::validation::require_pseudonym_salt;
use switchboard_core::{Broadcaster, PluginAdapter, ProviderChannel, Source, SwitchboardError};
use switchboard_facebook::FacebookChannel;
use switchboard_gateway::{GatewayState, ServerConfig, WebhookEndpoint};
use switchboard_hub::{ChannelBroadcaster, PresenceRegistry, RealtimeHub};
use switchboard_router::{
    Archiver, AssignmentEngine, MessageRouter, OperationDispatcher, StatusReconciler,
};
use switchboard_security::{Pseudonymizer, RedactingWriter, SecretList};
use switchboard_storage::SqliteStore;
use switchboard_whatsapp::WhatsAppChannel;
use tracing::{info, warn};

use crate::shutdown;

/// Runs the `switchboard serve` command.
pub async fn run_serve(config: SwitchboardConfig) -> Result<(), SwitchboardError> {
    let secrets = known_secrets(&config);
    init_tracing(&config.server.log_level, secrets);

    let salt = require_pseudonym_salt(&config).map_err(|e| SwitchboardError::Config(e.to_string()))?;

    info!(database = %config.storage.database_path, "starting switchboard serve");

    let store = Arc::new(SqliteStore::new(config.storage.clone()));
    store.initialize().await?;

    let providers = build_providers(&config)?;
    if providers.is_empty() {
        warn!("no provider enabled; webhooks will answer 404");
    }

    let state = wire(&config, salt, store.clone(), &providers)?;
    let cancel = shutdown::install_signal_handler();
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    let served = switchboard_gateway::start_server(&server_config, state, cancel).await;

    for provider in &providers {
        if let Err(e) = provider.channel.shutdown().await {
            warn!(provider = provider.channel.name(), error = %e, "provider shutdown failed");
        }
    }
    if let Err(e) = store.shutdown().await {
        warn!(error = %e, "storage shutdown failed");
    }
    info!("switchboard serve shutdown complete");
    served
}

/// Values to mask in every log line: app secrets, verify tokens, the salt.
fn known_secrets(config: &SwitchboardConfig) -> SecretList {
    let secrets: SecretList = Arc::new(RwLock::new(Vec::new()));
    for provider in [&config.whatsapp, &config.facebook] {
        for value in [&provider.app_secret, &provider.verify_token].into_iter().flatten() {
            RedactingWriter::<std::io::Stderr>::add_secret(&secrets, value.clone());
        }
    }
    if let Some(salt) = &config.archive.pseudonym_salt {
        RedactingWriter::<std::io::Stderr>::add_secret(&secrets, salt.clone());
    }
    secrets
}

fn endpoint(channel: Arc<dyn ProviderChannel>, config: &ProviderConfig) -> WebhookEndpoint {
    WebhookEndpoint {
        channel,
        app_secret: config.app_secret.clone(),
        verify_token: config.verify_token.clone(),
    }
}

fn build_providers(config: &SwitchboardConfig) -> Result<Vec<WebhookEndpoint>, SwitchboardError> {
    let mut endpoints = Vec::new();
    if config.whatsapp.enabled {
        let channel = Arc::new(WhatsAppChannel::new(&config.whatsapp, &config.outbound)?);
        endpoints.push(endpoint(channel, &config.whatsapp));
    }
    if config.facebook.enabled {
        let channel = Arc::new(FacebookChannel::new(&config.facebook, &config.outbound)?);
        endpoints.push(endpoint(channel, &config.facebook));
    }
    for endpoint in &endpoints {
        if endpoint.app_secret.is_none() {
            warn!(
                provider = endpoint.channel.name(),
                "no app_secret configured; webhook signatures are not checked"
            );
        }
    }
    Ok(endpoints)
}

/// Build the gateway state over an initialized store.
pub fn wire(
    config: &SwitchboardConfig,
    salt: &str,
    store: Arc<SqliteStore>,
    providers: &[WebhookEndpoint],
) -> Result<GatewayState, SwitchboardError> {
    let channels: Vec<Arc<dyn ProviderChannel>> =
        providers.iter().map(|p| p.channel.clone()).collect();

    let broadcaster = Arc::new(ChannelBroadcaster::new());
    let hub = Arc::new(RealtimeHub::new(
        Arc::new(PresenceRegistry::new()),
        broadcaster.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
    ));
    let reconciler = Arc::new(StatusReconciler::new(store.clone(), broadcaster.clone()));
    let router = Arc::new(MessageRouter::new(
        store.clone(),
        store.clone(),
        broadcaster.clone(),
        reconciler,
        channels,
    ));
    let assignment = Arc::new(AssignmentEngine::new(store.clone(), broadcaster.clone()));
    let pseudonymizer = Pseudonymizer::new(salt)
        .map_err(|e| SwitchboardError::Config(format!("archive.pseudonym_salt: {e}")))?;
    let archiver = Arc::new(Archiver::new(
        store.clone(),
        pseudonymizer,
        config.archive.redaction_marker.clone(),
    ));
    let operations = Arc::new(OperationDispatcher::new(
        router.clone(),
        assignment,
        archiver,
        broadcaster as Arc<dyn Broadcaster>,
    ));

    let webhooks: HashMap<Source, WebhookEndpoint> = providers
        .iter()
        .map(|p| (p.channel.source(), p.clone()))
        .collect();

    Ok(GatewayState {
        hub,
        router,
        operations,
        webhooks: Arc::new(webhooks),
        store: store as Arc<dyn PluginAdapter>,
        connection_buffer: config.server.connection_buffer,
        start_time: std::time::Instant::now(),
    })
}

/// Initialize the tracing subscriber, writing through [`RedactingWriter`].
fn init_tracing(log_level: &str, secrets: SecretList) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("switchboard={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(move || RedactingWriter::new(std::io::stderr(), secrets.clone()))
        .init();
}
