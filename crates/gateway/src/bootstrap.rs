//! AppState construction shared by `serve` and `doctor`.

use std::sync::Arc;

use anyhow::Context;

use tl_domain::config::{Config, ConfigSeverity};
use tl_providers::{AssistantProvider, OpenAiAssistantsClient};
use tl_store::{JsonFileStore, UserStore};

use crate::identity::IdentityResolver;
use crate::state::AppState;

/// Validate config, initialize every collaborator and return a wired
/// [`AppState`].
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let error_count = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if error_count > 0 {
        anyhow::bail!("config validation failed with {error_count} error(s)");
    }

    // ── Provider client ──────────────────────────────────────────────
    let provider: Arc<dyn AssistantProvider> = Arc::new(
        OpenAiAssistantsClient::from_config(&config.provider)
            .context("initializing provider client")?,
    );
    tracing::info!(
        provider = %config.provider.id,
        base_url = %config.provider.base_url,
        model = %config.provider.model,
        "provider client ready"
    );

    // ── Document store ───────────────────────────────────────────────
    let store: Arc<dyn UserStore> =
        Arc::new(JsonFileStore::from_config(&config.store).context("opening user store")?);

    // ── Identity ─────────────────────────────────────────────────────
    let identity = Arc::new(
        IdentityResolver::from_config(&config.identity).context("configuring identity")?,
    );
    tracing::info!(
        access_token_header = %config.identity.access_token_header,
        principal_id_header = %config.identity.principal_id_header,
        verification = ?config.identity.verification.mode,
        "identity resolver ready"
    );

    Ok(AppState {
        config,
        provider,
        store,
        identity,
    })
}
