//! Shared helpers for the provider client.

use tl_domain::config::AuthConfig;
use tl_domain::error::{Error, Result};

/// Map a transport-level [`reqwest::Error`] onto the domain [`Error`].
///
/// Timeouts become [`Error::Timeout`]; everything else becomes
/// [`Error::Http`].
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Pull `error.message` out of an OpenAI-style error body, falling back to
/// the raw body.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_owned))
        .unwrap_or_else(|| body.to_owned())
}

/// Resolve the provider API key.
///
/// Order:
/// 1. `key` (plaintext in the config file, logged as a warning)
/// 2. `service` + `account` in the OS keychain
/// 3. the `env` variable
/// 4. `{SERVICE}_{ACCOUNT}` env var when a keychain was configured but
///    is unavailable (headless hosts)
pub fn resolve_api_key(auth: &AuthConfig) -> Result<String> {
    if let Some(ref key) = auth.key {
        tracing::warn!("provider API key read from plaintext config; prefer env or keychain");
        return Ok(key.clone());
    }

    if let (Some(service), Some(account)) = (&auth.service, &auth.account) {
        match resolve_from_keychain(service, account) {
            Ok(secret) => return Ok(secret),
            Err(e) => {
                tracing::warn!(
                    service = %service,
                    account = %account,
                    error = %e,
                    "keychain lookup failed"
                );
            }
        }
    }

    if let Some(ref env_var) = auth.env {
        if let Ok(val) = std::env::var(env_var) {
            return Ok(val);
        }
        if auth.service.is_none() {
            return Err(Error::Auth(format!(
                "environment variable '{env_var}' not set or not valid UTF-8"
            )));
        }
    }

    if let (Some(service), Some(account)) = (&auth.service, &auth.account) {
        let fallback_var = keychain_fallback_env_name(service, account);
        if let Ok(val) = std::env::var(&fallback_var) {
            tracing::info!(env_var = %fallback_var, "provider API key read from keychain fallback env var");
            return Ok(val);
        }
    }

    Err(Error::Auth(
        "no provider API key found: set provider.auth.env, provider.auth.key, \
         or provider.auth.service + account"
            .into(),
    ))
}

/// Read a secret from the platform credential store.
pub fn resolve_from_keychain(service: &str, account: &str) -> Result<String> {
    let entry = keyring::Entry::new(service, account)
        .map_err(|e| Error::Auth(format!("keyring entry: {e}")))?;
    entry
        .get_password()
        .map_err(|e| Error::Auth(format!("keyring read: {e}")))
}

/// `("threadline", "openai-key")` → `"THREADLINE_OPENAI_KEY"`.
pub fn keychain_fallback_env_name(service: &str, account: &str) -> String {
    format!(
        "{}_{}",
        service.to_uppercase().replace('-', "_"),
        account.to_uppercase().replace('-', "_"),
    )
}
