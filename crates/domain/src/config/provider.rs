use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Assistant provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Connection settings for the assistant-completion provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Identifier used in logs and trace events.
    #[serde(default = "d_id")]
    pub id: String,
    /// API root, e.g. `https://api.openai.com/v1`.
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Model attached to every assistant this service creates.
    #[serde(default = "d_model")]
    pub model: String,
    #[serde(default = "d_120000")]
    pub timeout_ms: u64,
    /// Retries of read-only calls on 5xx and transport errors. Writes and
    /// 4xx responses are never retried.
    #[serde(default = "d_2")]
    pub max_retries: u32,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            id: d_id(),
            base_url: d_base_url(),
            model: d_model(),
            timeout_ms: d_120000(),
            max_retries: d_2(),
            auth: AuthConfig::default(),
        }
    }
}

/// Where the provider API key comes from.
///
/// Resolution order: `key` (plaintext), then `service` + `account` in the
/// OS keychain, then the `env` variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Header name (defaults to `Authorization`).
    #[serde(default)]
    pub header: Option<String>,
    /// Header value prefix (defaults to `Bearer `).
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default = "d_key_env")]
    pub env: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    /// Keychain service name.
    #[serde(default)]
    pub service: Option<String>,
    /// Keychain account name.
    #[serde(default)]
    pub account: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            header: None,
            prefix: None,
            env: d_key_env(),
            key: None,
            service: None,
            account: None,
        }
    }
}

fn d_id() -> String {
    "openai".into()
}
fn d_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn d_model() -> String {
    "gpt-4o-mini".into()
}
fn d_120000() -> u64 {
    120_000
}
fn d_2() -> u32 {
    2
}
fn d_key_env() -> Option<String> {
    Some("OPENAI_API_KEY".into())
}
