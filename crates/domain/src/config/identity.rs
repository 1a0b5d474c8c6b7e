use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Identity (trust-boundary headers)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How callers are identified.
///
/// An upstream gateway injects an access credential and a principal ID as
/// request headers. This service trusts them; see [`VerificationMode`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "d_access_token_header")]
    pub access_token_header: String,
    #[serde(default = "d_principal_id_header")]
    pub principal_id_header: String,
    /// Env var holding a fallback access credential for local development.
    /// Read once at startup; unset means no fallback.
    #[serde(default = "d_dev_access_token_env")]
    pub dev_access_token_env: String,
    /// Env var holding a fallback principal ID for local development.
    #[serde(default = "d_dev_principal_id_env")]
    pub dev_principal_id_env: String,
    #[serde(default)]
    pub verification: VerificationConfig,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            access_token_header: d_access_token_header(),
            principal_id_header: d_principal_id_header(),
            dev_access_token_env: d_dev_access_token_env(),
            dev_principal_id_env: d_dev_principal_id_env(),
            verification: VerificationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VerificationConfig {
    #[serde(default)]
    pub mode: VerificationMode,
    /// Env var holding the shared secret (required for `hs256`).
    #[serde(default)]
    pub secret_env: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMode {
    /// Claims are decoded without checking the signature. Verification is
    /// assumed to happen at the upstream gateway.
    #[default]
    None,
    /// The credential signature is checked with an HMAC-SHA256 secret.
    Hs256,
}

fn d_access_token_header() -> String {
    "x-ms-token-aad-access-token".into()
}
fn d_principal_id_header() -> String {
    "x-ms-client-principal-id".into()
}
fn d_dev_access_token_env() -> String {
    "DEFAULT_ACCESS_TOKEN".into()
}
fn d_dev_principal_id_env() -> String {
    "DEFAULT_PRINCIPAL_ID".into()
}
