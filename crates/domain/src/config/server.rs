use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_30303")]
    pub port: u16,
    #[serde(default = "d_host")]
    pub host: String,
    /// Prefix under which every resource route is mounted.
    #[serde(default = "d_api_prefix")]
    pub api_prefix: String,
    /// Directory of static frontend assets. When set and present, it is
    /// served at `/static` and its `index.html` at `/`.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
    #[serde(default)]
    pub cors: CorsConfig,
    /// Per-client-IP throttling. Disabled when absent.
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
    /// Upper bound on in-flight requests. Chat requests hold their slot for
    /// the whole run, so size this for the expected number of open chats.
    #[serde(default = "d_256")]
    pub max_concurrent_requests: usize,
    /// Request body limit, applied to vector-store uploads.
    #[serde(default = "d_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: d_30303(),
            host: d_host(),
            api_prefix: d_api_prefix(),
            static_dir: None,
            cors: CorsConfig::default(),
            rate_limit: None,
            max_concurrent_requests: d_256(),
            max_upload_bytes: d_upload_bytes(),
        }
    }
}

/// Token bucket parameters for [`ServerConfig::rate_limit`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Quota replenishment rate.
    pub requests_per_second: u64,
    /// Maximum tokens in the bucket.
    pub burst_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Exact origins, or `scheme://host:*` for any port on that host.
    /// A lone `"*"` allows every origin.
    #[serde(default = "d_cors_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: d_cors_origins(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_30303() -> u16 {
    30303
}
fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_api_prefix() -> String {
    "/api".into()
}
fn d_256() -> usize {
    256
}
fn d_upload_bytes() -> usize {
    64 * 1024 * 1024
}
fn d_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:*".into(),
        "http://127.0.0.1:*".into(),
    ]
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
