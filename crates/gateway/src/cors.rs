//! Cross-origin policy built from `[server.cors]`.

use axum::http::{header, HeaderName, HeaderValue, Method};
use tl_domain::config::{CorsConfig, IdentityConfig};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// One parsed `allowed_origins` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
enum OriginRule {
    Exact(HeaderValue),
    /// `http://localhost:*` keeps `http://localhost:` and accepts any
    /// all-digit port after it.
    AnyPort(String),
}

impl OriginRule {
    fn parse(entry: &str) -> Option<Self> {
        match entry.strip_suffix('*') {
            Some(prefix) if prefix.ends_with(':') => Some(Self::AnyPort(prefix.to_owned())),
            _ => HeaderValue::from_str(entry).ok().map(Self::Exact),
        }
    }

    fn matches(&self, origin: &HeaderValue) -> bool {
        match self {
            Self::Exact(allowed) => allowed == origin,
            Self::AnyPort(prefix) => origin
                .to_str()
                .ok()
                .and_then(|o| o.strip_prefix(prefix.as_str()))
                .is_some_and(|port| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())),
        }
    }
}

/// Whether `origin` is allowed by the configured entries.
fn origin_allowed(rules: &[OriginRule], origin: &HeaderValue) -> bool {
    rules.iter().any(|r| r.matches(origin))
}

/// Build the CORS layer.
///
/// The identity headers are allowed so a browser frontend can send them
/// directly when no upstream gateway injects them.
pub fn layer(cors: &CorsConfig, identity: &IdentityConfig) -> CorsLayer {
    let mut headers = vec![header::CONTENT_TYPE, header::AUTHORIZATION];
    for name in [&identity.access_token_header, &identity.principal_id_header] {
        match HeaderName::try_from(name.as_str()) {
            Ok(h) => headers.push(h),
            Err(_) => tracing::warn!(header = %name, "identity header is not a valid header name"),
        }
    }

    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers(headers);

    if cors.allowed_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS allows every origin");
        return base.allow_origin(Any);
    }

    let rules: Vec<OriginRule> = cors
        .allowed_origins
        .iter()
        .filter_map(|entry| {
            let rule = OriginRule::parse(entry);
            if rule.is_none() {
                tracing::warn!(origin = %entry, "ignoring unparsable CORS origin");
            }
            rule
        })
        .collect();

    base.allow_origin(AllowOrigin::predicate(move |origin, _| {
        origin_allowed(&rules, origin)
    }))
    .allow_credentials(true)
}
