//! Caller identity from trust-boundary headers.
//!
//! An upstream gateway (e.g. App Service authentication) injects two
//! headers: an access credential and a principal ID. The principal ID is
//! the caller's identity for every authorization decision. The credential
//! is only decoded at registration to read `name` and `email`.
//!
//! In `none` verification mode the credential signature is NOT checked.
//! That is only safe when the upstream gateway verifies it. `hs256` mode
//! checks the signature on every request.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tl_domain::config::{IdentityConfig, VerificationMode};
use tl_domain::error::{Error, Result};

use crate::api::error::ApiError;
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Principal
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct Principal {
    pub principal_id: String,
    access_token: String,
}

impl Principal {
    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        state.identity.resolve(&parts.headers)
    }
}

/// Identity claims read from the access credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub name: String,
    pub email: String,
}

#[derive(Deserialize)]
struct TokenClaims {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    /// Entra ID access tokens often carry the address here instead.
    #[serde(default)]
    preferred_username: Option<String>,
    #[serde(default)]
    upn: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Resolver
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct IdentityResolver {
    access_token_header: String,
    principal_id_header: String,
    dev_access_token: Option<String>,
    dev_principal_id: Option<String>,
    mode: VerificationMode,
    key: DecodingKey,
    validation: Validation,
}

impl IdentityResolver {
    /// Build from config, reading the dev fallbacks and the HS256 secret
    /// from the environment once.
    pub fn from_config(cfg: &IdentityConfig) -> Result<Self> {
        let dev_access_token = non_empty(std::env::var(&cfg.dev_access_token_env).ok());
        let dev_principal_id = non_empty(std::env::var(&cfg.dev_principal_id_env).ok());
        if dev_access_token.is_some() || dev_principal_id.is_some() {
            tracing::warn!(
                access_token = dev_access_token.is_some(),
                principal_id = dev_principal_id.is_some(),
                "development identity fallbacks are active"
            );
        }

        let secret = match (cfg.verification.mode, &cfg.verification.secret_env) {
            (VerificationMode::Hs256, Some(var)) => Some(std::env::var(var).map_err(|_| {
                Error::Config(format!("identity secret env var '{var}' is not set"))
            })?),
            (VerificationMode::Hs256, None) => {
                return Err(Error::Config(
                    "identity.verification.secret_env is required for hs256".into(),
                ))
            }
            (VerificationMode::None, _) => None,
        };

        Self::new(cfg, dev_access_token, dev_principal_id, secret.as_deref())
    }

    /// Build with explicit fallbacks and secret (no environment access).
    pub fn new(
        cfg: &IdentityConfig,
        dev_access_token: Option<String>,
        dev_principal_id: Option<String>,
        secret: Option<&str>,
    ) -> Result<Self> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let key = match cfg.verification.mode {
            VerificationMode::None => {
                validation.insecure_disable_signature_validation();
                tracing::warn!(
                    "access credentials are decoded without signature verification; \
                     the upstream gateway must verify them"
                );
                DecodingKey::from_secret(&[])
            }
            VerificationMode::Hs256 => {
                let secret = secret
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| Error::Config("hs256 verification needs a secret".into()))?;
                DecodingKey::from_secret(secret.as_bytes())
            }
        };

        Ok(Self {
            access_token_header: cfg.access_token_header.to_ascii_lowercase(),
            principal_id_header: cfg.principal_id_header.to_ascii_lowercase(),
            dev_access_token,
            dev_principal_id,
            mode: cfg.verification.mode,
            key,
            validation,
        })
    }

    /// Extract the caller from request headers, falling back to the
    /// development defaults for absent headers.
    pub fn resolve(&self, headers: &HeaderMap) -> std::result::Result<Principal, ApiError> {
        let access_token = header(headers, &self.access_token_header)
            .or_else(|| self.dev_access_token.clone())
            .ok_or_else(|| ApiError::Unauthorized("Missing Token".into()))?;
        let principal_id = header(headers, &self.principal_id_header)
            .or_else(|| self.dev_principal_id.clone())
            .ok_or_else(|| ApiError::Unauthorized("Missing principal ID".into()))?;

        if self.mode == VerificationMode::Hs256 {
            self.decode_claims(&access_token)?;
        }

        Ok(Principal {
            principal_id,
            access_token,
        })
    }

    /// Read `name` and `email` from the credential.
    ///
    /// `email` falls back to `preferred_username`, then `upn`.
    pub fn decode_claims(&self, token: &str) -> std::result::Result<Claims, ApiError> {
        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.key, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "access credential rejected");
                ApiError::Unauthorized(format!("invalid access token: {e}"))
            })?;
        let claims = data.claims;

        let name = non_empty(claims.name)
            .ok_or_else(|| ApiError::Unauthorized("access token has no name claim".into()))?;
        let email = non_empty(claims.email)
            .or_else(|| non_empty(claims.preferred_username))
            .or_else(|| non_empty(claims.upn))
            .ok_or_else(|| ApiError::Unauthorized("access token has no email claim".into()))?;

        Ok(Claims { name, email })
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
