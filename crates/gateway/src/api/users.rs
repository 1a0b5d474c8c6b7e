//! `POST /users/` and `GET /users/me`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tl_domain::error::Error;
use tl_domain::model::User;
use tl_domain::trace::TraceEvent;

use crate::api::error::ApiError;
use crate::api::load_user;
use crate::identity::Principal;
use crate::state::AppState;

/// Register the caller, taking `name` and `email` from the credential.
pub async fn register(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let existing = state
        .store
        .find(&principal.principal_id)
        .await
        .map_err(ApiError::Store)?;
    if existing.is_some() {
        return Err(ApiError::Conflict);
    }

    let claims = state.identity.decode_claims(principal.access_token())?;
    let user = User::new(claims.name, claims.email, principal.principal_id.clone());

    // A concurrent registration can still win between find and insert.
    let record = state.store.insert(user).await.map_err(|e| match e {
        Error::AlreadyExists { .. } => ApiError::Conflict,
        other => ApiError::Store(other),
    })?;

    TraceEvent::UserRegistered {
        principal_id: principal.principal_id,
    }
    .emit();

    Ok((StatusCode::CREATED, Json(record.user)))
}

pub async fn me(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<User>, ApiError> {
    let record = load_user(&state, &principal).await?;
    Ok(Json(record.user))
}
