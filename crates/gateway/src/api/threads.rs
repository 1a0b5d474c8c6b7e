use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tl_domain::model::{ResourceKind, ThreadRef, User};
use tl_domain::trace::TraceEvent;

use crate::api::error::ApiError;
use crate::api::{load_user, require_owned, update_user};
use crate::identity::Principal;
use crate::state::AppState;

pub async fn create(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let record = load_user(&state, &principal).await?;

    let thread = state
        .provider
        .create_thread()
        .await
        .map_err(ApiError::Provider)?;

    let saved = update_user(&state, record, |user| {
        user.threads.push(ThreadRef {
            id: thread.id.clone(),
            last_message: String::new(),
        })
    })
    .await?;

    TraceEvent::ResourceCreated {
        principal_id: principal.principal_id,
        kind: ResourceKind::Thread.to_string(),
        id: thread.id,
    }
    .emit();

    Ok((StatusCode::CREATED, Json(saved.user)))
}

/// The thread's messages exactly as the provider lists them.
pub async fn list_messages(
    State(state): State<AppState>,
    principal: Principal,
    Path(thread_id): Path<String>,
) -> Result<Json<Vec<serde_json::Value>>, ApiError> {
    let record = load_user(&state, &principal).await?;
    require_owned(&record, ResourceKind::Thread, &thread_id)?;

    let messages = state
        .provider
        .list_messages(&thread_id)
        .await
        .map_err(ApiError::Provider)?;

    Ok(Json(messages))
}
