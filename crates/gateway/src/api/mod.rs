pub mod assistants;
pub mod error;
pub mod threads;
pub mod users;
pub mod vectorstores;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use tl_domain::config::ServerConfig;
use tl_domain::error::Error;
use tl_domain::model::{ResourceKind, User};
use tl_domain::trace::TraceEvent;
use tl_store::UserRecord;

use crate::identity::Principal;
use crate::state::AppState;

use self::error::ApiError;

/// Attempts at saving a record before a stale revision is reported.
const SAVE_ATTEMPTS: u32 = 3;

/// Build the full router.
///
/// `/healthz` is public; every resource route is mounted under
/// `server.api_prefix` and requires a [`Principal`].
pub fn router(server: &ServerConfig) -> Router<AppState> {
    let resources = Router::new()
        // Users
        .route("/users", post(users::register))
        .route("/users/", post(users::register))
        .route("/users/me", get(users::me))
        // Assistants
        .route("/assistants", post(assistants::create))
        .route("/assistants/", post(assistants::create))
        .route("/assistants/:assistant_id", put(assistants::update))
        .route(
            "/assistants/:assistant_id/threads/:thread_id",
            post(assistants::chat),
        )
        .route(
            "/assistants/:assistant_id/vectorstores/:vector_store_id",
            patch(assistants::attach_vector_store),
        )
        // Threads
        .route("/threads", post(threads::create))
        .route("/threads/", post(threads::create))
        .route("/threads/:thread_id", get(threads::list_messages))
        // Vector stores
        .route("/vectorstores", post(vectorstores::upload))
        .route("/vectorstores/", post(vectorstores::upload))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes));

    let public = Router::new().route("/healthz", get(health));

    let prefix = server.api_prefix.trim_end_matches('/');
    if prefix.is_empty() {
        public.merge(resources)
    } else {
        public.nest(prefix, resources)
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ── Shared handler helpers ─────────────────────────────────────────

/// Load the caller's record, or `NotFound` if they never registered.
pub(crate) async fn load_user(
    state: &AppState,
    principal: &Principal,
) -> Result<UserRecord, ApiError> {
    state
        .store
        .find(&principal.principal_id)
        .await
        .map_err(ApiError::Store)?
        .ok_or(ApiError::NotFound)
}

/// `Forbidden` unless `id` is in the caller's list for `kind`.
pub(crate) fn require_owned(
    record: &UserRecord,
    kind: ResourceKind,
    id: &str,
) -> Result<(), ApiError> {
    if record.user.owns(kind, id) {
        return Ok(());
    }
    TraceEvent::OwnershipDenied {
        principal_id: record.user.principal_id.clone(),
        kind: kind.to_string(),
        id: id.to_owned(),
    }
    .emit();
    Err(ApiError::Forbidden {
        kind,
        id: id.to_owned(),
    })
}

/// Apply `mutate` to the record and save it.
///
/// If another request saved first, the fresh record is reloaded and the
/// same mutation re-applied. Mutations only append or edit entries by ID,
/// so re-applying them to newer state is safe.
pub(crate) async fn update_user<F>(
    state: &AppState,
    mut record: UserRecord,
    mutate: F,
) -> Result<UserRecord, ApiError>
where
    F: Fn(&mut User),
{
    let principal_id = record.user.principal_id.clone();
    mutate(&mut record.user);

    let mut attempt = 1;
    loop {
        match state.store.save(record).await {
            Ok(saved) => return Ok(saved),
            Err(e @ Error::StaleRevision { .. }) if attempt >= SAVE_ATTEMPTS => {
                return Err(ApiError::Store(e));
            }
            Err(Error::StaleRevision { .. }) => {
                attempt += 1;
                tracing::debug!(principal_id = %principal_id, attempt, "stale revision, reapplying");
                record = state
                    .store
                    .find(&principal_id)
                    .await
                    .map_err(ApiError::Store)?
                    .ok_or(ApiError::NotFound)?;
                mutate(&mut record.user);
            }
            Err(e) => return Err(ApiError::Store(e)),
        }
    }
}
