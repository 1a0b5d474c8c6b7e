//! `POST /vectorstores/`: upload files into a new vector store.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use tl_domain::model::{ResourceKind, User, VectorStoreRef};
use tl_domain::trace::TraceEvent;
use tl_providers::{upload_and_poll, BatchStatus, UploadFile};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::{load_user, update_user};
use crate::identity::Principal;
use crate::state::AppState;

/// Multipart field carrying the uploaded files.
const FILES_FIELD: &str = "files";

pub async fn upload(
    State(state): State<AppState>,
    principal: Principal,
    multipart: Multipart,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let record = load_user(&state, &principal).await?;

    let files = read_files(multipart).await?;
    if files.is_empty() {
        return Err(ApiError::BadRequest("No upload file sent".into()));
    }
    let filenames: Vec<String> = files.iter().map(|f| f.filename.clone()).collect();

    let name = format!("{}-vectorstore", Uuid::new_v4());
    let store = state
        .provider
        .create_vector_store(&name)
        .await
        .map_err(ApiError::Provider)?;

    let batch = upload_and_poll(
        state.provider.as_ref(),
        &store.id,
        files,
        &state.config.polling.batch_policy(),
    )
    .await
    .map_err(ApiError::Provider)?;

    if batch.status != BatchStatus::Completed {
        tracing::warn!(
            vector_store_id = %store.id,
            batch_id = %batch.id,
            status = batch.status.as_str(),
            failed = batch.file_counts.failed,
            "file batch did not complete; vector store recorded anyway"
        );
    }

    let saved = update_user(&state, record, |user| {
        user.vectorstores.push(VectorStoreRef {
            id: store.id.clone(),
            filenames: filenames.clone(),
        })
    })
    .await?;

    TraceEvent::ResourceCreated {
        principal_id: principal.principal_id,
        kind: ResourceKind::VectorStore.to_string(),
        id: store.id,
    }
    .emit();

    Ok((StatusCode::CREATED, Json(saved.user)))
}

/// Buffer every `files` part in memory. Empty parts without a filename
/// (what browsers send for an empty file input) are skipped; a part with
/// content but no filename is rejected.
async fn read_files(mut multipart: Multipart) -> Result<Vec<UploadFile>, ApiError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_owned();
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        if filename.is_empty() {
            if bytes.is_empty() {
                continue;
            }
            return Err(ApiError::BadRequest("Uploaded file has no filename".into()));
        }
        files.push(UploadFile {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    Ok(files)
}
