//! Assistant endpoints, including the chat protocol.
//!
//! Chat is the only stateful exchange: submit the message, start a run,
//! wait for a terminal status, and record the message on the thread only
//! when the run completed.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tl_domain::model::{AssistantData, AssistantRef, MessageData, ResourceKind, User};
use tl_domain::trace::TraceEvent;
use tl_providers::{
    wait_for_run, AssistantTool, CreateAssistant, NewMessage, RunStatus, RunWait, ToolResources,
    UpdateAssistant,
};
use tl_store::UserRecord;

use crate::api::error::ApiError;
use crate::api::{load_user, require_owned, update_user};
use crate::identity::Principal;
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Create / update
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn create(
    State(state): State<AppState>,
    principal: Principal,
    Json(data): Json<AssistantData>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let record = load_user(&state, &principal).await?;

    let assistant = state
        .provider
        .create_assistant(CreateAssistant {
            model: state.config.provider.model.clone(),
            name: data.name.clone(),
            instructions: data.instructions.clone(),
            tools: vec![AssistantTool::FileSearch],
        })
        .await
        .map_err(ApiError::Provider)?;

    let entry = AssistantRef {
        id: assistant.id.clone(),
        name: data.name,
        instructions: data.instructions,
    };
    let saved = update_user(&state, record, |user| user.assistants.push(entry.clone())).await?;

    TraceEvent::ResourceCreated {
        principal_id: principal.principal_id,
        kind: ResourceKind::Assistant.to_string(),
        id: assistant.id,
    }
    .emit();

    Ok((StatusCode::CREATED, Json(saved.user)))
}

pub async fn update(
    State(state): State<AppState>,
    principal: Principal,
    Path(assistant_id): Path<String>,
    Json(data): Json<AssistantData>,
) -> Result<Json<User>, ApiError> {
    let record = load_user(&state, &principal).await?;
    require_owned(&record, ResourceKind::Assistant, &assistant_id)?;

    state
        .provider
        .update_assistant(
            &assistant_id,
            UpdateAssistant {
                name: Some(data.name.clone()),
                instructions: Some(data.instructions.clone()),
                tool_resources: None,
            },
        )
        .await
        .map_err(ApiError::Provider)?;

    let saved = update_user(&state, record, |user| {
        if let Some(entry) = user.assistant_mut(&assistant_id) {
            entry.name = data.name.clone();
            entry.instructions = data.instructions.clone();
        }
    })
    .await?;

    Ok(Json(saved.user))
}

/// Point the assistant's file search at exactly this vector store.
///
/// Any previously attached store is replaced. The user record is not
/// modified.
pub async fn attach_vector_store(
    State(state): State<AppState>,
    principal: Principal,
    Path((assistant_id, vector_store_id)): Path<(String, String)>,
) -> Result<Json<User>, ApiError> {
    let record = load_user(&state, &principal).await?;
    require_owned(&record, ResourceKind::Assistant, &assistant_id)?;
    require_owned(&record, ResourceKind::VectorStore, &vector_store_id)?;

    state
        .provider
        .update_assistant(
            &assistant_id,
            UpdateAssistant {
                tool_resources: Some(ToolResources::single_vector_store(&vector_store_id)),
                ..Default::default()
            },
        )
        .await
        .map_err(ApiError::Provider)?;

    tracing::info!(
        principal_id = %principal.principal_id,
        assistant_id = %assistant_id,
        vector_store_id = %vector_store_id,
        "vector store attached"
    );

    Ok(Json(record.user))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Chat
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn chat(
    State(state): State<AppState>,
    principal: Principal,
    Path((assistant_id, thread_id)): Path<(String, String)>,
    Json(message): Json<MessageData>,
) -> Result<Json<User>, ApiError> {
    let record = load_user(&state, &principal).await?;
    require_owned(&record, ResourceKind::Assistant, &assistant_id)?;
    require_owned(&record, ResourceKind::Thread, &thread_id)?;

    if !message.has_valid_role() {
        return Err(ApiError::BadRequest(format!(
            "role must be one of {:?}, got {:?}",
            MessageData::ROLES,
            message.role
        )));
    }

    // Detached so a client disconnect cannot abort the run or the save.
    let task = tokio::spawn(run_chat(state, record, assistant_id, thread_id, message));
    let user = task
        .await
        .map_err(|e| ApiError::Internal(format!("chat task failed: {e}")))??;

    Ok(Json(user))
}

async fn run_chat(
    state: AppState,
    record: UserRecord,
    assistant_id: String,
    thread_id: String,
    message: MessageData,
) -> Result<User, ApiError> {
    let provider = state.provider.as_ref();

    provider
        .create_message(
            &thread_id,
            NewMessage {
                role: message.role.clone(),
                content: message.content.clone(),
            },
        )
        .await
        .map_err(ApiError::Provider)?;

    let run = provider
        .create_run(&thread_id, &assistant_id)
        .await
        .map_err(ApiError::Provider)?;
    tracing::debug!(run_id = %run.id, thread_id = %thread_id, "run started");

    let policy = state.config.polling.run_policy();
    let outcome = wait_for_run(
        provider,
        &thread_id,
        run,
        &policy,
        state.config.polling.cancel_on_timeout,
    )
    .await
    .map_err(ApiError::Provider)?;

    match outcome {
        RunWait::Finished(run) if run.status == RunStatus::Completed => {
            let content = message.content;
            let saved = update_user(&state, record, |user| {
                if let Some(thread) = user.thread_mut(&thread_id) {
                    thread.last_message = content.clone();
                }
            })
            .await?;
            Ok(saved.user)
        }
        RunWait::Finished(run) => {
            if let Some(err) = &run.last_error {
                tracing::warn!(
                    run_id = %run.id,
                    code = %err.code,
                    message = %err.message,
                    "run ended without completing"
                );
            }
            Err(ApiError::RunNotCompleted { status: run.status })
        }
        RunWait::TimedOut { run, waited } => Err(ApiError::RunTimedOut {
            run_id: run.id,
            waited_ms: waited.as_millis() as u64,
        }),
    }
}
