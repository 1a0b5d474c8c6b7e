//! REST client for the OpenAI Assistants v2 API.
//!
//! Any endpoint that speaks the same wire format works (Azure OpenAI with
//! `provider.auth.header = "api-key"`, local proxies). Reads retry
//! transient failures (5xx, timeouts, connection errors) with exponential
//! back-off. Writes are sent once and fail fast; 4xx is never retried.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tl_domain::config::ProviderConfig;
use tl_domain::error::{Error, Result};
use tl_domain::trace::TraceEvent;
use uuid::Uuid;

use crate::traits::{
    Assistant, AssistantProvider, CreateAssistant, FileBatch, FileObject, MessageObject,
    NewMessage, Run, Thread, UpdateAssistant, UploadFile, VectorStore,
};
use crate::util::{error_message, from_reqwest, resolve_api_key};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Created once at startup and shared; `reqwest::Client` pools connections.
#[derive(Debug, Clone)]
pub struct OpenAiAssistantsClient {
    id: String,
    http: Client,
    base_url: String,
    auth_header: String,
    auth_value: String,
    max_retries: u32,
}

impl OpenAiAssistantsClient {
    /// Build a client, resolving the API key from `cfg.auth`.
    pub fn from_config(cfg: &ProviderConfig) -> Result<Self> {
        let key = resolve_api_key(&cfg.auth)?;
        Self::with_api_key(cfg, &key)
    }

    /// Build a client with an already-resolved key.
    pub fn with_api_key(cfg: &ProviderConfig, api_key: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(from_reqwest)?;

        let auth_header = cfg
            .auth
            .header
            .clone()
            .unwrap_or_else(|| "Authorization".into());
        let prefix = cfg.auth.prefix.clone().unwrap_or_else(|| "Bearer ".into());

        Ok(Self {
            id: cfg.id.clone(),
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            auth_header,
            auth_value: format!("{prefix}{api_key}"),
            max_retries: cfg.max_retries,
        })
    }

    // ── request helpers ──────────────────────────────────────────────

    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        rb.header(&self.auth_header, &self.auth_value)
            .header("OpenAI-Beta", "assistants=v2")
            .header("X-Client-Request-Id", Uuid::new_v4().to_string())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn parse<T: DeserializeOwned>(endpoint: &str, resp: Response) -> Result<T> {
        let body = resp.text().await.map_err(from_reqwest)?;
        serde_json::from_str(&body)
            .map_err(|e| Error::Other(format!("{endpoint}: unexpected response body: {e}")))
    }

    // ── retry engine ─────────────────────────────────────────────────

    /// Send one request and classify the response.
    async fn attempt(&self, endpoint: &str, request: RequestBuilder) -> Attempt {
        let start = Instant::now();
        let result = self.decorate(request).send().await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                TraceEvent::ProviderCall {
                    endpoint: endpoint.to_owned(),
                    status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                    duration_ms,
                }
                .emit();
                tracing::warn!(endpoint, error = %e, "provider transport error");
                return Attempt::Transient(from_reqwest(e));
            }
        };

        let status = resp.status();
        TraceEvent::ProviderCall {
            endpoint: endpoint.to_owned(),
            status: status.as_u16(),
            duration_ms,
        }
        .emit();

        if !status.is_client_error() && !status.is_server_error() {
            return Attempt::Done(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        if status.is_server_error() {
            tracing::warn!(endpoint, status = status.as_u16(), "provider 5xx");
            return Attempt::Transient(Error::Provider {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Attempt::Fatal(Error::Auth(format!(
                "{endpoint} rejected credentials ({}): {}",
                status.as_u16(),
                error_message(&body)
            )));
        }
        Attempt::Fatal(Error::Provider {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    /// GET `url`, retrying transient failures up to `max_retries` times.
    async fn get_with_retry(&self, endpoint: &str, url: &str) -> Result<Response> {
        let mut last_err: Option<Error> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(100 * 2u64.pow(attempt - 1));
                tokio::time::sleep(backoff).await;
            }
            match self.attempt(endpoint, self.http.get(url)).await {
                Attempt::Done(resp) => return Ok(resp),
                Attempt::Fatal(e) => return Err(e),
                Attempt::Transient(e) => {
                    tracing::debug!(endpoint, attempt, "retrying read");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::Http(format!("{endpoint}: all retries exhausted"))))
    }

    /// Send a write exactly once. A lost response may still mean the
    /// provider applied it, so nothing is replayed.
    async fn post_once(&self, endpoint: &str, request: RequestBuilder) -> Result<Response> {
        match self.attempt(endpoint, request).await {
            Attempt::Done(resp) => Ok(resp),
            Attempt::Transient(e) | Attempt::Fatal(e) => Err(e),
        }
    }
}

/// Result of one provider round trip.
enum Attempt {
    Done(Response),
    /// 5xx or transport failure; reads may retry.
    Transient(Error),
    /// 4xx; never retried.
    Fatal(Error),
}

fn file_part(file: UploadFile) -> Part {
    let part = Part::bytes(file.bytes.clone()).file_name(file.filename.clone());
    match file.content_type.as_deref() {
        // `mime_str` consumes the part, so rebuild it on a bad content type.
        Some(ct) => part
            .mime_str(ct)
            .unwrap_or_else(|_| Part::bytes(file.bytes).file_name(file.filename)),
        None => part,
    }
}

#[derive(serde::Deserialize)]
struct MessageList {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl AssistantProvider for OpenAiAssistantsClient {
    async fn create_assistant(&self, req: CreateAssistant) -> Result<Assistant> {
        const EP: &str = "POST /assistants";
        let url = self.url("/assistants");
        let resp = self
            .post_once(EP, self.http.post(&url).json(&req))
            .await?;
        Self::parse(EP, resp).await
    }

    async fn update_assistant(
        &self,
        assistant_id: &str,
        req: UpdateAssistant,
    ) -> Result<Assistant> {
        const EP: &str = "POST /assistants/{id}";
        let url = self.url(&format!("/assistants/{assistant_id}"));
        let resp = self
            .post_once(EP, self.http.post(&url).json(&req))
            .await?;
        Self::parse(EP, resp).await
    }

    async fn create_thread(&self) -> Result<Thread> {
        const EP: &str = "POST /threads";
        let url = self.url("/threads");
        let resp = self
            .post_once(EP, self.http.post(&url).json(&json!({})))
            .await?;
        Self::parse(EP, resp).await
    }

    async fn create_message(&self, thread_id: &str, msg: NewMessage) -> Result<MessageObject> {
        const EP: &str = "POST /threads/{id}/messages";
        let url = self.url(&format!("/threads/{thread_id}/messages"));
        let resp = self
            .post_once(EP, self.http.post(&url).json(&msg))
            .await?;
        Self::parse(EP, resp).await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<serde_json::Value>> {
        const EP: &str = "GET /threads/{id}/messages";
        let url = self.url(&format!("/threads/{thread_id}/messages"));
        let resp = self.get_with_retry(EP, &url).await?;
        let list: MessageList = Self::parse(EP, resp).await?;
        Ok(list.data)
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run> {
        const EP: &str = "POST /threads/{id}/runs";
        let url = self.url(&format!("/threads/{thread_id}/runs"));
        let body = json!({ "assistant_id": assistant_id });
        let resp = self
            .post_once(EP, self.http.post(&url).json(&body))
            .await?;
        Self::parse(EP, resp).await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        const EP: &str = "GET /threads/{id}/runs/{id}";
        let url = self.url(&format!("/threads/{thread_id}/runs/{run_id}"));
        let resp = self.get_with_retry(EP, &url).await?;
        Self::parse(EP, resp).await
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        const EP: &str = "POST /threads/{id}/runs/{id}/cancel";
        let url = self.url(&format!("/threads/{thread_id}/runs/{run_id}/cancel"));
        let resp = self.post_once(EP, self.http.post(&url)).await?;
        Self::parse(EP, resp).await
    }

    async fn create_vector_store(&self, name: &str) -> Result<VectorStore> {
        const EP: &str = "POST /vector_stores";
        let url = self.url("/vector_stores");
        let body = json!({ "name": name });
        let resp = self
            .post_once(EP, self.http.post(&url).json(&body))
            .await?;
        Self::parse(EP, resp).await
    }

    async fn upload_file(&self, file: UploadFile) -> Result<FileObject> {
        const EP: &str = "POST /files";
        let url = self.url("/files");
        let form = Form::new()
            .text("purpose", "assistants")
            .part("file", file_part(file));
        let resp = self.post_once(EP, self.http.post(&url).multipart(form)).await?;
        Self::parse(EP, resp).await
    }

    async fn create_file_batch(
        &self,
        vector_store_id: &str,
        file_ids: Vec<String>,
    ) -> Result<FileBatch> {
        const EP: &str = "POST /vector_stores/{id}/file_batches";
        let url = self.url(&format!("/vector_stores/{vector_store_id}/file_batches"));
        let body = json!({ "file_ids": file_ids });
        let resp = self
            .post_once(EP, self.http.post(&url).json(&body))
            .await?;
        Self::parse(EP, resp).await
    }

    async fn retrieve_file_batch(
        &self,
        vector_store_id: &str,
        batch_id: &str,
    ) -> Result<FileBatch> {
        const EP: &str = "GET /vector_stores/{id}/file_batches/{id}";
        let url = self.url(&format!(
            "/vector_stores/{vector_store_id}/file_batches/{batch_id}"
        ));
        let resp = self.get_with_retry(EP, &url).await?;
        Self::parse(EP, resp).await
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}
