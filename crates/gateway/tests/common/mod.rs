//! Shared harness: a recording fake provider, an in-memory store and
//! request helpers driving the router with `oneshot`.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::Value;
use tower::ServiceExt;

use tl_domain::config::Config;
use tl_domain::error::{Error, Result};
use tl_gateway::api;
use tl_gateway::identity::IdentityResolver;
use tl_gateway::state::AppState;
use tl_providers::{
    Assistant, AssistantProvider, BatchStatus, CreateAssistant, FileBatch, FileCounts, FileObject,
    MessageObject, NewMessage, Run, RunStatus, Thread, UpdateAssistant, UploadFile, VectorStore,
};
use tl_store::{JsonFileStore, UserStore};

pub const TOKEN_HEADER: &str = "x-ms-token-aad-access-token";
pub const PRINCIPAL_HEADER: &str = "x-ms-client-principal-id";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Fake provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Every call made to [`FakeProvider`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateAssistant { name: String },
    UpdateAssistant { id: String, vector_store_ids: Option<Vec<String>> },
    CreateThread,
    CreateMessage { thread_id: String, content: String },
    ListMessages { thread_id: String },
    CreateRun { thread_id: String, assistant_id: String },
    RetrieveRun { run_id: String },
    CancelRun { run_id: String },
    CreateVectorStore,
    UploadFile { filename: String },
    CreateFileBatch { vector_store_id: String, file_ids: Vec<String> },
    RetrieveFileBatch,
}

/// Scripted in-process provider. IDs share one counter
/// (`asst_1`, `thread_2`, `vs_3`, ...).
#[derive(Default)]
pub struct FakeProvider {
    calls: Mutex<Vec<Call>>,
    counter: Mutex<u32>,
    /// Statuses returned by successive `retrieve_run` calls. When empty,
    /// runs report `completed`.
    run_script: Mutex<VecDeque<RunStatus>>,
    /// Statuses returned by successive `retrieve_file_batch` calls. When
    /// empty, batches report `completed`.
    batch_script: Mutex<VecDeque<BatchStatus>>,
    /// When set, every call fails with this HTTP-level message.
    failure: Mutex<Option<String>>,
    messages: Mutex<Vec<Value>>,
}

impl FakeProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script_runs(&self, statuses: &[RunStatus]) {
        self.run_script.lock().extend(statuses.iter().copied());
    }

    pub fn script_batches(&self, statuses: &[BatchStatus]) {
        self.batch_script.lock().extend(statuses.iter().copied());
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock() = Some(message.to_owned());
    }

    pub fn set_messages(&self, messages: Vec<Value>) {
        *self.messages.lock() = messages;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: Call) -> Result<()> {
        self.calls.lock().push(call);
        match self.failure.lock().as_ref() {
            Some(msg) => Err(Error::Http(msg.clone())),
            None => Ok(()),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut n = self.counter.lock();
        *n += 1;
        format!("{prefix}_{}", *n)
    }

    fn run(&self, id: &str, thread_id: &str, status: RunStatus) -> Run {
        Run {
            id: id.to_owned(),
            thread_id: thread_id.to_owned(),
            assistant_id: String::new(),
            status,
            last_error: None,
        }
    }
}

#[async_trait::async_trait]
impl AssistantProvider for FakeProvider {
    async fn create_assistant(&self, req: CreateAssistant) -> Result<Assistant> {
        self.record(Call::CreateAssistant {
            name: req.name.clone(),
        })?;
        Ok(Assistant {
            id: self.next_id("asst"),
            name: Some(req.name),
            instructions: Some(req.instructions),
            model: req.model,
            tool_resources: None,
        })
    }

    async fn update_assistant(
        &self,
        assistant_id: &str,
        req: UpdateAssistant,
    ) -> Result<Assistant> {
        let vector_store_ids = req
            .tool_resources
            .as_ref()
            .and_then(|r| r.file_search.as_ref())
            .map(|f| f.vector_store_ids.clone());
        self.record(Call::UpdateAssistant {
            id: assistant_id.to_owned(),
            vector_store_ids,
        })?;
        Ok(Assistant {
            id: assistant_id.to_owned(),
            name: req.name,
            instructions: req.instructions,
            model: String::new(),
            tool_resources: req.tool_resources,
        })
    }

    async fn create_thread(&self) -> Result<Thread> {
        self.record(Call::CreateThread)?;
        Ok(Thread {
            id: self.next_id("thread"),
        })
    }

    async fn create_message(&self, thread_id: &str, msg: NewMessage) -> Result<MessageObject> {
        self.record(Call::CreateMessage {
            thread_id: thread_id.to_owned(),
            content: msg.content,
        })?;
        Ok(MessageObject {
            id: self.next_id("msg"),
            thread_id: thread_id.to_owned(),
            role: msg.role,
        })
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Value>> {
        self.record(Call::ListMessages {
            thread_id: thread_id.to_owned(),
        })?;
        Ok(self.messages.lock().clone())
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run> {
        self.record(Call::CreateRun {
            thread_id: thread_id.to_owned(),
            assistant_id: assistant_id.to_owned(),
        })?;
        let id = self.next_id("run");
        Ok(self.run(&id, thread_id, RunStatus::Queued))
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.record(Call::RetrieveRun {
            run_id: run_id.to_owned(),
        })?;
        let status = self
            .run_script
            .lock()
            .pop_front()
            .unwrap_or(RunStatus::Completed);
        Ok(self.run(run_id, thread_id, status))
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.record(Call::CancelRun {
            run_id: run_id.to_owned(),
        })?;
        Ok(self.run(run_id, thread_id, RunStatus::Cancelling))
    }

    async fn create_vector_store(&self, name: &str) -> Result<VectorStore> {
        self.record(Call::CreateVectorStore)?;
        Ok(VectorStore {
            id: self.next_id("vs"),
            name: Some(name.to_owned()),
        })
    }

    async fn upload_file(&self, file: UploadFile) -> Result<FileObject> {
        self.record(Call::UploadFile {
            filename: file.filename.clone(),
        })?;
        Ok(FileObject {
            id: self.next_id("file"),
            filename: file.filename,
            bytes: file.bytes.len() as u64,
        })
    }

    async fn create_file_batch(
        &self,
        vector_store_id: &str,
        file_ids: Vec<String>,
    ) -> Result<FileBatch> {
        let total = file_ids.len() as u32;
        self.record(Call::CreateFileBatch {
            vector_store_id: vector_store_id.to_owned(),
            file_ids,
        })?;
        Ok(FileBatch {
            id: self.next_id("vsfb"),
            vector_store_id: vector_store_id.to_owned(),
            status: BatchStatus::InProgress,
            file_counts: FileCounts {
                in_progress: total,
                total,
                ..Default::default()
            },
        })
    }

    async fn retrieve_file_batch(&self, vector_store_id: &str, batch_id: &str) -> Result<FileBatch> {
        self.record(Call::RetrieveFileBatch)?;
        let status = self
            .batch_script
            .lock()
            .pop_front()
            .unwrap_or(BatchStatus::Completed);
        Ok(FileBatch {
            id: batch_id.to_owned(),
            vector_store_id: vector_store_id.to_owned(),
            status,
            file_counts: FileCounts::default(),
        })
    }

    fn provider_id(&self) -> &str {
        "fake"
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// App harness
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct TestApp {
    pub router: Router,
    pub provider: Arc<FakeProvider>,
    pub store: Arc<JsonFileStore>,
}

/// Default config with millisecond poll intervals and an in-memory store.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.store.in_memory = true;
    config.polling.run_interval_ms = 1;
    config.polling.batch_interval_ms = 1;
    config.polling.run_max_wait_ms = 2_000;
    config
}

pub fn app() -> TestApp {
    app_with(test_config())
}

pub fn app_with(config: Config) -> TestApp {
    let identity = IdentityResolver::new(&config.identity, None, None, None)
        .expect("identity resolver");
    app_with_identity(config, identity)
}

pub fn app_with_identity(config: Config, identity: IdentityResolver) -> TestApp {
    build(config, identity, |store| store as Arc<dyn UserStore>)
}

/// Like [`app`], but the router sees `wrap(store)` while `TestApp::store`
/// stays the plain inner store.
pub fn app_with_store(
    wrap: impl FnOnce(Arc<JsonFileStore>) -> Arc<dyn UserStore>,
) -> TestApp {
    let config = test_config();
    let identity = IdentityResolver::new(&config.identity, None, None, None)
        .expect("identity resolver");
    build(config, identity, wrap)
}

fn build(
    config: Config,
    identity: IdentityResolver,
    wrap: impl FnOnce(Arc<JsonFileStore>) -> Arc<dyn UserStore>,
) -> TestApp {
    let provider = FakeProvider::new();
    let store = Arc::new(JsonFileStore::in_memory());

    let router = api::router(&config.server);
    let state = AppState {
        config: Arc::new(config),
        provider: provider.clone(),
        store: wrap(store.clone()),
        identity: Arc::new(identity),
    };

    TestApp {
        router: router.with_state(state),
        provider,
        store,
    }
}

/// An HS256 credential carrying `name` and `email`. The default `none`
/// verification mode ignores the signature.
pub fn token(name: &str, email: &str) -> String {
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &serde_json::json!({ "name": name, "email": email }),
        &jsonwebtoken::EncodingKey::from_secret(b"upstream-secret"),
    )
    .expect("encode token")
}

/// A caller identified by principal ID, with a credential for registration.
#[derive(Clone)]
pub struct Caller {
    pub principal_id: String,
    pub token: String,
}

impl Caller {
    pub fn new(principal_id: &str, name: &str, email: &str) -> Self {
        Self {
            principal_id: principal_id.to_owned(),
            token: token(name, email),
        }
    }

    fn request(&self, method: &str, uri: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(TOKEN_HEADER, &self.token)
            .header(PRINCIPAL_HEADER, &self.principal_id)
    }

    pub fn get(&self, uri: &str) -> Request<Body> {
        self.request("GET", uri).body(Body::empty()).unwrap()
    }

    pub fn post_empty(&self, uri: &str) -> Request<Body> {
        self.request("POST", uri).body(Body::empty()).unwrap()
    }

    pub fn patch(&self, uri: &str) -> Request<Body> {
        self.request("PATCH", uri).body(Body::empty()).unwrap()
    }

    pub fn json(&self, method: &str, uri: &str, body: Value) -> Request<Body> {
        self.request(method, uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// `multipart/form-data` with one `files` part per `(filename, text)`.
    pub fn upload(&self, uri: &str, files: &[(&str, &str)]) -> Request<Body> {
        let boundary = "threadline-test-boundary";
        let mut body = Vec::new();
        for (name, text) in files {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\n\
                     Content-Type: text/plain\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(text.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        self.request("POST", uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }
}

/// Send one request and decode the JSON body (`Null` when empty).
pub async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(req).await.expect("router is infallible");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("JSON body")
    };
    (status, body)
}

/// Register `caller` and assert success.
pub async fn register(app: &TestApp, caller: &Caller) -> Value {
    let (status, body) = send(&app.router, caller.post_empty("/api/users/")).await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    body
}

/// Create an assistant for `caller` and return its ID.
pub async fn create_assistant(app: &TestApp, caller: &Caller, name: &str) -> String {
    let (status, body) = send(
        &app.router,
        caller.json(
            "POST",
            "/api/assistants/",
            serde_json::json!({ "name": name, "instructions": "Be brief." }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create assistant failed: {body}");
    last_id(&body["assistants"])
}

pub async fn create_thread(app: &TestApp, caller: &Caller) -> String {
    let (status, body) = send(&app.router, caller.post_empty("/api/threads/")).await;
    assert_eq!(status, StatusCode::CREATED, "create thread failed: {body}");
    last_id(&body["threads"])
}

pub async fn upload(app: &TestApp, caller: &Caller, files: &[(&str, &str)]) -> String {
    let (status, body) = send(&app.router, caller.upload("/api/vectorstores/", files)).await;
    assert_eq!(status, StatusCode::CREATED, "upload failed: {body}");
    last_id(&body["vectorstores"])
}

fn last_id(list: &Value) -> String {
    list.as_array()
        .and_then(|a| a.last())
        .and_then(|e| e["id"].as_str())
        .expect("list has an entry with an id")
        .to_owned()
}
