use serde::Serialize;

/// Structured trace events emitted across all threadline crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    UserRegistered {
        principal_id: String,
    },
    ResourceCreated {
        principal_id: String,
        kind: String,
        id: String,
    },
    OwnershipDenied {
        principal_id: String,
        kind: String,
        id: String,
    },
    ProviderCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
    RunPolled {
        run_id: String,
        status: String,
        polls: u32,
        waited_ms: u64,
    },
    FileBatchPolled {
        batch_id: String,
        status: String,
        polls: u32,
        waited_ms: u64,
    },
    RecordSaved {
        principal_id: String,
        revision: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "tl_event");
    }
}
