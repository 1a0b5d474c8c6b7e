//! The `User` document and the lightweight provider references it owns.
//!
//! Ownership is encoded purely by list membership: an assistant, thread or
//! vector store belongs to a user exactly when its provider ID appears in
//! the corresponding list of that user's document.

use std::fmt;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Owned references
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantRef {
    pub id: String,
    pub name: String,
    pub instructions: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRef {
    pub id: String,
    /// Text of the most recent user message whose run completed.
    #[serde(default)]
    pub last_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorStoreRef {
    pub id: String,
    /// Original names of the uploaded files (never their contents).
    #[serde(default)]
    pub filenames: Vec<String>,
}

/// The three kinds of provider resource a user can own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Assistant,
    Thread,
    VectorStore,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Assistant => "assistant",
            Self::Thread => "thread",
            Self::VectorStore => "vector_store",
        };
        f.write_str(s)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// User
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Root aggregate: one document per principal.
///
/// `name` and `email` are captured once at registration and never
/// rewritten. The resource lists are append-only; existing entries are
/// mutated in place by ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
    pub principal_id: String,
    #[serde(default)]
    pub assistants: Vec<AssistantRef>,
    #[serde(default)]
    pub threads: Vec<ThreadRef>,
    #[serde(default)]
    pub vectorstores: Vec<VectorStoreRef>,
}

impl User {
    /// A freshly registered user with empty resource lists.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        principal_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            principal_id: principal_id.into(),
            assistants: Vec::new(),
            threads: Vec::new(),
            vectorstores: Vec::new(),
        }
    }

    /// Whether `id` appears in the list for `kind`.
    pub fn owns(&self, kind: ResourceKind, id: &str) -> bool {
        match kind {
            ResourceKind::Assistant => self.assistants.iter().any(|a| a.id == id),
            ResourceKind::Thread => self.threads.iter().any(|t| t.id == id),
            ResourceKind::VectorStore => self.vectorstores.iter().any(|v| v.id == id),
        }
    }

    /// First assistant entry with the given ID.
    pub fn assistant_mut(&mut self, id: &str) -> Option<&mut AssistantRef> {
        self.assistants.iter_mut().find(|a| a.id == id)
    }

    /// First thread entry with the given ID.
    pub fn thread_mut(&mut self, id: &str) -> Option<&mut ThreadRef> {
        self.threads.iter_mut().find(|t| t.id == id)
    }

    pub fn thread(&self, id: &str) -> Option<&ThreadRef> {
        self.threads.iter().find(|t| t.id == id)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request payloads
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Body of assistant create / update requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantData {
    pub name: String,
    pub instructions: String,
}

/// Body of a chat request: one message to append to a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageData {
    pub role: String,
    pub content: String,
}

impl MessageData {
    /// Roles the provider accepts on submitted thread messages.
    pub const ROLES: [&'static str; 2] = ["user", "assistant"];

    pub fn has_valid_role(&self) -> bool {
        Self::ROLES.contains(&self.role.as_str())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
