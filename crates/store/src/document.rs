use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tl_domain::error::Result;
use tl_domain::model::User;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Persisted document
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A stored `User` plus bookkeeping.
///
/// `revision` is the optimistic-concurrency token: a record read at
/// revision N can only be saved while the stored copy is still at N.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(flatten)]
    pub user: User,
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn principal_id(&self) -> &str {
        &self.user.principal_id
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A document collection keyed uniquely by `principal_id`.
///
/// There is no delete: users and their resource lists only grow.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find(&self, principal_id: &str) -> Result<Option<UserRecord>>;

    /// Create the document for a new principal at revision 1.
    ///
    /// Fails with `Error::AlreadyExists` if the principal is taken.
    async fn insert(&self, user: User) -> Result<UserRecord>;

    /// Replace the stored document.
    ///
    /// Fails with `Error::StaleRevision` if another save landed since
    /// `record` was read. On success the returned record carries the
    /// incremented revision.
    async fn save(&self, record: UserRecord) -> Result<UserRecord>;

    async fn count(&self) -> Result<usize>;

    /// Make sure everything accepted so far is durable.
    async fn flush(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_flattens_user_fields() {
        let now = Utc::now();
        let rec = UserRecord {
            user: User::new("Ann", "ann@x.com", "p1"),
            revision: 3,
            created_at: now,
            updated_at: now,
        };
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["principal_id"], "p1");
        assert_eq!(v["revision"], 3);
        assert!(v.get("user").is_none());

        let back: UserRecord = serde_json::from_value(v).unwrap();
        assert_eq!(back, rec);
        assert_eq!(back.principal_id(), "p1");
    }
}
