//! File-backed document store.
//!
//! All documents live in memory; every accepted write rewrites
//! `users.json` (temp file + rename) before it becomes visible to readers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use tl_domain::config::StoreConfig;
use tl_domain::error::{Error, Result};
use tl_domain::model::User;
use tl_domain::trace::TraceEvent;

use crate::document::{UserRecord, UserStore};

const FILE_NAME: &str = "users.json";

type Docs = HashMap<String, UserRecord>;

pub struct JsonFileStore {
    /// `None` for in-memory stores.
    file: Option<PathBuf>,
    docs: RwLock<Docs>,
    /// Serializes commits so snapshots reach disk in order.
    commit_lock: tokio::sync::Mutex<()>,
}

impl JsonFileStore {
    /// Load or create the store at `dir/users.json`.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let file = dir.join(FILE_NAME);

        let docs: Docs = if file.exists() {
            let raw = std::fs::read_to_string(&file)?;
            let records: Vec<UserRecord> = serde_json::from_str(&raw).map_err(|e| {
                Error::Store(format!("{} is not a valid user collection: {e}", file.display()))
            })?;
            records
                .into_iter()
                .map(|r| (r.user.principal_id.clone(), r))
                .collect()
        } else {
            HashMap::new()
        };

        tracing::info!(users = docs.len(), path = %file.display(), "user store loaded");

        Ok(Self {
            file: Some(file),
            docs: RwLock::new(docs),
            commit_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            file: None,
            docs: RwLock::new(HashMap::new()),
            commit_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn from_config(cfg: &StoreConfig) -> Result<Self> {
        if cfg.in_memory {
            tracing::warn!("user store is in-memory; nothing will be persisted");
            Ok(Self::in_memory())
        } else {
            Self::open(&cfg.path)
        }
    }

    /// Path of the backing file, if any.
    pub fn file_path(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Apply `change` to a copy of the collection, persist the copy, then
    /// publish it. A failed write leaves the visible state untouched.
    async fn commit<F>(&self, change: F) -> Result<UserRecord>
    where
        F: FnOnce(&mut Docs) -> Result<UserRecord>,
    {
        let _guard = self.commit_lock.lock().await;
        let mut next = self.docs.read().clone();
        let out = change(&mut next)?;
        if let Some(ref file) = self.file {
            write_snapshot(file, &next).await?;
        }
        *self.docs.write() = next;
        Ok(out)
    }
}

async fn write_snapshot(file: &Path, docs: &Docs) -> Result<()> {
    let mut records: Vec<&UserRecord> = docs.values().collect();
    records.sort_by(|a, b| a.user.principal_id.cmp(&b.user.principal_id));
    let json = serde_json::to_vec_pretty(&records)?;

    let tmp = file.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, file).await?;
    Ok(())
}

#[async_trait]
impl UserStore for JsonFileStore {
    async fn find(&self, principal_id: &str) -> Result<Option<UserRecord>> {
        Ok(self.docs.read().get(principal_id).cloned())
    }

    async fn insert(&self, user: User) -> Result<UserRecord> {
        self.commit(|docs| {
            if docs.contains_key(&user.principal_id) {
                return Err(Error::AlreadyExists {
                    key: user.principal_id.clone(),
                });
            }
            let now = Utc::now();
            let record = UserRecord {
                user,
                revision: 1,
                created_at: now,
                updated_at: now,
            };
            docs.insert(record.user.principal_id.clone(), record.clone());
            Ok(record)
        })
        .await
    }

    async fn save(&self, record: UserRecord) -> Result<UserRecord> {
        let saved = self
            .commit(|docs| {
                let key = record.user.principal_id.clone();
                let stored = docs
                    .get(&key)
                    .ok_or_else(|| Error::Store(format!("no document for principal {key}")))?;
                if stored.revision != record.revision {
                    return Err(Error::StaleRevision {
                        key,
                        expected: record.revision,
                        found: stored.revision,
                    });
                }
                let mut next = record;
                next.created_at = stored.created_at;
                next.revision += 1;
                next.updated_at = Utc::now();
                docs.insert(key, next.clone());
                Ok(next)
            })
            .await?;

        TraceEvent::RecordSaved {
            principal_id: saved.user.principal_id.clone(),
            revision: saved.revision,
        }
        .emit();

        Ok(saved)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.docs.read().len())
    }

    async fn flush(&self) -> Result<()> {
        let Some(ref file) = self.file else {
            return Ok(());
        };
        let _guard = self.commit_lock.lock().await;
        let snapshot = self.docs.read().clone();
        write_snapshot(file, &snapshot).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tl_domain::model::ThreadRef;

    #[tokio::test]
    async fn insert_then_find() {
        let store = JsonFileStore::in_memory();
        let rec = store.insert(User::new("Ann", "ann@x.com", "p1")).await.unwrap();
        assert_eq!(rec.revision, 1);

        let found = store.find("p1").await.unwrap().unwrap();
        assert_eq!(found.user.email, "ann@x.com");
        assert!(store.find("p2").await.unwrap().is_none());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_principal_rejected() {
        let store = JsonFileStore::in_memory();
        store.insert(User::new("Ann", "ann@x.com", "p1")).await.unwrap();
        let err = store
            .insert(User::new("Other", "o@x.com", "p1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { ref key } if key == "p1"));
        assert_eq!(store.find("p1").await.unwrap().unwrap().user.name, "Ann");
    }

    #[tokio::test]
    async fn save_bumps_revision() {
        let store = JsonFileStore::in_memory();
        let mut rec = store.insert(User::new("Ann", "ann@x.com", "p1")).await.unwrap();
        rec.user.threads.push(ThreadRef {
            id: "thread_1".into(),
            last_message: String::new(),
        });
        let saved = store.save(rec.clone()).await.unwrap();
        assert_eq!(saved.revision, 2);
        assert_eq!(saved.created_at, rec.created_at);
        assert!(saved.updated_at >= rec.updated_at);
        assert_eq!(store.find("p1").await.unwrap().unwrap().user.threads.len(), 1);
    }

    #[tokio::test]
    async fn stale_save_is_rejected_and_nothing_is_lost() {
        let store = JsonFileStore::in_memory();
        let base = store.insert(User::new("Ann", "ann@x.com", "p1")).await.unwrap();

        let mut first = base.clone();
        first.user.threads.push(ThreadRef {
            id: "thread_a".into(),
            last_message: String::new(),
        });
        let mut second = base;
        second.user.threads.push(ThreadRef {
            id: "thread_b".into(),
            last_message: String::new(),
        });

        store.save(first).await.unwrap();
        let err = store.save(second).await.unwrap_err();
        assert!(matches!(
            err,
            Error::StaleRevision { expected: 1, found: 2, .. }
        ));

        let stored = store.find("p1").await.unwrap().unwrap();
        let ids: Vec<_> = stored.user.threads.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["thread_a"]);
    }

    #[tokio::test]
    async fn save_unknown_principal_fails() {
        let store = JsonFileStore::in_memory();
        let now = Utc::now();
        let rec = UserRecord {
            user: User::new("Ghost", "g@x.com", "nobody"),
            revision: 1,
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(store.save(rec).await, Err(Error::Store(_))));
    }

    #[tokio::test]
    async fn in_memory_has_no_file() {
        let store = JsonFileStore::in_memory();
        assert!(store.file_path().is_none());
        store.flush().await.unwrap();
    }
}
