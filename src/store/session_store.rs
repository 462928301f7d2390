use crate::store::{Database, Error, Expiration, Key, RecordExistsAction, Result, WritePolicy};
use crate::{Intent, Session};
use serde::Deserialize;
use std::sync::Arc;

/// Configuration for a [`SessionStore`].
///
/// # Example
///
/// ```rust
/// use kvsession::StoreOptions;
///
/// let options = StoreOptions::build()
///     .set_name("user_sessions")
///     .ttl(2 * 60 * 60); // 2 hours
/// ```
///
/// Options can also be read from configuration files:
///
/// ```rust
/// # use kvsession::StoreOptions;
/// let options: StoreOptions = serde_json::from_str(r#"{ "set_name": "web", "ttl": 900 }"#).unwrap();
/// assert_eq!(options.ttl, 900);
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreOptions {
    /// The set (collection) session records are written to.
    pub set_name: String,
    /// Session time-to-live in seconds. `0` uses the database default.
    pub ttl: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            set_name: "sessions".to_string(),
            ttl: 10 * 60,
        }
    }
}

impl StoreOptions {
    /// Creates a new `StoreOptions` with default values.
    pub fn build() -> Self {
        Self::default()
    }

    pub fn set_name(mut self, set_name: impl Into<String>) -> Self {
        self.set_name = set_name.into();
        self
    }

    pub fn ttl(mut self, seconds: u32) -> Self {
        self.ttl = seconds;
        self
    }
}

/// Persists sessions as records of a key-value [`Database`].
///
/// Each session is stored whole at `(namespace, set, session id)`. Every write
/// replaces the entire record and resets its time-to-live; expiry itself is
/// left to the database.
///
/// The store keeps no per-session state, so clones are cheap and can be shared
/// across tasks. The database handle is owned by the caller.
///
/// # Example
///
/// ```rust
/// use kvsession::{Session, SessionStore};
/// use kvsession::store::memory::MemoryDatabase;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), kvsession::store::Error> {
/// let db = Arc::new(MemoryDatabase::new("app"));
/// let store = SessionStore::new(db, "sessions", 3600);
///
/// let mut session = Session::empty("f3a9c1");
/// session.insert("user_id", 42);
/// store.set("f3a9c1", &session).await?;
///
/// let loaded = store.get("f3a9c1").await?;
/// assert_eq!(loaded.get("user_id").and_then(|v| v.as_i64()), Some(42));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SessionStore<D: Database> {
    db: Arc<D>,
    set: String,
    write_policy: WritePolicy,
}

impl<D: Database> Clone for SessionStore<D> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            set: self.set.clone(),
            write_policy: self.write_policy,
        }
    }
}

impl<D: Database> SessionStore<D> {
    /// Creates a store writing to `set` with a time-to-live of `ttl_secs`.
    pub fn new(db: Arc<D>, set: impl Into<String>, ttl_secs: u32) -> Self {
        let mut write_policy = WritePolicy::new(Expiration::from_secs(ttl_secs));
        write_policy.record_exists_action = RecordExistsAction::Replace;

        Self {
            db,
            set: set.into(),
            write_policy,
        }
    }

    pub fn from_options(db: Arc<D>, options: StoreOptions) -> Self {
        Self::new(db, options.set_name, options.ttl)
    }

    pub fn database(&self) -> &Arc<D> {
        &self.db
    }

    pub fn set_name(&self) -> &str {
        &self.set
    }

    pub fn write_policy(&self) -> &WritePolicy {
        &self.write_policy
    }

    /// Loads the session stored under `id`.
    ///
    /// Fails with [`Error::NotFound`] if there is no record, either because it
    /// was never written or because it expired. Database errors are returned
    /// unchanged.
    #[tracing::instrument(name = "loading session from database", skip(self))]
    pub async fn get(&self, id: &str) -> Result<Session> {
        let key = self.key(id);
        let record = self.db.get(&key).await.map_err(|err| {
            tracing::error!(err = %err, "failed to load session from database");
            err
        })?;

        match record {
            Some(record) => Ok(Session::new(id, record.bins)),
            None => {
                tracing::debug!("session record not found");
                Err(Error::NotFound { id: id.to_owned() })
            }
        }
    }

    /// Writes `session` under `id`, or deletes the record if the session
    /// carries no fields or was destroyed.
    ///
    /// Deleting a record that does not exist succeeds.
    #[tracing::instrument(name = "saving session to database", skip(self, session))]
    pub async fn set(&self, id: &str, session: &Session) -> Result<()> {
        let key = self.key(id);

        match session.intent() {
            Intent::Delete => {
                let existed = self.db.delete(&key).await.map_err(|err| {
                    tracing::error!(err = %err, "failed to delete session from database");
                    err
                })?;
                tracing::debug!(existed, "session record deleted");
                Ok(())
            }
            Intent::Write(bins) => self
                .db
                .put(&self.write_policy, &key, bins)
                .await
                .map_err(|err| {
                    tracing::error!(err = %err, "failed to save session to database");
                    err
                }),
        }
    }

    fn key(&self, id: &str) -> Key {
        Key::new(self.db.namespace(), self.set.as_str(), id)
    }
}
