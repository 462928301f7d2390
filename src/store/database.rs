use crate::Bins;
use crate::store::Result;
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// The composite address of a single record: `(namespace, set, user_key)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Key {
    namespace: String,
    set: String,
    user_key: String,
}

impl Key {
    pub fn new(
        namespace: impl Into<String>,
        set: impl Into<String>,
        user_key: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            set: set.into(),
            user_key: user_key.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn set(&self) -> &str {
        &self.set
    }

    pub fn user_key(&self) -> &str {
        &self.user_key
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.set, self.user_key)
    }
}

/// How long a written record lives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Expiration {
    /// Use the database's default time-to-live.
    #[default]
    NamespaceDefault,
    /// The record never expires.
    Never,
    /// Expires after the given number of seconds. `Seconds(0)` is written
    /// already expired, so the record is absent afterwards on every backend.
    Seconds(u32),
}

impl Expiration {
    /// A TTL of `0` means the database default.
    pub fn from_secs(seconds: u32) -> Self {
        if seconds == 0 {
            Expiration::NamespaceDefault
        } else {
            Expiration::Seconds(seconds)
        }
    }

    /// Resolves to a concrete duration, `None` meaning the record never expires.
    pub fn resolve(self, default: Option<Duration>) -> Option<Duration> {
        match self {
            Expiration::NamespaceDefault => default,
            Expiration::Never => None,
            Expiration::Seconds(seconds) => Some(Duration::from_secs(seconds.into())),
        }
    }
}

/// What a write does when the record already exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecordExistsAction {
    /// Merge the written bins into the stored ones.
    #[default]
    Update,
    /// Overwrite the whole record; bins not written are dropped.
    Replace,
}

/// Governs how a `put` is applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WritePolicy {
    pub expiration: Expiration,
    pub record_exists_action: RecordExistsAction,
}

impl WritePolicy {
    pub fn new(expiration: Expiration) -> Self {
        Self {
            expiration,
            record_exists_action: RecordExistsAction::default(),
        }
    }
}

/// A record as returned by the database.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub bins: Bins,
    /// Remaining time-to-live; `None` if the record never expires.
    pub ttl: Option<Duration>,
}

/// The key-value database a [`SessionStore`](crate::store::SessionStore) writes to.
///
/// Implementations are shared handles: the store holds an `Arc` to one and
/// never manages its connections. Every method is a single round trip.
pub trait Database: Send + Sync + 'static {
    /// The namespace records are addressed in.
    fn namespace(&self) -> &str;

    /// Reads the record at `key`, `None` if it does not exist or has expired.
    fn get(&self, key: &Key) -> impl Future<Output = Result<Option<Record>>> + Send;

    /// Writes `bins` to `key` according to `policy`.
    fn put(
        &self,
        policy: &WritePolicy,
        key: &Key,
        bins: &Bins,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Deletes the record at `key`.
    ///
    /// Returns `true` if a record existed.
    fn delete(&self, key: &Key) -> impl Future<Output = Result<bool>> + Send;
}
