mod database;
pub use database::*;

mod session_store;
pub use session_store::*;

pub mod memory;

#[cfg(feature = "redis-store")]
pub mod redis;

#[cfg(feature = "postgres-store")]
pub mod postgres;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("record not found (session id: {id})")]
    NotFound { id: String },

    #[error("Encoding failed with: {0}")]
    Encode(String),

    #[error("Decoding failed with: {0}")]
    Decode(String),

    #[cfg(feature = "redis-store")]
    #[error(transparent)]
    Redis(#[from] fred::error::Error),

    #[cfg(feature = "postgres-store")]
    #[error(transparent)]
    Postgres(#[from] sqlx::Error),

    #[error("{0}")]
    Backend(String),
}

impl Error {
    /// Returns `true` when a session lookup found no record.
    ///
    /// Callers should treat this as "no session" rather than an
    /// infrastructure failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A record cannot exist without bins; writes must carry at least one.
pub(crate) fn ensure_bins(bins: &crate::Bins) -> Result<()> {
    if bins.is_empty() {
        return Err(Error::Backend("cannot write a record with no bins".to_string()));
    }
    Ok(())
}

#[cfg(all(
    any(feature = "redis-store", feature = "postgres-store"),
    feature = "bincode"
))]
pub(crate) fn serialize_value<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| Error::Encode(e.to_string()))
}

#[cfg(all(
    any(feature = "redis-store", feature = "postgres-store"),
    feature = "bincode"
))]
pub(crate) fn deserialize_value<T: serde::de::DeserializeOwned>(value: &[u8]) -> Result<T> {
    bincode::serde::decode_from_slice(value, bincode::config::standard())
        .map(|(value, _)| value)
        .map_err(|e| Error::Decode(e.to_string()))
}

#[cfg(all(
    any(feature = "redis-store", feature = "postgres-store"),
    feature = "messagepack",
    not(feature = "bincode")
))]
pub(crate) fn serialize_value<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    rmp_serde::to_vec(value).map_err(|e| Error::Encode(e.to_string()))
}

#[cfg(all(
    any(feature = "redis-store", feature = "postgres-store"),
    feature = "messagepack",
    not(feature = "bincode")
))]
pub(crate) fn deserialize_value<T: serde::de::DeserializeOwned>(value: &[u8]) -> Result<T> {
    rmp_serde::from_slice(value).map_err(|e| Error::Decode(e.to_string()))
}
