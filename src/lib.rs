//! # kvsession: session persistence on key-value databases
//!
//! `kvsession` stores web sessions as records of a key-value database and lets
//! the database expire them. It exposes exactly two operations:
//!
//! - [`SessionStore::get`] loads a session's fields by its identifier.
//! - [`SessionStore::set`] writes a session's fields with a time-to-live, or
//!   deletes the record when the session has no fields or was destroyed.
//!
//! Session IDs, cookies and request handling belong to the session framework
//! on top; the database client and its connections belong to the application.
//!
//! # Quick Start
//!
//! ```rust
//! use kvsession::{Session, SessionStore};
//! use kvsession::store::memory::MemoryDatabase;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     // The database handle is created and owned by the application.
//!     let db = Arc::new(MemoryDatabase::new("app"));
//!
//!     // Sessions go to the `sessions` set and live for one hour after each write.
//!     let store = SessionStore::new(db, "sessions", 3600);
//!
//!     let mut session = Session::empty("f3a9c1");
//!     session.insert("user_id", 42);
//!     session.insert("theme", "dark");
//!     store.set(session.id(), &session).await.unwrap();
//!
//!     let loaded = store.get("f3a9c1").await.unwrap();
//!     assert_eq!(loaded.bins(), session.bins());
//!
//!     // No fields left (or `destroy()`) means the record is deleted.
//!     session.destroy();
//!     store.set(session.id(), &session).await.unwrap();
//!     assert!(store.get("f3a9c1").await.unwrap_err().is_not_found());
//! }
//! ```
//!
//! # Databases
//!
//! Any type implementing [`store::Database`] can back a store. Three are provided,
//! each enabled by a feature flag.
//!
//! ## Memory
//! Always available. Records expire against a pluggable [`Clock`](store::memory::Clock),
//! which makes TTL behavior testable without sleeping.
//!
//! ## Redis
//! Requires the `redis-store` feature. Each record is a Redis hash; expiry uses
//! the key's TTL.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fred::clients::Client;
//! use kvsession::SessionStore;
//! use kvsession::store::redis::RedisDatabase;
//!
//! let client = Client::default();
//! let db = Arc::new(RedisDatabase::new(Arc::new(client), "app"));
//! let store = SessionStore::new(db, "sessions", 3600);
//! ```
//!
//! ## Postgres
//! Requires the `postgres-store` feature. One row per record, with expired rows
//! swept by a background task.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sqlx::PgPool;
//! use kvsession::SessionStore;
//! use kvsession::store::postgres::PostgresDatabaseBuilder;
//!
//! #[tokio::main]
//! async fn main() {
//!     let database_url = std::env::var("DATABASE_URL")
//!         .expect("DATABASE_URL must be set");
//!     let pool = PgPool::connect(&database_url).await.unwrap();
//!
//!     // This will also create the `t_session_records` table.
//!     let db = PostgresDatabaseBuilder::new(pool, true)
//!         .namespace("app")
//!         .build()
//!         .await
//!         .unwrap();
//!
//!     let store = SessionStore::new(Arc::new(db), "sessions", 3600);
//! }
//! ```
//!
//! ## Serialization
//! The Redis and Postgres databases encode bin values with one of:
//!
//! - [`bincode`](https://crates.io/crates/bincode) (default) - Fast, compact binary serialization.
//! - [`rmp-serde`](https://crates.io/crates/rmp-serde) (MessagePack) - Cross-language compatible serialization.
//!
//! ```toml
//! [dependencies]
//! kvsession = { version = "0.1", default-features = false, features = ["redis-store", "messagepack"] }
//! ```
//!
//! # Errors
//!
//! A missing or expired record is reported as [`store::Error::NotFound`]; treat
//! it as "no session". Every other error comes straight from the database and
//! is returned without retries.

#[cfg(feature = "redis-store")]
pub use fred;

#[cfg(feature = "postgres-store")]
pub use sqlx;

mod session;
pub use session::*;

pub mod store;
pub use store::{SessionStore, StoreOptions};
