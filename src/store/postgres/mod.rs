use crate::Bins;
use crate::store::{
    Database, Key, Record, RecordExistsAction, Result, WritePolicy, deserialize_value,
    ensure_bins, serialize_value,
};
use sqlx::{Executor, PgPool, Postgres};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::task::JoinHandle;

// Re-export Duration
pub use tokio::time::Duration;

/// A builder for creating a `PostgresDatabase`.
///
/// This allows for customizing the namespace, table and schema names used for
/// record storage.
#[derive(Debug)]
pub struct PostgresDatabaseBuilder {
    pool: PgPool,
    namespace: String,
    table_name: String,
    create_table: bool,
    schema_name: Option<String>,
    cleanup_interval: Option<Duration>,
    default_ttl: Option<Duration>,
}

impl PostgresDatabaseBuilder {
    /// Creates a new builder with a database pool and default settings.
    pub fn new(pool: PgPool, create_table: bool) -> Self {
        Self {
            pool,
            namespace: "default".to_string(),
            table_name: "t_session_records".to_string(),
            create_table,
            schema_name: None,
            cleanup_interval: None,
            default_ttl: None,
        }
    }

    /// Sets the namespace records are addressed in. Defaults to "default".
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets a custom table name. Defaults to "t_session_records".
    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    /// Sets a custom schema name.
    pub fn schema_name(mut self, schema_name: impl Into<String>) -> Self {
        self.schema_name = Some(schema_name.into());
        self
    }

    /// Sets the interval for the background task that deletes expired records.
    ///
    /// If this is not set, the cleanup task defaults to running every 5 minutes.
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = Some(interval);
        self
    }

    /// Sets the time-to-live applied to writes using the namespace default.
    ///
    /// Without one, such records never expire.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Builds the `PostgresDatabase`, creating the schema and table if requested.
    ///
    /// Must be called from within a tokio runtime, which runs the cleanup task.
    pub async fn build(self) -> std::result::Result<PostgresDatabase, sqlx::Error> {
        let table = if let Some(schema) = &self.schema_name {
            format!("\"{}\".\"{}\"", schema, self.table_name)
        } else {
            format!("\"{}\"", self.table_name)
        };

        if self.create_table {
            if let Some(schema) = &self.schema_name {
                sqlx::query(&format!("create schema if not exists \"{schema}\""))
                    .execute(&self.pool)
                    .await?;
            }

            sqlx::raw_sql(&format!(
                r#"
                create table if not exists {table} (
                    namespace text not null,
                    set_name text not null,
                    user_key text not null,
                    bins bytea not null,
                    expires_at timestamptz,
                    primary key (namespace, set_name, user_key)
                );
                create index if not exists "idx_{index}_expires_at" on {table}(expires_at);
                "#,
                index = self.table_name,
            ))
            .execute(&self.pool)
            .await?;
        }

        let interval = self.cleanup_interval.unwrap_or(Duration::from_secs(300));
        let sweeper = spawn_sweeper(self.pool.clone(), table.clone(), interval);

        Ok(PostgresDatabase {
            pool: self.pool,
            namespace: self.namespace,
            table,
            default_ttl: self.default_ttl,
            _sweeper: Arc::new(Sweeper(sweeper)),
        })
    }
}

fn spawn_sweeper(pool: PgPool, table: String, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let result = sqlx::query(&format!(
                "delete from {table} where expires_at is not null and expires_at < now()"
            ))
            .execute(&pool)
            .await;

            match result {
                Ok(done) if done.rows_affected() > 0 => {
                    tracing::debug!(removed = done.rows_affected(), "purged expired records");
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(err = %err, "failed to purge expired records"),
            }
        }
    })
}

/// Aborts the cleanup task, releasing its pool handle, once the last clone of
/// the database is dropped.
#[derive(Debug)]
struct Sweeper(JoinHandle<()>);

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// A Postgres database.
///
/// One row per record, with the bins encoded into a single `bytea` column by
/// the crate's codec. Expired rows are filtered out of every read and removed
/// periodically by the task started in [`PostgresDatabaseBuilder::build`],
/// which stops when the last clone of the database is dropped.
#[derive(Clone, Debug)]
pub struct PostgresDatabase {
    pool: PgPool,
    namespace: String,
    table: String,
    default_ttl: Option<Duration>,
    _sweeper: Arc<Sweeper>,
}

impl PostgresDatabase {
    async fn upsert<'e, E>(
        &self,
        executor: E,
        key: &Key,
        bins: &Bins,
        ttl: Option<f64>,
    ) -> Result<()>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let query = format!(
            r#"
            insert into {table} (namespace, set_name, user_key, bins, expires_at)
            values ($1, $2, $3, $4, now() + make_interval(secs => $5))
            on conflict (namespace, set_name, user_key) do update
            set
                bins = excluded.bins,
                expires_at = excluded.expires_at
            "#,
            table = self.table
        );

        sqlx::query(&query)
            .bind(key.namespace())
            .bind(key.set())
            .bind(key.user_key())
            .bind(serialize_value(bins)?)
            .bind(ttl)
            .execute(executor)
            .await?;

        Ok(())
    }
}

impl Database for PostgresDatabase {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn get(&self, key: &Key) -> Result<Option<Record>> {
        let query = format!(
            r#"
            select bins, expires_at
            from {table}
            where namespace = $1 and set_name = $2 and user_key = $3
              and (expires_at is null or expires_at > now())
            "#,
            table = self.table
        );

        let row: Option<(Vec<u8>, Option<OffsetDateTime>)> = sqlx::query_as(&query)
            .bind(key.namespace())
            .bind(key.set())
            .bind(key.user_key())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some((bins, expires_at)) => Ok(Some(Record {
                bins: deserialize_value(&bins)?,
                ttl: expires_at.map(|at| remaining(at, OffsetDateTime::now_utc())),
            })),
            None => Ok(None),
        }
    }

    async fn put(&self, policy: &WritePolicy, key: &Key, bins: &Bins) -> Result<()> {
        ensure_bins(bins)?;

        let ttl = policy
            .expiration
            .resolve(self.default_ttl)
            .map(|ttl| ttl.as_secs_f64());

        match policy.record_exists_action {
            RecordExistsAction::Replace => self.upsert(&self.pool, key, bins, ttl).await,
            RecordExistsAction::Update => {
                let mut tx = self.pool.begin().await?;

                let query = format!(
                    r#"
                    select bins
                    from {table}
                    where namespace = $1 and set_name = $2 and user_key = $3
                      and (expires_at is null or expires_at > now())
                    for update
                    "#,
                    table = self.table
                );
                let existing: Option<(Vec<u8>,)> = sqlx::query_as(&query)
                    .bind(key.namespace())
                    .bind(key.set())
                    .bind(key.user_key())
                    .fetch_optional(&mut *tx)
                    .await?;

                let mut merged: Bins = match existing {
                    Some((stored,)) => deserialize_value(&stored)?,
                    None => Bins::with_capacity(bins.len()),
                };
                merged.extend(bins.iter().map(|(k, v)| (k.clone(), v.clone())));

                self.upsert(&mut *tx, key, &merged, ttl).await?;
                tx.commit().await?;

                Ok(())
            }
        }
    }

    async fn delete(&self, key: &Key) -> Result<bool> {
        let query = format!(
            r#"
            delete from {table}
            where namespace = $1 and set_name = $2 and user_key = $3
            returning (expires_at is null or expires_at > now())
            "#,
            table = self.table
        );

        let live: Option<bool> = sqlx::query_scalar(&query)
            .bind(key.namespace())
            .bind(key.set())
            .bind(key.user_key())
            .fetch_optional(&self.pool)
            .await?;

        Ok(live.unwrap_or(false))
    }
}

fn remaining(expires_at: OffsetDateTime, now: OffsetDateTime) -> Duration {
    (expires_at - now).try_into().unwrap_or(Duration::ZERO)
}
