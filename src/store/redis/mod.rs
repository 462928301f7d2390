mod lua;

use crate::Bins;
use crate::store::redis::lua::{
    GET_SCRIPT, GET_SCRIPT_HASH, REPLACE_SCRIPT, REPLACE_SCRIPT_HASH, UPDATE_SCRIPT,
    UPDATE_SCRIPT_HASH,
};
use crate::store::{
    Database, Error, Key, Record, RecordExistsAction, Result, WritePolicy, deserialize_value,
    ensure_bins, serialize_value,
};
use fred::clients::Pool;
use fred::interfaces::{KeysInterface, LuaInterface};
use fred::types::{FromValue, Key as RedisKey, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// A Redis database.
///
/// Each record is a Redis hash at `"{namespace}:{set}:{user_key}"`, one hash
/// field per bin, with bin values encoded by the crate's codec. Expiry uses
/// the key's own TTL. Reads and writes each run as a single Lua script so a
/// record is never observed half written. Scripts are sent by SHA1 and loaded
/// on demand whenever the server answers `NOSCRIPT`, so a restarted or flushed
/// server, or several servers behind one process, all work.
#[derive(Clone, Debug)]
pub struct RedisDatabase<C: KeysInterface + LuaInterface + Clone + Send + Sync = Pool> {
    client: Arc<C>,
    namespace: String,
    default_ttl: Option<Duration>,
}

impl<C> RedisDatabase<C>
where
    C: KeysInterface + LuaInterface + Clone + Send + Sync,
{
    pub fn new(client: Arc<C>, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            default_ttl: None,
        }
    }

    /// Sets the time-to-live, in seconds, applied to writes using the
    /// namespace default. Without one, such records never expire.
    pub fn default_ttl(mut self, seconds: u32) -> Self {
        self.default_ttl = (seconds > 0).then(|| Duration::from_secs(seconds.into()));
        self
    }
}

impl From<&Key> for RedisKey {
    fn from(value: &Key) -> Self {
        value.to_string().into()
    }
}

impl<C> Database for RedisDatabase<C>
where
    C: KeysInterface + LuaInterface + Clone + Send + Sync + 'static,
{
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn get(&self, key: &Key) -> Result<Option<Record>> {
        let reply: Value = eval_script(
            self.client.as_ref(),
            &GET_SCRIPT_HASH,
            GET_SCRIPT,
            key,
            Vec::new(),
        )
        .await?;

        parse_record(reply)
    }

    async fn put(&self, policy: &WritePolicy, key: &Key, bins: &Bins) -> Result<()> {
        ensure_bins(bins)?;

        let (cell, script) = match policy.record_exists_action {
            RecordExistsAction::Replace => (&REPLACE_SCRIPT_HASH, REPLACE_SCRIPT),
            RecordExistsAction::Update => (&UPDATE_SCRIPT_HASH, UPDATE_SCRIPT),
        };

        let seconds = policy
            .expiration
            .resolve(self.default_ttl)
            .map(|ttl| ttl.as_secs() as i64)
            .unwrap_or(-1);

        let mut args: Vec<Value> = Vec::with_capacity(1 + bins.len() * 2);
        args.push(Value::Integer(seconds));
        for (field, value) in bins {
            args.push(field.as_str().into());
            args.push(serialize_value(value)?.as_slice().into());
        }

        let _: i64 = eval_script(self.client.as_ref(), cell, script, key, args).await?;

        Ok(())
    }

    async fn delete(&self, key: &Key) -> Result<bool> {
        let deleted: i64 = self.client.del(key).await?;
        Ok(deleted > 0)
    }
}

async fn script_hash<'a>(once_cell: &'a OnceCell<String>, script: &str) -> &'a String {
    once_cell
        .get_or_init(|| async { fred::util::sha1_hash(script) })
        .await
}

/// Runs `script` by hash, loading it and retrying once if the server has
/// no copy of it.
async fn eval_script<C, R>(
    client: &C,
    once_cell: &OnceCell<String>,
    script: &str,
    key: &Key,
    args: Vec<Value>,
) -> Result<R>
where
    C: LuaInterface + Send + Sync,
    R: FromValue + Send,
{
    let hash = script_hash(once_cell, script).await;
    let keys = vec![RedisKey::from(key)];

    match client.evalsha(hash.as_str(), keys.clone(), args.clone()).await {
        Err(err) if is_missing_script(&err) => {
            tracing::debug!(hash = %hash, "script not cached by server, loading");
            let _: () = client.script_load(script).await?;
            Ok(client.evalsha(hash.as_str(), keys, args).await?)
        }
        result => Ok(result?),
    }
}

fn is_missing_script(err: &fred::error::Error) -> bool {
    err.details().starts_with("NOSCRIPT")
}

fn parse_record(reply: Value) -> Result<Option<Record>> {
    let mut items = match reply {
        Value::Null => return Ok(None),
        Value::Array(items) => items.into_iter(),
        other => return Err(Error::Decode(format!("unexpected record reply: {other:?}"))),
    };

    let ttl = items
        .next()
        .and_then(|ttl| ttl.as_i64())
        .ok_or_else(|| Error::Decode("record reply is missing its ttl".to_string()))?;

    let mut bins = Bins::with_capacity(items.len() / 2);
    while let Some(field) = items.next() {
        let name = field
            .as_string()
            .ok_or_else(|| Error::Decode(format!("invalid bin name: {field:?}")))?;
        let value = items
            .next()
            .ok_or_else(|| Error::Decode(format!("bin {name} has no value")))?;
        let bytes = value
            .as_bytes()
            .ok_or_else(|| Error::Decode(format!("bin {name} is not binary")))?;

        bins.insert(name, deserialize_value(bytes)?);
    }

    Ok(Some(Record {
        bins,
        ttl: (ttl >= 0).then(|| Duration::from_secs(ttl as u64)),
    }))
}
