#![cfg(feature = "redis-store")]

mod common;

#[cfg(test)]
mod tests {
    use super::*;

    use common::*;
    use fred::{
        clients::Client,
        interfaces::{ClientLike, LuaInterface},
    };
    use kvsession::store::redis::RedisDatabase;
    use kvsession::store::{Database, Expiration, Key, RecordExistsAction, WritePolicy};
    use kvsession::{Session, SessionStore};
    use std::sync::Arc;
    use std::time::Duration;

    const TTL: u32 = 15;

    async fn connect() -> Arc<Client> {
        let client = Client::default();
        client.connect();
        client.wait_for_connect().await.unwrap();
        Arc::new(client)
    }

    async fn setup_redis() -> Arc<RedisDatabase<Client>> {
        Arc::new(RedisDatabase::new(connect().await, "kvsession_test"))
    }

    fn unique_id(prefix: &str) -> String {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        format!("{prefix}-{nanos}")
    }

    #[tokio::test]
    async fn test_redis_session_lifecycle() {
        let store = SessionStore::new(setup_redis().await, "sessions", TTL);
        let id = unique_id("lifecycle");
        let session = create_test_session(&id);

        // Missing
        let err = store.get(&id).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains(&id));

        // Round trip
        store.set(&id, &session).await.unwrap();
        let loaded = store.get(&id).await.unwrap();
        assert_eq!(loaded.bins(), session.bins());

        // Overwrite
        store.set(&id, &session_with(&id, &[("b", 2)])).await.unwrap();
        let loaded = store.get(&id).await.unwrap();
        assert_eq!(loaded.bins(), &bins(&[("b", 2)]));

        // Delete, twice
        store.set(&id, &Session::empty(id.as_str())).await.unwrap();
        store.set(&id, &Session::empty(id.as_str())).await.unwrap();
        assert!(store.get(&id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_redis_write_resets_ttl() {
        let db = setup_redis().await;
        let store = SessionStore::new(Arc::clone(&db), "sessions", TTL);
        let id = unique_id("ttl");
        let key = Key::new("kvsession_test", "sessions", id.as_str());

        store.set(&id, &session_with(&id, &[("a", 1)])).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        let ttl = db.get(&key).await.unwrap().unwrap().ttl.unwrap();
        assert!(ttl < Duration::from_secs(TTL.into()));

        store.set(&id, &session_with(&id, &[("a", 2)])).await.unwrap();
        let ttl = db.get(&key).await.unwrap().unwrap().ttl.unwrap();
        assert_eq!(ttl, Duration::from_secs(TTL.into()));

        store.set(&id, &Session::empty(id.as_str())).await.unwrap();
    }

    #[tokio::test]
    async fn test_redis_record_expires() {
        let store = SessionStore::new(setup_redis().await, "sessions", 1);
        let id = unique_id("expire");

        store.set(&id, &session_with(&id, &[("a", 1)])).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(store.get(&id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_redis_update_merges_and_persists() {
        let db = setup_redis().await;
        let key = Key::new("kvsession_test", "sessions", unique_id("merge"));

        let mut policy = WritePolicy::new(Expiration::Never);
        policy.record_exists_action = RecordExistsAction::Update;

        db.put(&policy, &key, &bins(&[("a", 1)])).await.unwrap();
        db.put(&policy, &key, &bins(&[("b", 2)])).await.unwrap();

        let record = db.get(&key).await.unwrap().unwrap();
        assert_eq!(record.bins, bins(&[("a", 1), ("b", 2)]));
        assert_eq!(record.ttl, None);

        assert!(db.delete(&key).await.unwrap());
        assert!(!db.delete(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_redis_survives_script_flush() {
        let client = connect().await;
        let db = Arc::new(RedisDatabase::new(Arc::clone(&client), "kvsession_test"));
        let store = SessionStore::new(db, "sessions", TTL);
        let id = unique_id("flush");

        store.set(&id, &session_with(&id, &[("a", 1)])).await.unwrap();
        assert_eq!(store.get(&id).await.unwrap().bins(), &bins(&[("a", 1)]));

        client.script_flush(false).await.unwrap();
        assert_eq!(store.get(&id).await.unwrap().bins(), &bins(&[("a", 1)]));

        client.script_flush(false).await.unwrap();
        store.set(&id, &session_with(&id, &[("b", 2)])).await.unwrap();
        assert_eq!(store.get(&id).await.unwrap().bins(), &bins(&[("b", 2)]));

        store.set(&id, &Session::empty(id.as_str())).await.unwrap();
    }

    #[tokio::test]
    async fn test_redis_zero_seconds_is_already_expired() {
        let db = setup_redis().await;
        let key = Key::new("kvsession_test", "sessions", unique_id("zero"));

        for action in [RecordExistsAction::Replace, RecordExistsAction::Update] {
            let mut live = WritePolicy::new(Expiration::Seconds(TTL));
            live.record_exists_action = action;
            let mut zero = WritePolicy::new(Expiration::Seconds(0));
            zero.record_exists_action = action;

            db.put(&live, &key, &bins(&[("a", 1)])).await.unwrap();
            db.put(&zero, &key, &bins(&[("b", 2)])).await.unwrap();
            assert!(db.get(&key).await.unwrap().is_none());
        }
    }
}
