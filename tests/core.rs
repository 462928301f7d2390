mod common;

#[cfg(test)]
mod tests {
    use super::*;

    use common::*;
    use kvsession::store::memory::{ManualClock, MemoryDatabase};
    use kvsession::store::{Database, Error, Key, Record, Result, WritePolicy};
    use kvsession::{Bins, Session, SessionStore};
    use std::sync::Arc;
    use std::time::Duration;

    const TTL: u32 = 60;

    fn create_store() -> (SessionStore<MemoryDatabase<ManualClock>>, ManualClock) {
        let clock = ManualClock::new();
        let db = Arc::new(MemoryDatabase::with_clock("test", clock.clone()));
        (SessionStore::new(db, "sessions", TTL), clock)
    }

    async fn remaining_ttl<D: Database>(store: &SessionStore<D>, id: &str) -> Option<Duration> {
        let key = Key::new(store.database().namespace(), store.set_name(), id);
        store.database().get(&key).await.unwrap().unwrap().ttl
    }

    #[tokio::test]
    async fn test_session_round_trip() {
        let (store, _) = create_store();
        let session = create_test_session("round-trip");

        store.set("round-trip", &session).await.unwrap();

        let loaded = store.get("round-trip").await.unwrap();
        assert_eq!(loaded.id(), "round-trip");
        assert_eq!(loaded.bins(), session.bins());
    }

    #[tokio::test]
    async fn test_empty_set_deletes_session() {
        let (store, _) = create_store();

        store
            .set("to-delete", &session_with("to-delete", &[("a", 1)]))
            .await
            .unwrap();
        store
            .set("to-delete", &Session::empty("to-delete"))
            .await
            .unwrap();

        let err = store.get("to-delete").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_destroyed_session_is_deleted() {
        let (store, _) = create_store();
        let mut session = create_test_session("destroyed");

        store.set("destroyed", &session).await.unwrap();
        session.destroy();
        store.set("destroyed", &session).await.unwrap();

        assert!(store.get("destroyed").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_every_write_resets_ttl() {
        let (store, clock) = create_store();
        let ttl = Duration::from_secs(TTL.into());

        store
            .set("ttl", &session_with("ttl", &[("a", 1)]))
            .await
            .unwrap();
        assert_eq!(remaining_ttl(&store, "ttl").await, Some(ttl));

        clock.advance(Duration::from_secs(45));
        assert_eq!(
            remaining_ttl(&store, "ttl").await,
            Some(ttl - Duration::from_secs(45))
        );

        store
            .set("ttl", &session_with("ttl", &[("a", 2)]))
            .await
            .unwrap();
        assert_eq!(remaining_ttl(&store, "ttl").await, Some(ttl));

        // would have expired without the second write
        clock.advance(Duration::from_secs(30));
        assert!(store.get("ttl").await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_session_is_not_found() {
        let (store, clock) = create_store();

        store
            .set("expiring", &session_with("expiring", &[("a", 1)]))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(TTL.into()));

        let err = store.get("expiring").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_missing_session_error_contains_id() {
        let (store, _) = create_store();

        let err = store.get("never-written-7f2c").await.unwrap_err();
        assert!(matches!(&err, Error::NotFound { id } if id == "never-written-7f2c"));
        assert!(err.to_string().contains("never-written-7f2c"));
    }

    #[tokio::test]
    async fn test_set_overwrites_whole_record() {
        let (store, _) = create_store();

        store
            .set("overwrite", &session_with("overwrite", &[("a", 1)]))
            .await
            .unwrap();
        store
            .set("overwrite", &session_with("overwrite", &[("b", 2)]))
            .await
            .unwrap();

        let loaded = store.get("overwrite").await.unwrap();
        assert_eq!(loaded.bins(), &bins(&[("b", 2)]));
        assert!(loaded.get("a").is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (store, _) = create_store();

        store
            .set("idempotent", &session_with("idempotent", &[("a", 1)]))
            .await
            .unwrap();
        store
            .set("idempotent", &Session::empty("idempotent"))
            .await
            .unwrap();
        store
            .set("idempotent", &Session::empty("idempotent"))
            .await
            .unwrap();
        store
            .set("never-existed", &Session::empty("never-existed"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sets_are_isolated() {
        let clock = ManualClock::new();
        let db = Arc::new(MemoryDatabase::with_clock("test", clock));
        let web = SessionStore::new(Arc::clone(&db), "web", TTL);
        let api = SessionStore::new(Arc::clone(&db), "api", TTL);

        web.set("shared-id", &session_with("shared-id", &[("web", 1)]))
            .await
            .unwrap();

        assert!(api.get("shared-id").await.unwrap_err().is_not_found());
        assert_eq!(db.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_sessions_are_independent() {
        let (store, _) = create_store();

        let handles = (0..32)
            .map(|n| {
                let store = store.clone();
                tokio::spawn(async move {
                    let id = format!("session-{n}");
                    store
                        .set(&id, &session_with(&id, &[("n", n)]))
                        .await
                        .unwrap();
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            handle.await.unwrap();
        }

        for n in 0..32 {
            let loaded = store.get(&format!("session-{n}")).await.unwrap();
            assert_eq!(loaded.bins(), &bins(&[("n", n)]));
        }
    }

    // A database whose every call fails the way a dropped connection would.
    #[derive(Debug)]
    struct UnreachableDatabase;

    impl Database for UnreachableDatabase {
        fn namespace(&self) -> &str {
            "test"
        }

        async fn get(&self, _key: &Key) -> Result<Option<Record>> {
            Err(Error::Backend("connection refused".to_string()))
        }

        async fn put(&self, _policy: &WritePolicy, _key: &Key, _bins: &Bins) -> Result<()> {
            Err(Error::Backend("connection refused".to_string()))
        }

        async fn delete(&self, _key: &Key) -> Result<bool> {
            Err(Error::Backend("connection reset".to_string()))
        }
    }

    #[tokio::test]
    async fn test_database_errors_pass_through() {
        let store = SessionStore::new(Arc::new(UnreachableDatabase), "sessions", TTL);

        let err = store.get("any").await.unwrap_err();
        assert!(matches!(&err, Error::Backend(msg) if msg == "connection refused"));
        assert!(!err.is_not_found());

        let err = store
            .set("any", &session_with("any", &[("a", 1)]))
            .await
            .unwrap_err();
        assert!(matches!(&err, Error::Backend(msg) if msg == "connection refused"));

        let err = store.set("any", &Session::empty("any")).await.unwrap_err();
        assert!(matches!(&err, Error::Backend(msg) if msg == "connection reset"));
    }
}
