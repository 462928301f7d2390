use kvsession::{Bins, Session, Value};
use std::collections::BTreeMap;

pub fn create_test_session(id: &str) -> Session {
    let mut preferences = BTreeMap::new();
    preferences.insert("theme".to_string(), Value::from("dark"));
    preferences.insert("language".to_string(), Value::from("en"));

    let mut session = Session::empty(id);
    session.insert("user_id", 1);
    session.insert("name", "Test User");
    session.insert("admin", false);
    session.insert("score", 4.5);
    session.insert("avatar", vec![0u8, 159, 146, 150]);
    session.insert("roles", vec![Value::from("reader"), Value::from("writer")]);
    session.insert("preferences", preferences);
    session
}

pub fn session_with(id: &str, pairs: &[(&str, i64)]) -> Session {
    Session::new(id, bins(pairs))
}

pub fn bins(pairs: &[(&str, i64)]) -> Bins {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), Value::Int(*value)))
        .collect()
}
