//! History Store Integration Tests
//!
//! Covers the get-or-create / append / clear contract for per-user
//! conversation history, including the full append-append-clear scenario.

use tempfile::TempDir;

use voxbot::domain::ChatMessage;
use voxbot::history::{HistoryStore, MESSAGES_FIELD};

#[tokio::test]
async fn test_get_or_create_inserts_empty_record() {
    let temp = TempDir::new().unwrap();
    let store = HistoryStore::open(temp.path().join("history.jsonl"))
        .await
        .unwrap();

    let user = store.find_or_create_user("u1").await.unwrap();

    assert_eq!(user.id, "u1");
    assert!(user.messages().unwrap().is_empty());
}

#[tokio::test]
async fn test_append_append_clear_scenario() {
    let temp = TempDir::new().unwrap();
    let store = HistoryStore::open(temp.path().join("history.jsonl"))
        .await
        .unwrap();

    // First append on a user with no prior messages field creates it as a
    // singleton
    let after_first = store
        .append_to_array_field(
            "u1",
            MESSAGES_FIELD,
            serde_json::json!({"role": "user", "content": "hi"}),
        )
        .await
        .unwrap();
    assert_eq!(
        after_first.messages().unwrap(),
        vec![ChatMessage::user("hi")]
    );

    // Second append preserves insertion order
    let after_second = store
        .append_to_array_field(
            "u1",
            MESSAGES_FIELD,
            serde_json::json!({"role": "assistant", "content": "hello"}),
        )
        .await
        .unwrap();
    assert_eq!(
        after_second.messages().unwrap(),
        vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")]
    );

    // Clear empties the field but keeps the record
    let cleared = store.clear_array_field("u1", MESSAGES_FIELD).await.unwrap();
    assert_eq!(cleared.id, "u1");
    assert!(cleared.messages().unwrap().is_empty());
}

#[tokio::test]
async fn test_typed_turn_sequence() {
    let temp = TempDir::new().unwrap();
    let store = HistoryStore::open(temp.path().join("history.jsonl"))
        .await
        .unwrap();

    // The two-append shape of one conversation turn
    let updated = store
        .append_message("42", ChatMessage::user("What is Rust?"))
        .await
        .unwrap();
    assert_eq!(updated.messages().unwrap().len(), 1);

    store
        .append_message("42", ChatMessage::assistant("A systems language."))
        .await
        .unwrap();

    let user = store.find_or_create_user("42").await.unwrap();
    let messages = user.messages().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "What is Rust?");
    assert_eq!(messages[1].content, "A systems language.");
}

#[tokio::test]
async fn test_users_are_independent() {
    let temp = TempDir::new().unwrap();
    let store = HistoryStore::open(temp.path().join("history.jsonl"))
        .await
        .unwrap();

    store
        .append_message("a", ChatMessage::user("from a"))
        .await
        .unwrap();
    store
        .append_message("b", ChatMessage::user("from b"))
        .await
        .unwrap();
    store.clear_messages("a").await.unwrap();

    let a = store.find_or_create_user("a").await.unwrap();
    let b = store.find_or_create_user("b").await.unwrap();

    assert!(a.messages().unwrap().is_empty());
    assert_eq!(b.messages().unwrap(), vec![ChatMessage::user("from b")]);
}

#[tokio::test]
async fn test_concurrent_appends_all_land() {
    let temp = TempDir::new().unwrap();
    let store = std::sync::Arc::new(
        HistoryStore::open(temp.path().join("history.jsonl"))
            .await
            .unwrap(),
    );

    let mut handles = Vec::new();
    for i in 0..10 {
        let store = std::sync::Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .append_message("u1", ChatMessage::user(format!("msg {}", i)))
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let user = store.find_or_create_user("u1").await.unwrap();
    assert_eq!(user.messages().unwrap().len(), 10);
}
