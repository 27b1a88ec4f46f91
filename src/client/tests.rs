use super::Client;
use tokio::sync::mpsc;
use tungstenite::protocol::Message as WsMessage;

#[test]
fn test_client_new() {
    let (tx, _) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(tx);
    assert!(!client.id.is_empty());
    assert!(client.topics.is_empty());
    assert!(client.connected_at > 0);
}

#[test]
fn test_client_ids_are_unique() {
    let (tx, _) = mpsc::unbounded_channel::<WsMessage>();
    let a = Client::new(tx.clone());
    let b = Client::new(tx);
    assert_ne!(a.id, b.id);
}

#[test]
fn test_client_with_id() {
    let (tx, _) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::with_id("conn-1", tx);
    assert_eq!(client.id, "conn-1");
}
