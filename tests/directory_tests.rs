//! # Directory Client Tests
//!
//! Runs the reqwest client against a mockito server.

use chrono::{TimeZone, Utc};
use mockito::Matcher;
use serde_json::json;

use recsys_bot::config::RetryConfig;
use recsys_bot::directory::{Directory, DirectoryClient};
use recsys_bot::directory_errors::DirectoryError;
use recsys_bot::profile_model::{
    ConversationMessage, Gender, NewConversation, UserLookup, UserRecord,
};

fn client_for(server: &mockito::ServerGuard) -> DirectoryClient {
    DirectoryClient::with_client(reqwest::Client::new(), &server.url(), RetryConfig::disabled())
}

fn fast_retries(max_retries: u32) -> RetryConfig {
    RetryConfig {
        max_retries,
        base_retry_delay_ms: 1,
        max_retry_delay_ms: 5,
    }
}

#[tokio::test]
async fn test_lookup_found_on_200() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/users/123/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"_id": 123, "name": "Alice"}"#)
        .create_async()
        .await;

    let lookup = client_for(&server).lookup_user(123).await.unwrap();

    assert_eq!(lookup, UserLookup::Found);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_lookup_not_found_on_404() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/users/456/")
        .with_status(404)
        .create_async()
        .await;

    let lookup = client_for(&server).lookup_user(456).await.unwrap();

    assert_eq!(lookup, UserLookup::NotFound);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_lookup_server_error_surfaces() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/users/1/")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let err = client_for(&server).lookup_user(1).await.unwrap_err();

    match err {
        DirectoryError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("Unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_errors_are_retried_until_exhausted() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/users/9/")
        .with_status(503)
        .expect(3)
        .create_async()
        .await;

    let client =
        DirectoryClient::with_client(reqwest::Client::new(), &server.url(), fast_retries(2));
    let err = client.lookup_user(9).await.unwrap_err();

    assert!(matches!(err, DirectoryError::Status { status: 503, .. }));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_create_user_posts_record() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/users/")
        .match_body(Matcher::PartialJson(json!({
            "_id": 123,
            "name": "Alice",
            "language": "ru",
            "launch_count": 0,
        })))
        .with_status(201)
        .with_body(r#"{"_id": 123}"#)
        .create_async()
        .await;

    let record = UserRecord::new(123, "Alice", "ru", "default", "1.0.0");
    let id = client_for(&server).create_user(&record).await.unwrap();

    assert_eq!(id, 123);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_create_full_user_sends_surname_and_gender() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/users/")
        .match_body(Matcher::PartialJson(json!({
            "_id": 7,
            "name": "Ivan",
            "surname": "Petrov",
            "gender": "male",
        })))
        .with_status(200)
        .create_async()
        .await;

    let record = UserRecord::new(7, "Ivan", "ru", "default", "1.0.0")
        .with_surname("Petrov")
        .with_gender(Gender::Male);
    client_for(&server).create_user(&record).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/users/")
        .with_status(422)
        .with_body("invalid")
        .expect(1)
        .create_async()
        .await;

    let client =
        DirectoryClient::with_client(reqwest::Client::new(), &server.url(), fast_retries(3));
    let record = UserRecord::new(1, "A", "ru", "default", "1.0.0");
    let err = client.create_user(&record).await.unwrap_err();

    assert!(matches!(err, DirectoryError::Status { status: 422, .. }));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_create_conversation_returns_id() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/conversations/")
        .match_body(Matcher::PartialJson(json!({
            "user_id": 123,
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"_id": "665f1c2ab4"}"#)
        .create_async()
        .await;

    let seed = NewConversation::seeded(123, Utc::now());
    let id = client_for(&server).create_conversation(&seed).await.unwrap();

    assert_eq!(id, "665f1c2ab4");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_create_conversation_without_id_is_an_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/conversations/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status": "created"}"#)
        .create_async()
        .await;

    let seed = NewConversation::seeded(123, Utc::now());
    let err = client_for(&server).create_conversation(&seed).await.unwrap_err();

    assert!(matches!(err, DirectoryError::MissingId));
}

#[tokio::test]
async fn test_append_message_posts_to_conversation() {
    let mut server = mockito::Server::new_async().await;
    let sent_at = Utc.with_ymd_and_hms(2025, 6, 22, 19, 52, 30).unwrap();
    let mock = server
        .mock("POST", "/conversations/abc/messages")
        .match_body(Matcher::Json(json!({
            "sender": "user",
            "text": "how do recommendations work?",
            "time": "2025-06-22T19:52:30.000Z",
        })))
        .with_status(200)
        .create_async()
        .await;

    let message = ConversationMessage::from_user("how do recommendations work?", sent_at);
    client_for(&server).append_message("abc", &message).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_service_is_a_transport_error() {
    // Nothing listens on port 1
    let client = DirectoryClient::with_client(
        reqwest::Client::new(),
        "http://127.0.0.1:1",
        RetryConfig::disabled(),
    );
    let err = client.lookup_user(1).await.unwrap_err();

    assert!(matches!(err, DirectoryError::Transport(_)));
    assert!(err.is_retryable());
}
