//! Live-server integration tests
//!
//! Expect a running server on localhost:8080. Run with: cargo test -- --ignored

use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Thirteen digits unique enough to not collide with earlier runs
fn unique_isbn() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    format!("978{:010}", nanos % 10_000_000_000)
}

async fn create_book(client: &Client, copies: i32) -> i64 {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({
            "title": "The Art of Computer Programming",
            "isbn": unique_isbn(),
            "published_year": "1968",
            "total_copies": copies
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["book_id"].as_i64().expect("No book_id in response")
}

async fn create_member(client: &Client) -> i64 {
    let response = client
        .post(format!("{}/members", BASE_URL))
        .json(&json!({ "name": "Donald", "member_type": "faculty" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["member_id"].as_i64().expect("No member_id in response")
}

#[tokio::test]
#[ignore]
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_borrow_then_return() {
    let client = Client::new();
    let book_id = create_book(&client, 1).await;
    let member_id = create_member(&client).await;

    let response = client
        .post(format!("{}/borrow", BASE_URL))
        .json(&json!({ "book_id": book_id, "member_id": member_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let borrowed: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(borrowed["available_copies"], 0);

    let response = client
        .post(format!("{}/return", BASE_URL))
        .json(&json!({ "borrowing_id": borrowed["borrowing_id"] }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let returned: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(returned["late_days"], 0);
    assert_eq!(returned["available_copies"], 1);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_borrows_never_oversell() {
    let client = Client::new();
    let book_id = create_book(&client, 2).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        let member_id = create_member(&client).await;
        handles.push(tokio::spawn(async move {
            client
                .post(format!("{}/borrow", BASE_URL))
                .json(&json!({ "book_id": book_id, "member_id": member_id }))
                .send()
                .await
                .expect("Failed to send request")
                .status()
        }));
    }

    let mut created: i64 = 0;
    for handle in handles {
        let status = handle.await.expect("task panicked");
        if status == StatusCode::CREATED {
            created += 1;
        } else {
            assert!(status == StatusCode::CONFLICT || status == StatusCode::SERVICE_UNAVAILABLE);
        }
    }
    assert!(created <= 2);

    let response = client
        .get(format!("{}/books/{}/availability", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["available_copies"], 2 - created);
}
