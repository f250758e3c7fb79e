//! Username uniqueness is a check-then-act against the role partitions only.
//!
//! Nothing reserves a username between the availability check and the admin
//! accepting the registration, so two applicants can end up with the same
//! username. These tests pin that behaviour down.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::{Method, StatusCode};

use salon_integration_tests::TestApp;

#[tokio::test]
async fn test_concurrent_requests_both_pass_the_check() {
    let app = TestApp::new();

    let (first, second) = tokio::join!(
        app.post(
            "/auth/otp/send",
            TestApp::signup_form("alice@one.com", "alice123", "ContentCreator"),
        ),
        app.post(
            "/auth/otp/send",
            TestApp::signup_form("alice@two.com", "ALICE123", "MarketingLead"),
        ),
    );

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(second.status, StatusCode::OK);
    let pending = app.store.snapshot().unwrap()["OTPVerification"].clone();
    assert_eq!(pending.as_object().unwrap().len(), 2);
}

#[tokio::test]
async fn test_both_registrations_can_be_accepted() {
    let app = TestApp::new();
    app.register("alice@one.com", "alice123", "ContentCreator").await;
    app.register("alice@two.com", "alice123", "MarketingLead").await;

    let admin = app.admin_token();
    let listing = app
        .request(Method::GET, "/admin/approvals", None, Some(&admin))
        .await;
    let keys: Vec<String> = listing
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["key"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(keys.len(), 2);

    for key in &keys {
        let accepted = app
            .request(
                Method::POST,
                &format!("/admin/approvals/{key}/accept"),
                None,
                Some(&admin),
            )
            .await;
        assert_eq!(accepted.body["outcome"], "accepted");
    }

    let accounts = app
        .request(Method::GET, "/admin/accounts", None, Some(&admin))
        .await;
    let usernames: Vec<&str> = accounts
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["account"]["username"].as_str().unwrap())
        .collect();
    assert_eq!(usernames, ["alice123", "alice123"]);
}

#[tokio::test]
async fn test_taken_once_approved() {
    let app = TestApp::new();
    app.register("alice@one.com", "alice123", "ContentCreator").await;

    let admin = app.admin_token();
    let listing = app
        .request(Method::GET, "/admin/approvals", None, Some(&admin))
        .await;
    let key = listing.body[0]["key"].as_str().unwrap().to_string();
    app.request(
        Method::POST,
        &format!("/admin/approvals/{key}/accept"),
        None,
        Some(&admin),
    )
    .await;

    let response = app
        .post(
            "/auth/otp/send",
            TestApp::signup_form("alice@two.com", "ALICE123", "GraphicDesigner"),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "USERNAME_TAKEN");
    assert_eq!(response.body["message"], "Username is already taken");
}
