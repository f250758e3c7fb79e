//! The registration lifecycle end to end, checked against the stored records.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::{Method, StatusCode};
use serde_json::json;

use salon_core::{Email, StorageKey};
use salon_integration_tests::TestApp;

const BOB: &str = "bob@gmail.com";

#[tokio::test]
async fn test_bob_registers_and_is_accepted() {
    let app = TestApp::new();
    let key = StorageKey::from_email(BOB);

    // Request: pending record at the sanitized key
    let sent = app
        .post("/auth/otp/send", TestApp::signup_form(BOB, "bobstone", "ContentCreator"))
        .await;
    assert_eq!(sent.status, StatusCode::OK);
    assert_eq!(sent.body, json!({"email": BOB, "expiresIn": "10 minutes"}));

    let tree = app.store.snapshot().unwrap();
    let pending = &tree["OTPVerification"][key.as_str()];
    let code = pending["otpCode"].as_str().unwrap();
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(
        pending["otpExpiresAt"].as_i64().unwrap() - pending["createdAt"].as_i64().unwrap(),
        600_000
    );
    assert_eq!(pending["verified"], false);
    assert_eq!(pending["role"], "ContentCreator");
    assert!(pending["passwordHash"].as_str().unwrap().starts_with("$argon2"));
    assert_eq!(app.sender.last_code_for(BOB).as_deref(), Some(code));

    // Verify
    let verified = app
        .post("/auth/otp/verify", json!({"email": BOB, "otp": code}))
        .await;
    assert_eq!(verified.status, StatusCode::OK);
    assert_eq!(verified.body, json!({"email": BOB, "verified": true}));
    let tree = app.store.snapshot().unwrap();
    assert_eq!(tree["OTPVerification"][key.as_str()]["verified"], true);

    // Complete: approval record written, pending record gone
    let completed = app.post("/auth/register/complete", TestApp::contact_form(BOB)).await;
    assert_eq!(completed.status, StatusCode::CREATED);
    assert!(completed.body["token"].as_str().is_some());
    assert_eq!(completed.body["user"]["username"], "bobstone");
    assert_eq!(completed.body["user"]["role"], "ContentCreator");
    assert!(completed.body["user"].get("passwordHash").is_none());

    let tree = app.store.snapshot().unwrap();
    assert!(tree.get("OTPVerification").is_none());
    let approvals = tree["ApprovalofAccounts"].as_object().unwrap();
    assert_eq!(approvals.len(), 1);
    let (approval_key, record) = approvals.iter().next().unwrap();
    assert_eq!(record["role"], "ContentCreator");
    assert_eq!(record["city"], "Austin");

    // Accept: account in the ContentCreator partition, approval gone
    let admin = app.admin_token();
    let accepted = app
        .request(
            Method::POST,
            &format!("/admin/approvals/{approval_key}/accept"),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(accepted.status, StatusCode::OK);
    assert_eq!(
        accepted.body,
        json!({"outcome": "accepted", "role": "ContentCreator", "username": "bobstone"})
    );

    let tree = app.store.snapshot().unwrap();
    assert!(tree.get("ApprovalofAccounts").is_none());
    let account = &tree["ContentCreator"][approval_key.as_str()];
    assert_eq!(account["username"], "bobstone");
    assert_eq!(account["email"], BOB);

    // And Bob can now log in
    let token = app.login("bobstone", salon_integration_tests::TEST_PASSWORD).await;
    let claims = app.state.tokens().validate(&token).unwrap();
    assert_eq!(claims.id, "bobstone");
    assert_eq!(claims.role.as_str(), "ContentCreator");
}

#[tokio::test]
async fn test_verify_is_idempotent() {
    let app = TestApp::new();
    app.post("/auth/otp/send", TestApp::signup_form(BOB, "bobstone", "ContentCreator"))
        .await;
    let code = app.sender.last_code_for(BOB).unwrap();

    for _ in 0..2 {
        let verified = app
            .post("/auth/otp/verify", json!({"email": BOB, "otp": code}))
            .await;
        assert_eq!(verified.status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_wrong_code_is_a_mismatch() {
    let app = TestApp::new();
    app.post("/auth/otp/send", TestApp::signup_form(BOB, "bobstone", "ContentCreator"))
        .await;
    let code: u32 = app.sender.last_code_for(BOB).unwrap().parse().unwrap();
    let wrong = if code == 999_999 { 100_000 } else { code + 1 };

    let response = app
        .post("/auth/otp/verify", json!({"email": BOB, "otp": wrong.to_string()}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "CODE_MISMATCH");
}

#[tokio::test]
async fn test_new_request_replaces_old_code() {
    let app = TestApp::new();
    let form = TestApp::signup_form(BOB, "bobstone", "ContentCreator");

    app.post("/auth/otp/send", form.clone()).await;
    let first = app.sender.last_code_for(BOB).unwrap();
    app.post("/auth/otp/send", form).await;
    let second = app.sender.last_code_for(BOB).unwrap();
    assert_eq!(app.sender.sent_count(), 2);

    let stored = app.store.snapshot().unwrap()["OTPVerification"]
        [StorageKey::from_email(BOB).as_str()]["otpCode"]
        .clone();
    assert_eq!(stored, second.as_str());

    if first != second {
        let response = app
            .post("/auth/otp/verify", json!({"email": BOB, "otp": first}))
            .await;
        assert_eq!(response.body["code"], "CODE_MISMATCH");
    }
}

#[tokio::test]
async fn test_complete_before_verify() {
    let app = TestApp::new();
    app.post("/auth/otp/send", TestApp::signup_form(BOB, "bobstone", "ContentCreator"))
        .await;

    let response = app.post("/auth/register/complete", TestApp::contact_form(BOB)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "NOT_VERIFIED");
}

#[tokio::test]
async fn test_steps_after_completion_find_no_request() {
    let app = TestApp::new();
    app.register(BOB, "bobstone", "ContentCreator").await;
    let code = app.sender.last_code_for(BOB).unwrap();

    let verify = app
        .post("/auth/otp/verify", json!({"email": BOB, "otp": code}))
        .await;
    assert_eq!(verify.body["code"], "NO_SUCH_REQUEST");

    let complete = app.post("/auth/register/complete", TestApp::contact_form(BOB)).await;
    assert_eq!(complete.body["code"], "NO_SUCH_REQUEST");
}

#[tokio::test]
async fn test_lookalike_emails_do_not_collide() {
    let app = TestApp::new();
    app.post("/auth/otp/send", TestApp::signup_form("a.b@x.com", "dotted", "MarketingLead"))
        .await;
    app.post("/auth/otp/send", TestApp::signup_form("a_b@x.com", "underscored", "GraphicDesigner"))
        .await;

    let tree = app.store.snapshot().unwrap();
    let pending = tree["OTPVerification"].as_object().unwrap();
    assert_eq!(pending.len(), 2);

    for (email, username) in [("a.b@x.com", "dotted"), ("a_b@x.com", "underscored")] {
        let key = StorageKey::from_email(Email::parse(email).unwrap().as_str());
        assert_eq!(pending[key.as_str()]["username"], username);
    }
}

#[tokio::test]
async fn test_reject_discards_registration() {
    let app = TestApp::new();
    app.register(BOB, "bobstone", "ContentCreator").await;
    let admin = app.admin_token();

    let listing = app
        .request(Method::GET, "/admin/approvals", None, Some(&admin))
        .await;
    assert_eq!(listing.status, StatusCode::OK);
    let key = listing.body[0]["key"].as_str().unwrap().to_string();
    assert_eq!(listing.body[0]["record"]["username"], "bobstone");
    assert!(listing.body[0]["record"].get("passwordHash").is_none());

    let path = format!("/admin/approvals/{key}/reject");
    let rejected = app.request(Method::POST, &path, None, Some(&admin)).await;
    assert_eq!(rejected.body, json!({"outcome": "rejected"}));

    let again = app.request(Method::POST, &path, None, Some(&admin)).await;
    assert_eq!(again.body, json!({"outcome": "alreadyResolved"}));

    let accounts = app
        .request(Method::GET, "/admin/accounts", None, Some(&admin))
        .await;
    assert_eq!(accounts.body, json!([]));
}
