//! Integration tests for the salon account server.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p salon-integration-tests
//! ```
//!
//! Tests drive the full router (middleware included) in-process against the
//! in-memory store, with a sender that records codes instead of emailing them.
//!
//! # Test Categories
//!
//! - `registration_flow` - The request, verify, complete, accept lifecycle
//! - `username_race` - The unguarded check-then-act on usernames
//! - `login` - Login and admin authorization
//! - `http_contract` - Status codes and error bodies

use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use chrono::Duration;
use futures::FutureExt;
use futures::future::BoxFuture;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use salon_core::{Email, OtpCode};
use salon_server::config::{DatabaseConfig, ServerConfig};
use salon_server::db::MemoryStore;
use salon_server::services::{NotificationError, OtpSender};
use salon_server::state::AppState;

/// Signing secret used by every test server.
pub const TEST_JWT_SECRET: &str = "q8Zr!v2#Lm9@Tx4$Wp7^Kd1&Hs6*Nb3%";

/// Password used for every test account.
pub const TEST_PASSWORD: &str = "Sup3rSecret!";

/// Remembers every code it is asked to send.
#[derive(Debug, Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSender {
    /// The most recent code sent to `email`.
    #[must_use]
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }

    /// How many codes were sent in total.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl OtpSender for RecordingSender {
    fn send_otp<'a>(
        &'a self,
        to: &'a Email,
        code: &'a OtpCode,
        _valid_for: &'a str,
    ) -> BoxFuture<'a, Result<(), NotificationError>> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((to.to_string(), code.to_string()));
        futures::future::ready(Ok(())).boxed()
    }
}

/// Refuses every delivery.
#[derive(Debug, Default)]
pub struct FailingSender;

impl OtpSender for FailingSender {
    fn send_otp<'a>(
        &'a self,
        _to: &'a Email,
        _code: &'a OtpCode,
        _valid_for: &'a str,
    ) -> BoxFuture<'a, Result<(), NotificationError>> {
        futures::future::ready(Err(NotificationError::Delivery(
            "relay refused the message".to_string(),
        )))
        .boxed()
    }
}

/// Server configuration for tests: in-memory store, no SMTP, no Sentry.
#[must_use]
pub fn test_config() -> ServerConfig {
    ServerConfig {
        database: DatabaseConfig::Memory,
        host: std::net::IpAddr::from([127, 0, 0, 1]),
        port: 0,
        jwt_secret: SecretString::from(TEST_JWT_SECRET),
        jwt_expires_in: Duration::days(1),
        cors_origin: "http://localhost:5173".to_string(),
        email: None,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 1.0,
        log_json: false,
    }
}

/// A server instance with handles on its store and outbox.
pub struct TestApp {
    pub store: MemoryStore,
    pub sender: Arc<RecordingSender>,
    pub state: AppState,
    router: Router,
}

/// Status and parsed JSON body of a response. Non-JSON bodies become strings.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    /// A fresh server with an empty store and a recording sender.
    #[must_use]
    pub fn new() -> Self {
        let sender = Arc::new(RecordingSender::default());
        Self::build(sender.clone(), sender)
    }

    /// A fresh server whose sender refuses every delivery.
    #[must_use]
    pub fn with_failing_sender() -> Self {
        Self::build(Arc::new(FailingSender), Arc::new(RecordingSender::default()))
    }

    fn build(sender: Arc<dyn OtpSender>, recorder: Arc<RecordingSender>) -> Self {
        let store = MemoryStore::new();
        let state = AppState::with_parts(test_config(), Arc::new(store.clone()), sender);
        let router = salon_server::app(state.clone(), None);
        Self {
            store,
            sender: recorder,
            state,
            router,
        }
    }

    /// Send a request and collect the response.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        bearer: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap_or_else(|e| panic!("bad test request: {e}"));

        self.send(request).await
    }

    /// Send a prebuilt request and collect the response.
    ///
    /// # Panics
    ///
    /// Panics if the body cannot be read.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .unwrap_or_else(|e| match e {});
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_else(|e| panic!("unreadable body: {e}"));
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// `POST` a JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request(Method::POST, path, Some(body), None).await
    }

    /// The full signup form for `username` at `email`.
    #[must_use]
    pub fn signup_form(email: &str, username: &str, role: &str) -> Value {
        serde_json::json!({
            "email": email,
            "firstName": "Bob",
            "lastName": "Stone",
            "username": username,
            "password": TEST_PASSWORD,
            "retypePassword": TEST_PASSWORD,
            "role": role,
        })
    }

    /// Contact details for the completion step.
    #[must_use]
    pub fn contact_form(email: &str) -> Value {
        serde_json::json!({
            "email": email,
            "contactNumber": "+1 512 555 0100",
            "city": "Austin",
            "state": "TX",
            "country": "USA",
            "zipCode": "73301",
        })
    }

    /// Run request, verify and complete for one applicant. Returns the
    /// completion response.
    ///
    /// # Panics
    ///
    /// Panics if any step fails.
    pub async fn register(&self, email: &str, username: &str, role: &str) -> TestResponse {
        let sent = self
            .post("/auth/otp/send", Self::signup_form(email, username, role))
            .await;
        assert_eq!(sent.status, StatusCode::OK, "send failed: {:?}", sent.body);

        let code = self
            .sender
            .last_code_for(email)
            .unwrap_or_else(|| panic!("no code sent to {email}"));
        let verified = self
            .post("/auth/otp/verify", serde_json::json!({"email": email, "otp": code}))
            .await;
        assert_eq!(verified.status, StatusCode::OK, "verify failed: {:?}", verified.body);

        let completed = self
            .post("/auth/register/complete", Self::contact_form(email))
            .await;
        assert_eq!(completed.status, StatusCode::CREATED, "complete failed: {:?}", completed.body);
        completed
    }

    /// Log in and return the session token.
    ///
    /// # Panics
    ///
    /// Panics if login fails.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .post(
                "/auth/login",
                serde_json::json!({"username": username, "password": password}),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {:?}", response.body);
        response.body["token"]
            .as_str()
            .unwrap_or_else(|| panic!("no token in {:?}", response.body))
            .to_string()
    }

    /// Issue an Admin token without an account behind it.
    ///
    /// # Panics
    ///
    /// Panics if signing fails.
    #[must_use]
    pub fn admin_token(&self) -> String {
        self.state
            .tokens()
            .issue("owner", salon_core::Role::Admin)
            .unwrap_or_else(|e| panic!("signing failed: {e}"))
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
