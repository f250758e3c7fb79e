//! Firebase Realtime Database REST client.
//!
//! Every node is addressable as `{base}/{path}.json`. Reads are `GET`, writes
//! are `PUT`, appends are `POST` (the response carries the generated key) and
//! deletes are `DELETE`. The database secret, when configured, is passed as
//! the `auth` query parameter.

use std::time::Duration;

use futures::FutureExt;
use reqwest::{Client, Method, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::{KeyValueStore, StoreError, StoreFuture, StorePath};

/// Per-request timeout. Expiry surfaces as [`StoreError::Unavailable`].
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Body of a successful `POST`.
#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

/// REST client for one Realtime Database instance.
#[derive(Clone)]
pub struct RealtimeDatabase {
    client: Client,
    base_url: Url,
    secret: Option<SecretString>,
}

impl std::fmt::Debug for RealtimeDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeDatabase")
            .field("base_url", &self.base_url.as_str())
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl RealtimeDatabase {
    /// Create a client for the database at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the HTTP client cannot be built.
    pub fn new(base_url: Url, secret: Option<SecretString>) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            secret,
        })
    }

    /// Build the REST URL for a node.
    ///
    /// Segments are percent-encoded by `url`, so the `%` produced by the key
    /// sanitizer travels as `%25` and the database stores it literally.
    fn url(&self, path: &StorePath, shallow: bool) -> Url {
        let mut url = self.base_url.clone();

        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            match path.segments().split_last() {
                Some((last, parents)) => {
                    segments.extend(parents);
                    segments.push(&format!("{last}.json"));
                }
                None => {
                    segments.push(".json");
                }
            }
        }

        {
            let mut query = url.query_pairs_mut();
            if let Some(secret) = &self.secret {
                query.append_pair("auth", secret.expose_secret());
            }
            if shallow {
                query.append_pair("shallow", "true");
            }
        }
        // An empty query string would leave a dangling '?'
        if url.query() == Some("") {
            url.set_query(None);
        }

        url
    }

    async fn send(
        &self,
        method: Method,
        path: &StorePath,
        body: Option<&Value>,
        shallow: bool,
    ) -> Result<Response, StoreError> {
        let mut request = self.client.request(method.clone(), self.url(path, shallow));
        if let Some(body) = body {
            request = request.json(body);
        }

        // The URL carries the database secret; keep it out of logs.
        let response = request.send().await.map_err(|e| {
            let e = e.without_url();
            tracing::warn!(%method, %path, error = %e, "Realtime Database request failed");
            StoreError::Unavailable(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%method, %path, status = status.as_u16(), "Realtime Database error status");
            return Err(StoreError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        tracing::debug!(%method, %path, status = status.as_u16(), "Realtime Database request");
        Ok(response)
    }

    async fn body(path: &StorePath, response: Response) -> Result<Value, StoreError> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StoreError::Unavailable(e.without_url().to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

impl KeyValueStore for RealtimeDatabase {
    fn get<'a>(&'a self, path: &'a StorePath) -> StoreFuture<'a, Option<Value>> {
        async move {
            let response = self.send(Method::GET, path, None, false).await?;
            match Self::body(path, response).await? {
                Value::Null => Ok(None),
                value => Ok(Some(value)),
            }
        }
        .boxed()
    }

    fn put<'a>(&'a self, path: &'a StorePath, value: Value) -> StoreFuture<'a, ()> {
        async move {
            self.send(Method::PUT, path, Some(&value), false).await?;
            Ok(())
        }
        .boxed()
    }

    fn push<'a>(&'a self, path: &'a StorePath, value: Value) -> StoreFuture<'a, String> {
        async move {
            let response = self.send(Method::POST, path, Some(&value), false).await?;
            let body = Self::body(path, response).await?;
            let pushed: PushResponse = super::decode(path, body)?;
            Ok(pushed.name)
        }
        .boxed()
    }

    fn remove<'a>(&'a self, path: &'a StorePath) -> StoreFuture<'a, ()> {
        async move {
            self.send(Method::DELETE, path, None, false).await?;
            Ok(())
        }
        .boxed()
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        async move {
            let root = StorePath::root();
            self.send(Method::GET, &root, None, true).await?;
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn database(secret: Option<&str>) -> RealtimeDatabase {
        RealtimeDatabase::new(
            Url::parse("https://salon-demo.firebaseio.com/").unwrap(),
            secret.map(SecretString::from),
        )
        .unwrap()
    }

    #[test]
    fn test_url_for_record() {
        let db = database(None);
        let path = StorePath::node("OTPVerification").child("bob@gmail%2Ecom");
        assert_eq!(
            db.url(&path, false).as_str(),
            "https://salon-demo.firebaseio.com/OTPVerification/bob@gmail%252Ecom.json"
        );
    }

    #[test]
    fn test_url_for_root_is_shallow() {
        let db = database(None);
        assert_eq!(
            db.url(&StorePath::root(), true).as_str(),
            "https://salon-demo.firebaseio.com/.json?shallow=true"
        );
    }

    #[test]
    fn test_url_carries_auth_secret() {
        let db = database(Some("s3cr3t"));
        let url = db.url(&StorePath::node("Admin"), false);
        assert_eq!(url.path(), "/Admin.json");
        assert_eq!(url.query(), Some("auth=s3cr3t"));
    }

    #[test]
    fn test_url_keeps_base_path() {
        let db = RealtimeDatabase::new(
            Url::parse("http://localhost:9000/ns").unwrap(),
            None,
        )
        .unwrap();
        let url = db.url(&StorePath::node("Admin").child("-Nx1"), false);
        assert_eq!(url.as_str(), "http://localhost:9000/ns/Admin/-Nx1.json");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let db = database(Some("super_secret_db_token"));
        let debug_output = format!("{db:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_db_token"));
    }
}
