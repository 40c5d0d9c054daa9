//! Adapters for the hosted backend: auth, relational store, message functions
//! and photo storage. Each seam is a trait with a remote (HTTP) implementation
//! and an in-memory one for tests and the offline demo.

pub mod auth;
pub mod dispatch;
pub mod memory;
pub mod photos;
pub mod rest;
pub mod store;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;

use crate::config::BackendConfig;
use crate::domain::AccessToken;

pub use auth::{AuthError, AuthProvider, AuthUser, RemoteAuth, Session, SignUpOutcome};
pub use dispatch::{DispatchError, EmailMessage, FunctionDispatcher, MessageDispatcher, SmsMessage};
pub use memory::{InMemoryAuth, InMemoryPhotoStore, InMemoryStore, RecordingDispatcher};
pub use photos::{PhotoStore, PhotoUpload, RemotePhotoStore};
pub use rest::RestStore;
pub use store::{Caller, DataStore, StoreError, TechnicianFilter};

/// Shared HTTP plumbing: base URL, public key header and request timeout.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
    anon_key: String,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Builds a request carrying the public key, authorized as the given user
    /// or, without one, as the anonymous role.
    pub(crate) fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&AccessToken>,
    ) -> RequestBuilder {
        let bearer = token.map(AccessToken::as_str).unwrap_or(&self.anon_key);
        self.http
            .request(method, self.endpoint(path))
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }
}

/// Error bodies differ per backend API; pick whichever message field is set.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub(crate) fn message(&self) -> Option<String> {
        self.message
            .clone()
            .or_else(|| self.msg.clone())
            .or_else(|| self.error_description.clone())
            .or_else(|| self.error.clone())
    }
}

/// Reads a non-success response into its status and best-effort message.
pub(crate) async fn failure_details(response: Response, fallback: &str) -> (u16, ErrorBody, String) {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let message = body
        .message()
        .or_else(|| (!text.trim().is_empty()).then(|| text.trim().to_string()))
        .unwrap_or_else(|| fallback.to_string());
    (status, body, message)
}
