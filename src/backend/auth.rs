use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{failure_details, BackendClient};
use crate::domain::{AccessToken, UserId};

/// Identity as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub access_token: AccessToken,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: AuthUser,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |expires_at| expires_at <= now)
    }
}

/// Sign-up creates the identity; a session only comes back when the project
/// does not require email confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    pub session: Option<Session>,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError>;
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError>;
    async fn sign_out(&self, token: &AccessToken) -> Result<(), AuthError>;
    /// `Ok(None)` when the token is unknown or expired.
    async fn get_session(&self, token: &AccessToken) -> Result<Option<Session>, AuthError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("an account already exists for this email")]
    AlreadyRegistered,
    #[error("session expired or missing; sign in again")]
    SessionExpired,
    #[error("auth service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("auth transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected auth response: {0}")]
    UnexpectedResponse(String),
}

/// Client for the hosted GoTrue-compatible auth API.
#[derive(Debug, Clone)]
pub struct RemoteAuth {
    client: BackendClient,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserPayload> for AuthUser {
    fn from(value: UserPayload) -> Self {
        Self {
            id: UserId(value.id),
            email: value.email,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenPayload {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: UserPayload,
}

impl TokenPayload {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        Session {
            access_token: AccessToken(self.access_token),
            refresh_token: self.refresh_token,
            expires_at: self.expires_in.map(|secs| now + Duration::seconds(secs)),
            user: self.user.into(),
        }
    }
}

/// Sign-up answers with a token payload or, pending confirmation, a bare user.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpPayload {
    Session(TokenPayload),
    User(UserPayload),
}

impl RemoteAuth {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AuthProvider for RemoteAuth {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let response = self
            .client
            .request(Method::POST, "auth/v1/signup", None)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body, message) = failure_details(response, "sign up failed").await;
            let duplicate = body.error_code.as_deref() == Some("user_already_exists")
                || message.to_ascii_lowercase().contains("already registered");
            return Err(if duplicate {
                AuthError::AlreadyRegistered
            } else {
                AuthError::Rejected { status, message }
            });
        }

        let payload: SignUpPayload = response
            .json()
            .await
            .map_err(|err| AuthError::UnexpectedResponse(err.to_string()))?;

        Ok(match payload {
            SignUpPayload::Session(token) => {
                let session = token.into_session(Utc::now());
                SignUpOutcome {
                    user: session.user.clone(),
                    session: Some(session),
                }
            }
            SignUpPayload::User(user) => SignUpOutcome {
                user: user.into(),
                session: None,
            },
        })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let response = self
            .client
            .request(Method::POST, "auth/v1/token", None)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let payload: TokenPayload = response
                    .json()
                    .await
                    .map_err(|err| AuthError::UnexpectedResponse(err.to_string()))?;
                Ok(payload.into_session(Utc::now()))
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                Err(AuthError::InvalidCredentials)
            }
            _ => {
                let (status, _, message) = failure_details(response, "sign in failed").await;
                Err(AuthError::Rejected { status, message })
            }
        }
    }

    async fn sign_out(&self, token: &AccessToken) -> Result<(), AuthError> {
        let response = self
            .client
            .request(Method::POST, "auth/v1/logout", Some(token))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED => Err(AuthError::SessionExpired),
            _ => {
                let (status, _, message) = failure_details(response, "sign out failed").await;
                Err(AuthError::Rejected { status, message })
            }
        }
    }

    async fn get_session(&self, token: &AccessToken) -> Result<Option<Session>, AuthError> {
        let response = self
            .client
            .request(Method::GET, "auth/v1/user", Some(token))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let user: UserPayload = response
                    .json()
                    .await
                    .map_err(|err| AuthError::UnexpectedResponse(err.to_string()))?;
                Ok(Some(Session {
                    access_token: token.clone(),
                    refresh_token: None,
                    expires_at: None,
                    user: user.into(),
                }))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            _ => {
                let (status, _, message) = failure_details(response, "session lookup failed").await;
                Err(AuthError::Rejected { status, message })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use httpmock::prelude::*;
    use std::time::Duration as StdDuration;

    fn auth_for(server: &MockServer) -> RemoteAuth {
        let config = BackendConfig {
            url: server.base_url(),
            anon_key: "anon-key".to_string(),
            request_timeout: StdDuration::from_secs(5),
            photo_bucket: "technician-photos".to_string(),
            photo_max_bytes: 1024,
        };
        RemoteAuth::new(BackendClient::new(&config).expect("client builds"))
    }

    #[tokio::test]
    async fn sign_in_exchanges_credentials_for_session() {
        let server = MockServer::start();
        let user_id = Uuid::new_v4();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/v1/token")
                .query_param("grant_type", "password")
                .json_body(json!({ "email": "owner@acme.test", "password": "hunter22" }));
            then.status(200).json_body(json!({
                "access_token": "jwt-123",
                "token_type": "bearer",
                "expires_in": 3600,
                "refresh_token": "refresh-456",
                "user": { "id": user_id, "email": "owner@acme.test" }
            }));
        });

        let session = auth_for(&server)
            .sign_in_with_password("owner@acme.test", "hunter22")
            .await
            .expect("sign in succeeds");

        mock.assert();
        assert_eq!(session.access_token.as_str(), "jwt-123");
        assert_eq!(session.user.id, UserId(user_id));
        assert!(!session.is_expired(Utc::now()));
    }

    #[tokio::test]
    async fn bad_credentials_map_to_auth_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/auth/v1/token");
            then.status(400).json_body(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            }));
        });

        let err = auth_for(&server)
            .sign_in_with_password("owner@acme.test", "wrong")
            .await
            .expect_err("sign in fails");
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn duplicate_sign_up_is_reported() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/auth/v1/signup");
            then.status(422).json_body(json!({
                "code": 422,
                "error_code": "user_already_exists",
                "msg": "User already registered"
            }));
        });

        let err = auth_for(&server)
            .sign_up("owner@acme.test", "hunter22")
            .await
            .expect_err("duplicate sign up fails");
        assert!(matches!(err, AuthError::AlreadyRegistered));
    }

    #[tokio::test]
    async fn sign_up_pending_confirmation_has_no_session() {
        let server = MockServer::start();
        let user_id = Uuid::new_v4();
        server.mock(|when, then| {
            when.method(POST).path("/auth/v1/signup");
            then.status(200)
                .json_body(json!({ "id": user_id, "email": "owner@acme.test", "aud": "authenticated" }));
        });

        let outcome = auth_for(&server)
            .sign_up("owner@acme.test", "hunter22")
            .await
            .expect("sign up succeeds");
        assert_eq!(outcome.user.id, UserId(user_id));
        assert!(outcome.session.is_none());
    }

    #[tokio::test]
    async fn expired_token_resolves_to_no_session() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/auth/v1/user")
                .header("authorization", "Bearer stale");
            then.status(401).json_body(json!({ "msg": "JWT expired" }));
        });

        let session = auth_for(&server)
            .get_session(&AccessToken("stale".to_string()))
            .await
            .expect("lookup completes");
        assert!(session.is_none());
    }
}
