use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{failure_details, BackendClient};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsMessage {
    pub to: String,
    pub message: String,
}

/// Outbound email/SMS delivery.
#[async_trait]
pub trait MessageDispatcher: Send + Sync {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), DispatchError>;
    async fn send_sms(&self, message: &SmsMessage) -> Result<(), DispatchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("dispatch endpoint returned {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("dispatch transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Posts payloads to the `send-email` / `send-sms` edge functions.
#[derive(Debug, Clone)]
pub struct FunctionDispatcher {
    client: BackendClient,
}

impl FunctionDispatcher {
    pub const EMAIL_FUNCTION: &'static str = "send-email";
    pub const SMS_FUNCTION: &'static str = "send-sms";

    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    async fn invoke<B>(&self, function: &str, body: &B) -> Result<(), DispatchError>
    where
        B: Serialize + Sync,
    {
        let response = self
            .client
            .request(Method::POST, &format!("functions/v1/{function}"), None)
            .json(body)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }

        let (status, _, message) = failure_details(response, "Failed to send").await;
        Err(DispatchError::Rejected { status, message })
    }
}

#[async_trait]
impl MessageDispatcher for FunctionDispatcher {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), DispatchError> {
        self.invoke(Self::EMAIL_FUNCTION, message).await
    }

    async fn send_sms(&self, message: &SmsMessage) -> Result<(), DispatchError> {
        self.invoke(Self::SMS_FUNCTION, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    fn dispatcher_for(server: &MockServer) -> FunctionDispatcher {
        let config = BackendConfig {
            url: server.base_url(),
            anon_key: "anon-key".to_string(),
            request_timeout: Duration::from_secs(5),
            photo_bucket: "technician-photos".to_string(),
            photo_max_bytes: 1024,
        };
        FunctionDispatcher::new(BackendClient::new(&config).expect("client builds"))
    }

    #[tokio::test]
    async fn sms_posts_to_function_with_anon_key() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/functions/v1/send-sms")
                .header("authorization", "Bearer anon-key")
                .json_body(json!({ "to": "+15550100", "message": "hi" }));
            then.status(200).json_body(json!({ "success": true }));
        });

        dispatcher_for(&server)
            .send_sms(&SmsMessage {
                to: "+15550100".to_string(),
                message: "hi".to_string(),
            })
            .await
            .expect("sms dispatched");
        mock.assert();
    }

    #[tokio::test]
    async fn failure_carries_function_error_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/functions/v1/send-email");
            then.status(500)
                .json_body(json!({ "error": "Email provider not configured" }));
        });

        let err = dispatcher_for(&server)
            .send_email(&EmailMessage {
                to: "pat@example.com".to_string(),
                subject: "Meet Your Technician".to_string(),
                html: "<p>hi</p>".to_string(),
            })
            .await
            .expect_err("dispatch fails");

        match err {
            DispatchError::Rejected { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Email provider not configured");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
