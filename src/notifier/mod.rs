pub mod dto;

use std::env;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct NotifierConfig {
    pub approved_url: String,
    pub rejected_url: String,
}

impl NotifierConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let approved_url = env::var("ENROLLMENT_APPROVED_URL")
            .map_err(|_| AppError::Validation("ENROLLMENT_APPROVED_URL is not set".to_string()))?;
        let rejected_url = env::var("ENROLLMENT_REJECTED_URL")
            .map_err(|_| AppError::Validation("ENROLLMENT_REJECTED_URL is not set".to_string()))?;

        Ok(Self {
            approved_url,
            rejected_url,
        })
    }
}

/// Outbound enrollment notices. Fire-and-forget from the caller's point of
/// view: delivery failure never rolls back an enrollment.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn enrollment_approved(
        &self,
        email: &str,
        student_id: &str,
        password: &str,
    ) -> Result<(), AppError>;
    async fn enrollment_rejected(&self, email: &str) -> Result<(), AppError>;
}

pub struct HttpNotifier {
    client: Client,
    config: NotifierConfig,
}

impl HttpNotifier {
    pub fn new(config: NotifierConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Validation(format!("Failed to build http client: {e}")))?;
        Ok(Self { client, config })
    }

    async fn post_json<T: serde::Serialize>(&self, url: &str, body: &T) -> Result<(), AppError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Validation(format!("notification request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Validation(format!(
                "notification endpoint error {status}: {body}"
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn enrollment_approved(
        &self,
        email: &str,
        student_id: &str,
        password: &str,
    ) -> Result<(), AppError> {
        self.post_json(
            &self.config.approved_url,
            &dto::ApprovedPayload {
                email,
                student_id,
                password,
            },
        )
        .await
    }

    async fn enrollment_rejected(&self, email: &str) -> Result<(), AppError> {
        self.post_json(&self.config.rejected_url, &dto::RejectedPayload { email })
            .await
    }
}

pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn enrollment_approved(
        &self,
        _email: &str,
        _student_id: &str,
        _password: &str,
    ) -> Result<(), AppError> {
        Ok(())
    }

    async fn enrollment_rejected(&self, _email: &str) -> Result<(), AppError> {
        Ok(())
    }
}
