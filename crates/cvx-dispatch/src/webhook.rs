//! Webhook sink
//!
//! POSTs the JSON payload with an `X-Candidate-Email` header. A non-2xx
//! response is an error; there are no retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use cvx_core::DispatchConfig;

use crate::{DispatchError, RecordSink, Result, WebhookPayload};

pub const CANDIDATE_EMAIL_HEADER: &str = "X-Candidate-Email";

pub struct WebhookSink {
    client: Client,
    url: String,
    candidate_email: Option<String>,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            candidate_email: None,
        }
    }

    pub fn from_config(config: &DispatchConfig) -> Result<Self> {
        let url = config
            .webhook_url
            .clone()
            .ok_or_else(|| DispatchError::NotConfigured("webhook_url".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DispatchError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            candidate_email: config.candidate_email_header.clone(),
        })
    }

    pub fn with_candidate_email(mut self, email: impl Into<String>) -> Self {
        self.candidate_email = Some(email.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RecordSink for WebhookSink {
    async fn send(&self, payload: &WebhookPayload) -> Result<()> {
        let mut request = self.client.post(&self.url).json(payload);
        if let Some(email) = &self.candidate_email {
            request = request.header(CANDIDATE_EMAIL_HEADER, email);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DispatchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(url = %self.url, status = status.as_u16(), "Webhook rejected payload");
            return Err(DispatchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(url = %self.url, status = status.as_u16(), "Webhook accepted payload");
        Ok(())
    }

    fn name(&self) -> &str {
        "webhook"
    }
}
