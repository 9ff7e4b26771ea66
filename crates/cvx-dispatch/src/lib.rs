//! CVX Dispatch - Downstream delivery of processed résumés
//!
//! Shapes a `CandidateRecord` for the systems that consume it:
//! - a spreadsheet row (`SheetRow`)
//! - a JSON webhook payload (`WebhookPayload`), sent by `WebhookSink`
//! - a templated follow-up email (`FollowUpEmail`) and its send time
//!
//! Storage upload, mail delivery and scheduling live outside this crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use cvx_core::{CandidateRecord, CvError, DispatchConfig};

pub mod email;
pub mod payload;
pub mod webhook;

pub use email::{next_send_time, FollowUpEmail};
pub use payload::{CvData, PayloadMetadata, SheetRow, WebhookPayload};
pub use webhook::WebhookSink;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Webhook request failed: {0}")]
    Request(String),

    /// Endpoint answered with a non-2xx status
    #[error("Webhook returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Dispatch not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid dispatch configuration: {0}")]
    InvalidConfig(String),
}

impl From<DispatchError> for CvError {
    fn from(err: DispatchError) -> Self {
        CvError::DispatchError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;

// ============================================================================
// Sinks
// ============================================================================

/// Destination for webhook payloads
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn send(&self, payload: &WebhookPayload) -> Result<()>;

    fn name(&self) -> &str;
}

/// What happened when a record was dispatched
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub webhook_sent: bool,
    /// Follow-up message, if the candidate has an email address
    pub followup: Option<FollowUpEmail>,
    pub followup_at: Option<DateTime<Utc>>,
}

/// Sends the webhook payload and prepares the follow-up email
pub struct Dispatcher {
    config: DispatchConfig,
    sink: Option<Box<dyn RecordSink>>,
}

impl Dispatcher {
    /// Dispatcher with a webhook sink when `webhook_url` is configured
    pub fn from_config(config: DispatchConfig) -> Result<Self> {
        // Reject an unparsable schedule up front
        config
            .followup_time_of_day()
            .map_err(|e| DispatchError::InvalidConfig(e.to_string()))?;

        let sink: Option<Box<dyn RecordSink>> = match &config.webhook_url {
            Some(_) => Some(Box::new(WebhookSink::from_config(&config)?)),
            None => None,
        };
        Ok(Self { config, sink })
    }

    pub fn with_sink<S: RecordSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Build the webhook payload for a record at `now`
    pub fn payload(
        &self,
        record: &CandidateRecord,
        cv_public_link: &str,
        now: DateTime<Utc>,
    ) -> WebhookPayload {
        let metadata = PayloadMetadata::from_config(record, &self.config).with_timestamp(now);
        WebhookPayload::build(record, cv_public_link, metadata)
    }

    /// Send the record downstream
    pub async fn dispatch(
        &self,
        record: &CandidateRecord,
        cv_public_link: &str,
        now: DateTime<Utc>,
    ) -> Result<DispatchReport> {
        let webhook_sent = match &self.sink {
            Some(sink) => {
                sink.send(&self.payload(record, cv_public_link, now)).await?;
                info!(sink = sink.name(), applicant = %record.name, "Sent webhook payload");
                true
            }
            None => false,
        };

        let followup = FollowUpEmail::for_record(record, &self.config);
        let followup_at = match &followup {
            Some(_) => {
                let time = self
                    .config
                    .followup_time_of_day()
                    .map_err(|e| DispatchError::InvalidConfig(e.to_string()))?;
                Some(next_send_time(now, time))
            }
            None => None,
        };

        Ok(DispatchReport {
            webhook_sent,
            followup,
            followup_at,
        })
    }
}
