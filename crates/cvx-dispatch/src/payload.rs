//! Payload shapes consumed by the spreadsheet and the webhook

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use cvx_core::{CandidateRecord, DispatchConfig};

/// Spreadsheet row: name, email, phone, storage link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetRow(pub [String; 4]);

impl SheetRow {
    /// Absent values become empty cells
    pub fn from_record(record: &CandidateRecord, storage_link: &str) -> Self {
        Self([
            record.name.clone(),
            record.email.clone().unwrap_or_default(),
            record.phone.clone().unwrap_or_default(),
            storage_link.to_string(),
        ])
    }

    pub fn cells(&self) -> &[String] {
        &self.0
    }
}

/// The record plus the public link to the stored original
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvData {
    #[serde(flatten)]
    pub record: CandidateRecord,
    pub cv_public_link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadMetadata {
    pub applicant_name: String,
    /// Identity sent in the `X-Candidate-Email` header
    pub email: Option<String>,
    pub status: String,
    pub cv_processed: bool,
    /// RFC 3339, UTC
    pub processed_timestamp: String,
}

impl PayloadMetadata {
    pub fn new(applicant_name: impl Into<String>, email: Option<String>, status: impl Into<String>) -> Self {
        Self {
            applicant_name: applicant_name.into(),
            email,
            status: status.into(),
            cv_processed: true,
            processed_timestamp: format_timestamp(Utc::now()),
        }
    }

    pub fn from_config(record: &CandidateRecord, config: &DispatchConfig) -> Self {
        Self::new(
            record.name.clone(),
            config.candidate_email_header.clone(),
            config.status.clone(),
        )
    }

    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.processed_timestamp = format_timestamp(at);
        self
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// JSON body POSTed to the webhook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub cv_data: CvData,
    pub metadata: PayloadMetadata,
}

impl WebhookPayload {
    pub fn build(record: &CandidateRecord, cv_public_link: &str, metadata: PayloadMetadata) -> Self {
        Self {
            cv_data: CvData {
                record: record.clone(),
                cv_public_link: cv_public_link.to_string(),
            },
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use cvx_core::{EntityCategory, NameSource};

    fn record() -> CandidateRecord {
        let mut record = CandidateRecord::new("Jane Smith", NameSource::Entity);
        record.email = Some("jane@example.com".to_string());
        record.projects.push("Built a compiler".to_string());
        record
            .entities
            .insert(EntityCategory::Gpe, vec!["London".to_string()]);
        record
    }

    #[test]
    fn test_sheet_row() {
        let row = SheetRow::from_record(&record(), "https://files.example.com/cv.pdf");
        assert_eq!(
            row.cells(),
            [
                "Jane Smith",
                "jane@example.com",
                "",
                "https://files.example.com/cv.pdf"
            ]
        );
        assert_eq!(serde_json::to_string(&row).unwrap().chars().next(), Some('['));
    }

    #[test]
    fn test_webhook_payload_shape() {
        let at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let metadata = PayloadMetadata::new("Jane Smith", Some("hr@example.com".into()), "prod")
            .with_timestamp(at);
        let payload = WebhookPayload::build(&record(), "https://files.example.com/cv.pdf", metadata);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["cv_data"]["name"], "Jane Smith");
        assert_eq!(json["cv_data"]["projects"][0], "Built a compiler");
        assert_eq!(json["cv_data"]["entities"]["GPE"][0], "London");
        assert_eq!(json["cv_data"]["cv_public_link"], "https://files.example.com/cv.pdf");
        assert_eq!(json["metadata"]["applicant_name"], "Jane Smith");
        assert_eq!(json["metadata"]["email"], "hr@example.com");
        assert_eq!(json["metadata"]["status"], "prod");
        assert_eq!(json["metadata"]["cv_processed"], true);
        assert_eq!(json["metadata"]["processed_timestamp"], "2024-05-06T07:08:09Z");

        let back: WebhookPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_metadata_from_config() {
        let config = DispatchConfig {
            candidate_email_header: Some("hr@example.com".to_string()),
            status: "staging".to_string(),
            ..DispatchConfig::default()
        };
        let metadata = PayloadMetadata::from_config(&record(), &config);
        assert_eq!(metadata.applicant_name, "Jane Smith");
        assert_eq!(metadata.email.as_deref(), Some("hr@example.com"));
        assert_eq!(metadata.status, "staging");
        assert!(metadata.cv_processed);
    }
}
