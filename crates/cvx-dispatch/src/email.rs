//! Follow-up email template and schedule

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use cvx_core::{CandidateRecord, DispatchConfig};

/// "Application under review" message for one candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpEmail {
    pub to: String,
    pub from: Option<String>,
    pub subject: String,
    pub body: String,
}

impl FollowUpEmail {
    /// Render the message; `None` when the record has no email address
    pub fn for_record(record: &CandidateRecord, config: &DispatchConfig) -> Option<Self> {
        let to = record.email.as_deref()?.trim();
        if to.is_empty() {
            return None;
        }

        Some(Self {
            to: to.to_string(),
            from: config.followup_sender.clone(),
            subject: config.followup_subject.clone(),
            body: format!(
                "Hello,\n\nYour job application is under review. We will update you soon.\n\nBest regards,\n{}",
                config.followup_signature
            ),
        })
    }
}

/// Next UTC instant strictly after `now` at `time_of_day`
pub fn next_send_time(now: DateTime<Utc>, time_of_day: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(time_of_day).and_utc();
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use cvx_core::NameSource;

    fn nine() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 0, 0).unwrap()
    }

    #[test]
    fn test_template() {
        let mut record = CandidateRecord::new("Jane Smith", NameSource::Entity);
        record.email = Some("jane@example.com".to_string());

        let config = DispatchConfig {
            followup_sender: Some("jobs@example.com".to_string()),
            ..DispatchConfig::default()
        };
        let email = FollowUpEmail::for_record(&record, &config).unwrap();

        assert_eq!(email.to, "jane@example.com");
        assert_eq!(email.from.as_deref(), Some("jobs@example.com"));
        assert_eq!(email.subject, "Your Job Application is Under Review");
        assert!(email.body.starts_with("Hello,\n\nYour job application is under review."));
        assert!(email.body.ends_with("Best regards,\nRecruitment Team"));
    }

    #[test]
    fn test_no_email_no_message() {
        let record = CandidateRecord::new("Jane Smith", NameSource::Entity);
        assert!(FollowUpEmail::for_record(&record, &DispatchConfig::default()).is_none());
    }

    #[test]
    fn test_next_send_time_later_today() {
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 6, 15, 0).unwrap();
        assert_eq!(
            next_send_time(now, nine()),
            Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_send_time_rolls_over() {
        let at_nine = Utc.with_ymd_and_hms(2024, 12, 31, 9, 0, 0).unwrap();
        assert_eq!(
            next_send_time(at_nine, nine()),
            Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap()
        );
    }
}
