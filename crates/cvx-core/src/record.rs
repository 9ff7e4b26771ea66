//! Candidate record produced for each processed résumé

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::EntityCategory;

/// Where the candidate name came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameSource {
    /// First PERSON entity found by a pretrained model
    Entity,
    /// First non-empty line of the document (low confidence), used when no
    /// pretrained model found a person
    FirstLine,
}

/// Structured output of processing one résumé
///
/// Every sequence holds non-empty strings, deduplicated, in the order they
/// were first seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub name: String,
    pub name_source: NameSource,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub education: Vec<String>,
    pub qualifications: Vec<String>,
    pub projects: Vec<String>,
    pub skills: Vec<String>,
    pub entities: BTreeMap<EntityCategory, Vec<String>>,
}

impl CandidateRecord {
    /// Create a record with only a name
    pub fn new(name: impl Into<String>, name_source: NameSource) -> Self {
        Self {
            name: name.into(),
            name_source,
            email: None,
            phone: None,
            education: Vec::new(),
            qualifications: Vec::new(),
            projects: Vec::new(),
            skills: Vec::new(),
            entities: BTreeMap::new(),
        }
    }

    /// Whether the name came from a PERSON entity rather than the first line
    pub fn has_confident_name(&self) -> bool {
        self.name_source == NameSource::Entity
    }

    /// Entities recorded for a category (empty if none)
    pub fn entities_of(&self, category: EntityCategory) -> &[String] {
        self.entities
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Append `value` unless it is blank or already present
pub fn push_unique(list: &mut Vec<String>, value: &str) {
    if value.is_empty() || list.iter().any(|v| v == value) {
        return;
    }
    list.push(value.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_push_unique_skips_blank_and_duplicates() {
        let mut list = Vec::new();
        push_unique(&mut list, "Built a compiler");
        push_unique(&mut list, "");
        push_unique(&mut list, "Built a compiler");
        push_unique(&mut list, "Designed a database");
        assert_eq!(list, vec!["Built a compiler", "Designed a database"]);
    }

    #[test]
    fn test_record_serializes_entity_labels() {
        let mut record = CandidateRecord::new("Jane Smith", NameSource::FirstLine);
        record
            .entities
            .insert(EntityCategory::Org, vec!["Acme Corp".to_string()]);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["name_source"], "first_line");
        assert_eq!(json["entities"]["ORG"][0], "Acme Corp");
        assert!(json["email"].is_null());
        assert!(!record.has_confident_name());
        assert!(record.entities_of(EntityCategory::Person).is_empty());
    }

    proptest! {
        #[test]
        fn prop_push_unique_keeps_first_seen_order(values in prop::collection::vec("[a-c]{0,2}", 0..32)) {
            let mut list = Vec::new();
            for v in &values {
                push_unique(&mut list, v);
            }

            let mut expected: Vec<String> = Vec::new();
            for v in &values {
                if !v.is_empty() && !expected.contains(v) {
                    expected.push(v.clone());
                }
            }
            prop_assert_eq!(list, expected);
        }
    }
}
