//! Record assembly
//!
//! Merges field matches and entity matches into one `CandidateRecord`:
//!
//! 1. `email`: first email match, or absent
//! 2. `phone`: first phone match with at least `PHONE_MIN_DIGITS` digits, or absent
//! 3. `name`: first PERSON entity from a pretrained model, otherwise the
//!    fallback line. Lexicon PERSON hits only go into `entities`.
//! 4. line fields and skills: all matches, deduplicated, first-seen order
//! 5. `entities`: grouped by category, deduplicated, first-seen order
//!
//! Assembly performs no I/O and never fails.

use cvx_core::record::push_unique;
use cvx_core::{
    CandidateRecord, EntityCategory, EntityMatch, EntityOrigin, FieldKind, FieldMatch, NameSource,
};

use crate::rules::{digit_count, PHONE_MIN_DIGITS};

/// Build a candidate record from extraction results
pub fn assemble(
    fields: &[FieldMatch],
    entities: &[EntityMatch],
    fallback_first_line: &str,
) -> CandidateRecord {
    let person = entities.iter().find(|e| {
        e.category == EntityCategory::Person
            && e.origin == EntityOrigin::Model
            && !e.text.trim().is_empty()
    });

    let mut record = match person {
        Some(entity) => CandidateRecord::new(entity.text.trim(), NameSource::Entity),
        None => CandidateRecord::new(fallback_first_line.trim(), NameSource::FirstLine),
    };

    for m in fields {
        let text = m.text.as_str();
        if text.trim().is_empty() {
            continue;
        }
        match m.field {
            FieldKind::Email => {
                if record.email.is_none() {
                    record.email = Some(text.trim().to_string());
                }
            }
            FieldKind::Phone => {
                if record.phone.is_none() && digit_count(text) >= PHONE_MIN_DIGITS {
                    record.phone = Some(text.trim().to_string());
                }
            }
            // Lines are kept as loaded; only exact repeats collapse
            FieldKind::Education => push_unique(&mut record.education, text),
            FieldKind::Qualification => push_unique(&mut record.qualifications, text),
            FieldKind::Project => push_unique(&mut record.projects, text),
            FieldKind::Skill => push_unique(&mut record.skills, text),
        }
    }

    for entity in entities {
        let text = entity.text.trim();
        if text.is_empty() {
            continue;
        }
        let list = record.entities.entry(entity.category).or_default();
        push_unique(list, text);
    }

    record
}
