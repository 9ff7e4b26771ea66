//! CVX Extractor - Résumé field extraction pipeline
//!
//! Implements the three text-level stages of the pipeline:
//! - Rule-based field extraction (email, phone, education, ...)
//! - Named entity recognition (PERSON, ORG, GPE) with a pretrained BERT
//!   model, or a lexicon span scorer when no model is available
//! - Record assembly with a fixed precedence policy
//!
//! `Pipeline` ties them to the document loader from `cvx-parser`.

use cvx_core::{EntityMatch, EntityOrigin, ExtractedText, Result};

/// Trait for named entity recognizers
///
/// Implementations must be deterministic for a fixed model and input.
/// A recognizer whose model cannot be used fails with
/// `CvError::ModelUnavailable`.
pub trait EntityRecognizer: Send + Sync {
    fn recognize(&self, text: &ExtractedText) -> Result<Vec<EntityMatch>>;

    /// Model identifier for logs and readiness reporting
    fn name(&self) -> &str;

    /// Whether the underlying model loaded
    fn is_available(&self) -> bool {
        true
    }

    /// Kind of recognizer behind the matches it returns
    fn origin(&self) -> EntityOrigin {
        EntityOrigin::Model
    }
}

pub mod assembler;
#[cfg(feature = "bert")]
pub mod bert;
pub mod ner;
pub mod pipeline;
pub mod rules;

pub use assembler::assemble;
#[cfg(feature = "bert")]
pub use bert::BertNer;
pub use ner::{NerModel, StatisticalNer, UnavailableRecognizer};
pub use pipeline::{process_document, BatchItem, BatchOutcome, Pipeline};
pub use rules::{extract_fields, FieldRule, Matcher, RuleScope, RuleSet};
