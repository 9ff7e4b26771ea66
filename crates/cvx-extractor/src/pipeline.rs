//! Document processing pipeline
//!
//! Loader → field rules + entity recognizer → assembler, for one document
//! or a batch processed in parallel.

use once_cell::sync::Lazy;
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use cvx_core::{
    CandidateRecord, CvError, Document, EntityMatch, EntityOrigin, EntityPolicy, ExtractedText,
    ExtractionConfig, NerBackend, Result,
};
use cvx_parser::DocumentLoader;

use crate::assembler::assemble;
use crate::ner::{StatisticalNer, UnavailableRecognizer};
use crate::rules::RuleSet;
use crate::EntityRecognizer;

/// One document in a batch
#[derive(Debug, Clone)]
pub struct BatchItem {
    /// Caller-chosen identifier, echoed in the outcome
    pub id: String,
    pub bytes: Vec<u8>,
    pub declared_type: String,
}

impl BatchItem {
    pub fn new(id: impl Into<String>, bytes: Vec<u8>, declared_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            bytes,
            declared_type: declared_type.into(),
        }
    }
}

/// Result of processing one batch item
#[derive(Debug)]
pub struct BatchOutcome {
    pub id: String,
    pub result: Result<CandidateRecord>,
}

impl BatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Résumé processing pipeline
pub struct Pipeline {
    loader: DocumentLoader,
    rules: RuleSet,
    recognizer: Option<Box<dyn EntityRecognizer>>,
    policy: EntityPolicy,
    /// Batch worker threads; 0 uses the global rayon pool
    workers: usize,
}

impl Pipeline {
    /// Pipeline with the standard rules and the default recognizer
    pub fn new() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }

    /// Build a pipeline from configuration
    ///
    /// A model that fails to load does not fail construction. Under the
    /// degrade policy a missing pretrained model falls back to the lexicon
    /// scorer; otherwise documents are handled according to the policy.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        let pipeline = Self {
            loader: DocumentLoader::new(),
            rules: RuleSet::standard(),
            recognizer: None,
            policy: config.entity_policy,
            workers: config.workers,
        };

        if !config.ner_enabled {
            info!("Entity recognition disabled");
            return pipeline;
        }

        let loaded = match config.ner_backend {
            NerBackend::Lexicon => lexicon(config),
            NerBackend::Bert => match pretrained(config) {
                Ok(ner) => Ok(ner),
                Err(e) if config.entity_policy == EntityPolicy::Degrade => {
                    warn!(error = %e, "Pretrained NER model unavailable, falling back to lexicon scorer");
                    lexicon(config)
                }
                Err(e) => Err(e),
            },
        };

        let recognizer = match loaded {
            Ok(ner) => {
                info!(model = ner.name(), origin = ?ner.origin(), "Loaded NER model");
                ner
            }
            Err(e) => {
                warn!(error = %e, "NER model failed to load");
                Box::new(UnavailableRecognizer::new(e.to_string()))
            }
        };

        Self {
            recognizer: Some(recognizer),
            ..pipeline
        }
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_recognizer<R: EntityRecognizer + 'static>(mut self, recognizer: R) -> Self {
        self.recognizer = Some(Box::new(recognizer));
        self
    }

    /// Skip entity recognition entirely
    pub fn without_recognizer(mut self) -> Self {
        self.recognizer = None;
        self
    }

    pub fn with_policy(mut self, policy: EntityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn policy(&self) -> EntityPolicy {
        self.policy
    }

    /// Whether a recognizer is configured and its model loaded
    pub fn recognizer_ready(&self) -> bool {
        self.recognizer.as_ref().is_some_and(|r| r.is_available())
    }

    pub fn recognizer_name(&self) -> Option<&str> {
        self.recognizer.as_deref().map(|r| r.name())
    }

    /// Whether a pretrained model (not the lexicon fallback) is loaded
    pub fn recognizer_pretrained(&self) -> bool {
        self.recognizer
            .as_ref()
            .is_some_and(|r| r.is_available() && r.origin() == EntityOrigin::Model)
    }

    /// Process raw bytes with a declared type (`"pdf"` or `"docx"`)
    pub fn process_document(&self, bytes: &[u8], declared_type: &str) -> Result<CandidateRecord> {
        let document = Document::from_declared(bytes, declared_type)?;
        self.process(&document)
    }

    /// Process a loaded document
    pub fn process(&self, document: &Document) -> Result<CandidateRecord> {
        let text = self.loader.load(document)?;
        let record = self.process_text(&text)?;

        info!(
            doc_type = %document.doc_type(),
            confident_name = record.has_confident_name(),
            email = record.email.is_some(),
            phone = record.phone.is_some(),
            "Processed document"
        );
        Ok(record)
    }

    /// Run extraction and assembly over already-loaded text
    pub fn process_text(&self, text: &ExtractedText) -> Result<CandidateRecord> {
        let fields = self.rules.extract_fields(text);
        debug!(fields = fields.len(), "Extracted fields");

        let entities = self.recognize(text)?;
        debug!(entities = entities.len(), "Recognized entities");

        Ok(assemble(&fields, &entities, text.first_non_empty_line()))
    }

    fn recognize(&self, text: &ExtractedText) -> Result<Vec<EntityMatch>> {
        let Some(recognizer) = &self.recognizer else {
            return Ok(Vec::new());
        };

        match recognizer.recognize(text) {
            Ok(entities) => Ok(entities),
            Err(CvError::ModelUnavailable(reason)) if self.policy == EntityPolicy::Degrade => {
                warn!(model = recognizer.name(), %reason, "Entity model unavailable, continuing without entities");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Process many documents in parallel
    ///
    /// Outcomes come back in input order. A failed item never affects the
    /// others.
    pub fn process_batch(&self, items: Vec<BatchItem>) -> Vec<BatchOutcome> {
        let total = items.len();
        let run = || {
            items
                .into_par_iter()
                .map(|item| self.process_item(item))
                .collect::<Vec<_>>()
        };

        let outcomes = if self.workers > 0 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .build()
            {
                Ok(pool) => pool.install(run),
                Err(e) => {
                    warn!(error = %e, workers = self.workers, "Falling back to global thread pool");
                    run()
                }
            }
        } else {
            run()
        };

        let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
        info!(total, failed, "Processed batch");
        outcomes
    }

    fn process_item(&self, item: BatchItem) -> BatchOutcome {
        let result = self.process_document(&item.bytes, &item.declared_type);
        if let Err(e) = &result {
            error!(id = %item.id, code = e.code(), error = %e, "Failed to process document");
        }
        BatchOutcome {
            id: item.id,
            result,
        }
    }
}

fn lexicon(config: &ExtractionConfig) -> Result<Box<dyn EntityRecognizer>> {
    let ner = match &config.ner_model_path {
        Some(path) => StatisticalNer::from_path(path)?,
        None => StatisticalNer::bundled()?,
    };
    Ok(Box::new(ner))
}

#[cfg(feature = "bert")]
fn pretrained(config: &ExtractionConfig) -> Result<Box<dyn EntityRecognizer>> {
    let dir = config.ner_model_dir.as_deref().ok_or_else(|| {
        CvError::ModelUnavailable("no pretrained model directory configured".to_string())
    })?;
    Ok(Box::new(crate::bert::BertNer::from_dir(dir)?))
}

#[cfg(not(feature = "bert"))]
fn pretrained(_config: &ExtractionConfig) -> Result<Box<dyn EntityRecognizer>> {
    Err(CvError::ModelUnavailable(
        "built without the `bert` feature".to_string(),
    ))
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

static DEFAULT_PIPELINE: Lazy<Pipeline> = Lazy::new(Pipeline::new);

/// Process one résumé with the default pipeline
pub fn process_document(bytes: &[u8], declared_type: &str) -> Result<CandidateRecord> {
    DEFAULT_PIPELINE.process_document(bytes, declared_type)
}
