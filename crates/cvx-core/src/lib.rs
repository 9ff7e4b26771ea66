//! CVX Core - Domain models, error taxonomy, and shared types
//!
//! This crate defines the types that flow through the résumé pipeline:
//! - Documents and their declared formats
//! - Extracted text (ordered lines)
//! - Rule-based field matches and model-based entity matches
//! - The assembled candidate record
//! - Configuration management

pub mod config;
pub mod record;

pub use config::{
    AppConfig, ConfigError, DispatchConfig, EntityPolicy, ExtractionConfig, LoggingConfig,
    NerBackend, ServerConfig,
};
pub use record::{CandidateRecord, NameSource};

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for CVX operations
#[derive(Error, Debug)]
pub enum CvError {
    /// Declared document type is not `pdf` or `docx`
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// The container could not be opened as the declared type
    #[error("Text extraction failed: {0}")]
    ExtractionFailure(String),

    /// The entity recognition model could not be loaded or run
    #[error("Entity model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Dispatch error: {0}")]
    DispatchError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CvError {
    /// Whether the pipeline may continue and still produce a record
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ModelUnavailable(_))
    }

    /// Short machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::ExtractionFailure(_) => "EXTRACTION_FAILURE",
            Self::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::DispatchError(_) => "DISPATCH_ERROR",
            Self::Other(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<ConfigError> for CvError {
    fn from(err: ConfigError) -> Self {
        CvError::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CvError>;

// ============================================================================
// Documents
// ============================================================================

/// Declared document type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Pdf,
    Docx,
}

impl DocumentType {
    /// Detect the declared type from a file path's extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("none");
        ext.parse()
    }

    /// Get MIME type
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }
}

impl std::str::FromStr for DocumentType {
    type Err = CvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            _ => Err(CvError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw document bytes with their declared type
#[derive(Debug, Clone)]
pub struct Document {
    bytes: Vec<u8>,
    doc_type: DocumentType,
}

impl Document {
    pub fn new(bytes: impl Into<Vec<u8>>, doc_type: DocumentType) -> Self {
        Self {
            bytes: bytes.into(),
            doc_type,
        }
    }

    /// Build a document from a declared type string such as `"pdf"`
    pub fn from_declared(bytes: impl Into<Vec<u8>>, declared_type: &str) -> Result<Self> {
        Ok(Self::new(bytes, declared_type.parse()?))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn doc_type(&self) -> DocumentType {
        self.doc_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// ============================================================================
// Extracted Text
// ============================================================================

/// Plain text of a document as an ordered sequence of lines
///
/// Always holds at least one (possibly empty) line, so a document with no
/// readable content still has a first line to fall back on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    lines: Vec<String>,
}

impl ExtractedText {
    /// Create from already-split lines
    pub fn from_lines(lines: Vec<String>) -> Self {
        if lines.is_empty() {
            return Self {
                lines: vec![String::new()],
            };
        }
        Self { lines }
    }

    /// Split a text blob on newlines (`\r\n` and `\n`)
    pub fn from_text(text: &str) -> Self {
        Self::from_lines(
            text.split('\n')
                .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
                .collect(),
        )
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Iterate over `(line index, line)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines.iter().enumerate().map(|(i, l)| (i, l.as_str()))
    }

    /// The first line with visible content, trimmed; empty if there is none
    pub fn first_non_empty_line(&self) -> &str {
        self.lines
            .iter()
            .map(|l| l.trim())
            .find(|l| !l.is_empty())
            .unwrap_or("")
    }

    /// Whether every line is blank
    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }

    /// Rejoin the lines with `\n`
    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }
}

// ============================================================================
// Matches
// ============================================================================

/// Field kinds produced by the rule-based extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Email,
    Phone,
    Education,
    Qualification,
    Project,
    Skill,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Education => "education",
            Self::Qualification => "qualification",
            Self::Project => "project",
            Self::Skill => "skill",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rule-based extraction hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMatch {
    pub field: FieldKind,
    /// Matched substring, or the whole line for line rules
    pub text: String,
    /// Index of the line the match starts on
    pub line: usize,
    /// Identifier of the rule that produced the match
    pub rule_id: String,
}

impl FieldMatch {
    pub fn new(field: FieldKind, text: impl Into<String>, line: usize, rule_id: impl Into<String>) -> Self {
        Self {
            field,
            text: text.into(),
            line,
            rule_id: rule_id.into(),
        }
    }
}

/// Named entity categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityCategory {
    #[serde(rename = "PERSON")]
    Person,
    #[serde(rename = "ORG")]
    Org,
    #[serde(rename = "GPE")]
    Gpe,
}

impl EntityCategory {
    pub const ALL: [EntityCategory; 3] = [Self::Person, Self::Org, Self::Gpe];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Person => "PERSON",
            Self::Org => "ORG",
            Self::Gpe => "GPE",
        }
    }
}

impl std::str::FromStr for EntityCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PERSON" => Ok(Self::Person),
            "ORG" => Ok(Self::Org),
            "GPE" => Ok(Self::Gpe),
            other => Err(format!("unknown entity category: {other}")),
        }
    }
}

impl std::fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which kind of recognizer produced an entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityOrigin {
    /// Pretrained statistical model
    #[default]
    Model,
    /// Lexicon span scorer; not trusted for the candidate name
    Lexicon,
}

/// One statistical-model extraction hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMatch {
    pub category: EntityCategory,
    pub text: String,
    pub line: usize,
    /// Model score for the winning category
    pub score: f32,
    #[serde(default)]
    pub origin: EntityOrigin,
}

impl EntityMatch {
    pub fn new(category: EntityCategory, text: impl Into<String>) -> Self {
        Self {
            category,
            text: text.into(),
            line: 0,
            score: 1.0,
            origin: EntityOrigin::Model,
        }
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    pub fn with_origin(mut self, origin: EntityOrigin) -> Self {
        self.origin = origin;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
