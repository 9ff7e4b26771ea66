//! CVX Parser - Document loading for résumé files
//!
//! Supports loading of:
//! - PDF documents (text per page, in page order)
//! - Microsoft Word (DOCX) documents (text per paragraph, in document order)
//!
//! Each parser implements the `DocumentParser` trait and produces the raw
//! lines of a document. `DocumentLoader` picks the parser for the declared
//! type and wraps the lines in an `ExtractedText`.

pub mod docx;
pub mod pdf;

pub use docx::DocxParser;
pub use pdf::PdfParser;

use cvx_core::{CvError, Document, DocumentType, ExtractedText};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during document loading
#[derive(Error, Debug)]
pub enum ParserError {
    /// Declared type is not one we can load
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// PDF parsing error
    #[error("PDF parsing error: {0}")]
    PdfError(String),

    /// DOCX parsing error
    #[error("DOCX parsing error: {0}")]
    DocxError(String),

    /// File is corrupted or malformed
    #[error("File is corrupted or malformed: {0}")]
    CorruptedFile(String),
}

pub type Result<T> = std::result::Result<T, ParserError>;

impl From<ParserError> for CvError {
    fn from(err: ParserError) -> Self {
        match err {
            ParserError::UnsupportedFormat(t) => CvError::UnsupportedFormat(t),
            other => CvError::ExtractionFailure(other.to_string()),
        }
    }
}

// ============================================================================
// Parser Trait
// ============================================================================

/// Trait for document parsers
pub trait DocumentParser: Send + Sync {
    /// Extract the document's lines in reading order
    ///
    /// Blank or unreadable pages and paragraphs come back as empty lines;
    /// only a container that cannot be opened at all is an error.
    fn extract_lines(&self, bytes: &[u8]) -> Result<Vec<String>>;

    /// Get supported document types
    fn supported_types(&self) -> &[DocumentType];

    /// Check if this parser can handle a document type
    fn can_parse(&self, doc_type: DocumentType) -> bool {
        self.supported_types().contains(&doc_type)
    }
}

// ============================================================================
// Document Loader
// ============================================================================

/// Registry of parsers keyed by declared document type
pub struct DocumentLoader {
    parsers: Vec<Box<dyn DocumentParser>>,
}

impl DocumentLoader {
    /// Create a loader with no parsers registered
    pub fn empty() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Create a loader with the PDF and DOCX parsers registered
    pub fn new() -> Self {
        let mut loader = Self::empty();
        loader.register(PdfParser::new());
        loader.register(DocxParser::new());
        loader
    }

    /// Register a parser
    pub fn register<P: DocumentParser + 'static>(&mut self, parser: P) {
        self.parsers.push(Box::new(parser));
    }

    /// Find a parser for a document type
    pub fn find_parser(&self, doc_type: DocumentType) -> Option<&dyn DocumentParser> {
        self.parsers
            .iter()
            .find(|p| p.can_parse(doc_type))
            .map(|p| p.as_ref())
    }

    /// Load the text of a document
    pub fn load(&self, document: &Document) -> Result<ExtractedText> {
        let doc_type = document.doc_type();
        let parser = self
            .find_parser(doc_type)
            .ok_or_else(|| ParserError::UnsupportedFormat(doc_type.to_string()))?;

        let lines = parser.extract_lines(document.bytes())?;
        let text = ExtractedText::from_lines(lines);

        tracing::debug!(
            doc_type = %doc_type,
            bytes = document.len(),
            lines = text.line_count(),
            "Loaded document text"
        );

        Ok(text)
    }
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Load text from raw bytes and a declared type string (`"pdf"` or `"docx"`)
pub fn load(bytes: &[u8], declared_type: &str) -> cvx_core::Result<ExtractedText> {
    let document = Document::from_declared(bytes, declared_type)?;
    Ok(DocumentLoader::new().load(&document)?)
}

// ============================================================================
// Tests
// ============================================================================
