//! PDF document parser using pdf-extract
//!
//! Extracts text page by page so that page order, and with it the
//! document's first line, is preserved. Each page is extracted on its own:
//! a page the backend cannot read yields an empty line and the remaining
//! pages are still read.

use std::panic::{self, AssertUnwindSafe};

use pdf_extract::{Document, OutputError, PlainTextOutput};
use tracing::warn;

use cvx_core::DocumentType;

use crate::{DocumentParser, ParserError, Result};

/// PDF document parser
pub struct PdfParser {
    /// Drop form feed characters the backend emits at page boundaries
    pub strip_form_feeds: bool,
}

impl PdfParser {
    /// Create a new PDF parser with default settings
    pub fn new() -> Self {
        Self {
            strip_form_feeds: true,
        }
    }

    /// Keep or drop form feed characters
    pub fn with_form_feeds(mut self, keep: bool) -> Self {
        self.strip_form_feeds = !keep;
        self
    }

    /// Extract the text of each page, in page order
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>> {
        // lopdf panics on some malformed inputs instead of returning an error
        let loaded = panic::catch_unwind(|| Document::load_mem(bytes)).map_err(|_| {
            ParserError::CorruptedFile("PDF backend aborted while opening the document".to_string())
        })?;
        let mut doc = loaded.map_err(|e| ParserError::PdfError(e.to_string()))?;

        if doc.is_encrypted() {
            doc.decrypt("")
                .map_err(|e| ParserError::PdfError(format!("encrypted document: {e}")))?;
        }

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        Ok(page_numbers
            .into_iter()
            .map(|page_num| self.extract_page(&doc, page_num))
            .collect())
    }

    /// Text of one page; empty when the page cannot be read
    fn extract_page(&self, doc: &Document, page_num: u32) -> String {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut text = String::new();
            {
                let mut output = PlainTextOutput::new(&mut text);
                pdf_extract::output_doc_page(doc, &mut output, page_num)?;
            }
            Ok::<_, OutputError>(text)
        }));

        match outcome {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(page = page_num, error = %e, "Unreadable PDF page");
                String::new()
            }
            Err(_) => {
                warn!(page = page_num, "PDF backend aborted on page");
                String::new()
            }
        }
    }

    /// Join pages with a newline between them and split into lines
    fn join_pages(&self, pages: Vec<String>) -> Vec<String> {
        let page_count = pages.len();
        let mut lines = Vec::new();

        for page in pages {
            let page = if self.strip_form_feeds {
                page.replace('\x0C', "")
            } else {
                page
            };

            let body = page.trim_end_matches(['\n', '\r']);
            lines.extend(
                body.split('\n')
                    .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string()),
            );
        }

        tracing::trace!(pages = page_count, lines = lines.len(), "Joined PDF pages");
        lines
    }
}

impl Default for PdfParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for PdfParser {
    fn extract_lines(&self, bytes: &[u8]) -> Result<Vec<String>> {
        let pages = self.extract_pages(bytes)?;
        Ok(self.join_pages(pages))
    }

    fn supported_types(&self) -> &[DocumentType] {
        &[DocumentType::Pdf]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    fn pages(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_join_pages_preserves_order() {
        let parser = PdfParser::new();
        let lines = parser.join_pages(pages(&["Jane Smith\nEngineer\n", "Projects\n"]));
        assert_eq!(lines, vec!["Jane Smith", "Engineer", "Projects"]);
    }

    #[test]
    fn test_blank_page_becomes_empty_line() {
        let parser = PdfParser::new();
        let lines = parser.join_pages(pages(&["First", "", "\x0CThird"]));
        assert_eq!(lines, vec!["First", "", "Third"]);
    }

    #[test]
    fn test_form_feeds_kept_on_request() {
        let parser = PdfParser::new().with_form_feeds(true);
        let lines = parser.join_pages(pages(&["\x0CPage"]));
        assert_eq!(lines, vec!["\x0CPage"]);
    }

    #[test]
    fn test_no_pages_yields_no_lines() {
        let parser = PdfParser::new();
        assert!(parser.join_pages(Vec::new()).is_empty());
    }

    /// Build a PDF with one page per entry; pages listed in `broken` get no
    /// MediaBox, which the backend cannot render
    fn pdf(pages: &[&[&str]], broken: &[usize]) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for (i, lines) in pages.iter().enumerate() {
            let mut operations = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
            ];
            for line in lines.iter() {
                operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
                operations.push(Operation::new("Td", vec![0.into(), (-24).into()]));
            }
            operations.push(Operation::new("ET", vec![]));

            let content = Content { operations }.encode().unwrap();
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            };
            if !broken.contains(&i) {
                let media_box: Vec<Object> = vec![0.into(), 0.into(), 595.into(), 842.into()];
                page.set("MediaBox", media_box);
            }
            kids.push(doc.add_object(page).into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    fn text_lines(lines: &[String]) -> Vec<&str> {
        lines
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect()
    }

    #[test]
    fn test_pages_in_order() {
        let parser = PdfParser::new();
        let bytes = pdf(
            &[&["Jane Smith", "jane@example.com"], &["Page two"], &["Built a compiler"]],
            &[],
        );
        let lines = parser.extract_lines(&bytes).unwrap();
        assert_eq!(
            text_lines(&lines),
            vec!["Jane Smith", "jane@example.com", "Page two", "Built a compiler"]
        );
    }

    #[test]
    fn test_blank_pdf_page_is_empty() {
        let parser = PdfParser::new();
        let pages = parser
            .extract_pages(&pdf(&[&["First"], &[], &["Third"]], &[]))
            .unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].trim(), "First");
        assert_eq!(pages[1].trim(), "");
        assert_eq!(pages[2].trim(), "Third");
    }

    #[test]
    fn test_pdf_without_text_yields_a_line() {
        let parser = PdfParser::new();
        let lines = parser.extract_lines(&pdf(&[&[]], &[])).unwrap();
        assert!(!lines.is_empty());
        assert!(text_lines(&lines).is_empty());
    }

    #[test]
    fn test_unreadable_page_does_not_drop_others() {
        let parser = PdfParser::new();
        let bytes = pdf(&[&["Jane Smith"], &["Lost page"], &["Built a compiler"]], &[1]);

        let pages = parser.extract_pages(&bytes).unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[1], "");

        let lines = parser.extract_lines(&bytes).unwrap();
        assert_eq!(text_lines(&lines), vec!["Jane Smith", "Built a compiler"]);
    }

    #[test]
    fn test_garbage_bytes_fail() {
        let parser = PdfParser::new();
        assert!(parser.extract_lines(b"%PDF-1.4 truncated").is_err());
    }

    #[test]
    fn test_supported_types() {
        let parser = PdfParser::new();
        assert!(parser.can_parse(DocumentType::Pdf));
        assert!(!parser.can_parse(DocumentType::Docx));
    }
}
