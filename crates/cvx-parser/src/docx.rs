//! DOCX document parser using docx-rs
//!
//! Emits one line per paragraph in document order. Paragraphs inside table
//! cells are emitted cell by cell, row by row, since résumé templates often
//! lay out contact details in tables.

use cvx_core::DocumentType;
use docx_rs::{
    read_docx, DocumentChild, Paragraph, ParagraphChild, RunChild, TableCellContent, TableChild,
    TableRowChild,
};

use crate::{DocumentParser, ParserError, Result};

/// DOCX document parser
pub struct DocxParser {
    /// Whether to read paragraphs inside tables
    pub include_tables: bool,
}

impl DocxParser {
    /// Create a new DOCX parser with default settings
    pub fn new() -> Self {
        Self {
            include_tables: true,
        }
    }

    /// Enable or disable table extraction
    pub fn with_tables(mut self, enabled: bool) -> Self {
        self.include_tables = enabled;
        self
    }

    /// Text of one paragraph; soft line breaks become newlines
    fn paragraph_text(para: &Paragraph) -> String {
        let mut text = String::new();
        Self::collect_children(&para.children, &mut text);
        text
    }

    fn collect_children(children: &[ParagraphChild], text: &mut String) {
        for child in children {
            match child {
                ParagraphChild::Run(run) => {
                    for run_child in &run.children {
                        match run_child {
                            RunChild::Text(t) => text.push_str(&t.text),
                            RunChild::Tab(_) => text.push('\t'),
                            RunChild::Break(_) => text.push('\n'),
                            _ => {}
                        }
                    }
                }
                ParagraphChild::Hyperlink(link) => Self::collect_children(&link.children, text),
                _ => {}
            }
        }
    }

    fn push_paragraph(lines: &mut Vec<String>, para: &Paragraph) {
        let text = Self::paragraph_text(para);
        lines.extend(text.split('\n').map(str::to_string));
    }
}

impl Default for DocxParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for DocxParser {
    fn extract_lines(&self, bytes: &[u8]) -> Result<Vec<String>> {
        let docx = read_docx(bytes).map_err(|e| ParserError::DocxError(e.to_string()))?;

        let mut lines = Vec::new();

        for child in &docx.document.children {
            match child {
                DocumentChild::Paragraph(para) => Self::push_paragraph(&mut lines, para),
                DocumentChild::Table(tbl) if self.include_tables => {
                    for row in &tbl.rows {
                        let TableChild::TableRow(tr) = row;
                        for cell in &tr.cells {
                            let TableRowChild::TableCell(tc) = cell;
                            for content in &tc.children {
                                if let TableCellContent::Paragraph(para) = content {
                                    Self::push_paragraph(&mut lines, para);
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        tracing::trace!(lines = lines.len(), "Read DOCX paragraphs");
        Ok(lines)
    }

    fn supported_types(&self) -> &[DocumentType] {
        &[DocumentType::Docx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, Run, Table, TableCell, TableRow};
    use std::io::Cursor;

    fn para(text: &str) -> Paragraph {
        Paragraph::new().add_run(Run::new().add_text(text))
    }

    fn pack(docx: Docx) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        docx.build().pack(&mut buf).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_paragraphs_in_order() {
        let bytes = pack(
            Docx::new()
                .add_paragraph(para("Jane Smith"))
                .add_paragraph(para("jane@example.com"))
                .add_paragraph(para("Bachelor of Science")),
        );

        let lines = DocxParser::new().extract_lines(&bytes).unwrap();
        assert_eq!(
            lines,
            vec!["Jane Smith", "jane@example.com", "Bachelor of Science"]
        );
    }

    #[test]
    fn test_empty_paragraph_is_empty_line() {
        let bytes = pack(
            Docx::new()
                .add_paragraph(Paragraph::new())
                .add_paragraph(para("Jane Smith")),
        );

        let lines = DocxParser::new().extract_lines(&bytes).unwrap();
        assert_eq!(lines, vec!["", "Jane Smith"]);
    }

    #[test]
    fn test_table_cells_are_lines() {
        let table = Table::new(vec![TableRow::new(vec![
            TableCell::new().add_paragraph(para("Phone: 555-123-4567")),
            TableCell::new().add_paragraph(para("London")),
        ])]);
        let bytes = pack(
            Docx::new()
                .add_paragraph(para("Jane Smith"))
                .add_table(table),
        );

        let lines = DocxParser::new().extract_lines(&bytes).unwrap();
        assert_eq!(lines, vec!["Jane Smith", "Phone: 555-123-4567", "London"]);

        let lines = DocxParser::new()
            .with_tables(false)
            .extract_lines(&bytes)
            .unwrap();
        assert_eq!(lines, vec!["Jane Smith"]);
    }

    #[test]
    fn test_multiple_runs_join() {
        let bytes = pack(Docx::new().add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text("Certi"))
                .add_run(Run::new().add_text("fied Scrum Master")),
        ));

        let lines = DocxParser::new().extract_lines(&bytes).unwrap();
        assert_eq!(lines, vec!["Certified Scrum Master"]);
    }

    #[test]
    fn test_supported_types() {
        let parser = DocxParser::new();
        assert!(parser.can_parse(DocumentType::Docx));
        assert!(!parser.can_parse(DocumentType::Pdf));
    }
}
