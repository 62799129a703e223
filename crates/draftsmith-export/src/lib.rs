//! Document exporter: turns a heading → draft mapping into a downloadable
//! DOCX file.
//!
//! The output is a flat sequence of blocks: one styled heading per section
//! followed by one paragraph per newline-delimited chunk of its draft. No
//! per-section page breaks. Sections with blank bodies are skipped; a fully
//! blank input aborts with [`DraftError::NothingToExport`] instead of
//! producing an empty file.

use docx_rs::{Docx, Paragraph, Run};
use draftsmith_core::error::{DraftError, Result};
use draftsmith_core::session::DraftRegistry;
use std::io::Cursor;
use tracing::debug;

/// Heading styling: bold, 16pt (docx half-points), accent blue.
const HEADING_SIZE: usize = 32;
const HEADING_COLOR: &str = "2E74B5";

/// Fallback file stem when the title sanitizes to nothing.
const DEFAULT_FILE_STEM: &str = "draft";

/// A rendered document ready to hand to a file-save mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedDocument {
    /// Suggested file name, derived from the caller-supplied title.
    pub file_name: String,
    /// The DOCX file contents.
    pub bytes: Vec<u8>,
}

/// Renders `(heading, body)` pairs into a DOCX document.
///
/// Pairs whose body is blank after trimming are skipped. `title` only feeds
/// the suggested file name; it does not become a document block.
pub fn render_document(
    title: Option<&str>,
    sections: &[(String, String)],
) -> Result<ExportedDocument> {
    let printable: Vec<&(String, String)> = sections
        .iter()
        .filter(|(_, body)| !body.trim().is_empty())
        .collect();
    if printable.is_empty() {
        return Err(DraftError::NothingToExport);
    }

    let mut docx = Docx::new();
    for (heading, body) in printable {
        docx = docx.add_paragraph(
            Paragraph::new().add_run(
                Run::new()
                    .add_text(heading.as_str())
                    .bold()
                    .size(HEADING_SIZE)
                    .color(HEADING_COLOR),
            ),
        );
        for chunk in paragraph_chunks(body) {
            docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(chunk)));
        }
    }

    let mut cursor = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut cursor)
        .map_err(|e| DraftError::internal(format!("failed to pack docx: {:?}", e)))?;

    let file_name = format!("{}.docx", sanitize_file_stem(title));
    debug!(%file_name, "document rendered");
    Ok(ExportedDocument {
        file_name,
        bytes: cursor.into_inner(),
    })
}

/// Renders the registry's non-blank sections, in display order.
pub fn render_registry(title: Option<&str>, registry: &DraftRegistry) -> Result<ExportedDocument> {
    render_document(title, &registry.non_blank_pairs())
}

/// Splits a draft body into paragraph chunks on runs of consecutive
/// newlines; blank chunks are dropped.
fn paragraph_chunks(body: &str) -> impl Iterator<Item = &str> {
    body.split('\n')
        .map(str::trim_end)
        .filter(|chunk| !chunk.trim().is_empty())
}

/// Derives a filesystem-safe file stem from a document title: alphanumeric
/// characters are kept, whitespace becomes a single underscore, everything
/// else is stripped. Falls back to `draft` when nothing survives.
pub fn sanitize_file_stem(title: Option<&str>) -> String {
    let mut stem = String::new();
    for ch in title.unwrap_or_default().trim().chars() {
        if ch.is_alphanumeric() {
            stem.push(ch);
        } else if ch.is_whitespace() && !stem.is_empty() && !stem.ends_with('_') {
            stem.push('_');
        }
    }
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        DEFAULT_FILE_STEM.to_string()
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(entries: &[(&str, &str)]) -> Vec<(String, String)> {
        entries
            .iter()
            .map(|(h, b)| (h.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn skips_blank_sections_and_keeps_the_rest() {
        let document = render_document(
            Some("My NDA!!"),
            &pairs(&[("A", "  "), ("B", "hello")]),
        )
        .unwrap();
        assert_eq!(document.file_name, "My_NDA.docx");
        assert!(!document.bytes.is_empty());
    }

    #[test]
    fn fully_blank_input_is_an_export_error() {
        let err = render_document(Some("Empty"), &pairs(&[("A", " "), ("B", "\n\n")])).unwrap_err();
        assert_eq!(err, DraftError::NothingToExport);
        let err = render_document(None, &[]).unwrap_err();
        assert_eq!(err, DraftError::NothingToExport);
    }

    #[test]
    fn file_name_falls_back_to_draft() {
        assert_eq!(sanitize_file_stem(None), "draft");
        assert_eq!(sanitize_file_stem(Some("!!!")), "draft");
        assert_eq!(sanitize_file_stem(Some("  ")), "draft");
    }

    #[test]
    fn file_name_sanitization_rules() {
        assert_eq!(sanitize_file_stem(Some("My NDA!!")), "My_NDA");
        assert_eq!(sanitize_file_stem(Some("Lease  (2026) draft")), "Lease_2026_draft");
        assert_eq!(sanitize_file_stem(Some("a/b\\c")), "abc");
    }

    #[test]
    fn paragraph_chunks_split_on_newline_runs() {
        let chunks: Vec<&str> = paragraph_chunks("one\n\ntwo\n   \nthree\n").collect();
        assert_eq!(chunks, ["one", "two", "three"]);
    }

    #[test]
    fn registry_export_uses_display_order() {
        let mut registry = DraftRegistry::new();
        registry.set_draft("Zeta", "z text");
        registry.set_draft("Alpha", "a text");
        let document = render_registry(Some("Order"), &registry).unwrap();
        assert_eq!(document.file_name, "Order.docx");
        // DOCX bytes are a zip; presence is enough here, ordering is covered
        // by the registry's own tests.
        assert!(!document.bytes.is_empty());
    }
}
