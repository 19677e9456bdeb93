//! crates/module_assistant_core/src/extract.rs
//!
//! Turns an uploaded file into plain text usable as AI context.
//!
//! Extraction never fails for a single file: unreadable archives yield
//! empty text and unknown binaries yield a bounded placeholder, so the
//! worst case still signals to the AI that a file was attached. Only the
//! caller decides whether an all-empty result is an error.

use crate::domain::{SupportingText, MAX_EXTRACTED_CHARS, TRUNCATION_MARKER};
use crate::ports::PdfTextTool;
use base64::Engine;
use regex::Regex;
use serde::Serialize;
use std::io::{Cursor, Read};
use std::sync::OnceLock;

/// Number of base64 characters included in binary-file placeholders.
const BASE64_PREVIEW_CHARS: usize = 1024;

fn docx_paragraphs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<w:p[^>]*>").expect("valid regex"))
}

fn odt_paragraphs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<text:p[^>]*>").expect("valid regex"))
}

fn any_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid regex"))
}

/// Extracts readable text from one uploaded file.
///
/// Dispatch is by file extension first, then by mime prefix; anything else
/// is treated as an opaque binary. The result is capped at
/// [`MAX_EXTRACTED_CHARS`] characters with [`TRUNCATION_MARKER`] appended
/// when the cap was hit.
pub async fn extract(
    bytes: &[u8],
    filename: &str,
    mimetype: &str,
    pdf_tool: &dyn PdfTextTool,
) -> SupportingText {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let extracted = match extension.as_str() {
        "txt" | "md" | "html" | "htm" => String::from_utf8_lossy(bytes).into_owned(),
        "docx" => archived_xml_text(bytes, "word/document.xml", docx_paragraphs()),
        "odt" => archived_xml_text(bytes, "content.xml", odt_paragraphs()),
        _ if is_plain_mimetype(mimetype) => String::from_utf8_lossy(bytes).into_owned(),
        "pdf" => pdf_text(bytes, filename, mimetype, pdf_tool).await,
        _ if mimetype == "application/pdf" => pdf_text(bytes, filename, mimetype, pdf_tool).await,
        _ => binary_placeholder("BINARY FILE", bytes, filename, mimetype),
    };

    let (text, truncated) = cap_text(extracted);
    SupportingText {
        filename: filename.to_owned(),
        mimetype: mimetype.to_owned(),
        text,
        truncated,
    }
}

fn is_plain_mimetype(mimetype: &str) -> bool {
    mimetype.starts_with("text/")
        || mimetype.starts_with("application/xml")
        || mimetype.starts_with("application/json")
}

/// Opens the zip container and strips the known inner XML part down to
/// plain text. Any archive or part failure yields empty text.
fn archived_xml_text(bytes: &[u8], part: &str, paragraphs: &Regex) -> String {
    let mut archive = match zip::ZipArchive::new(Cursor::new(bytes)) {
        Ok(archive) => archive,
        Err(_) => return String::new(),
    };
    let mut xml = String::new();
    match archive.by_name(part) {
        Ok(mut entry) => {
            if entry.read_to_string(&mut xml).is_err() {
                return String::new();
            }
        }
        Err(_) => return String::new(),
    }
    let xml = paragraphs.replace_all(&xml, "\n");
    let xml = xml.replace("<br />", "\n");
    any_tag().replace_all(&xml, "").into_owned()
}

async fn pdf_text(
    bytes: &[u8],
    filename: &str,
    mimetype: &str,
    pdf_tool: &dyn PdfTextTool,
) -> String {
    if pdf_tool.available() {
        if let Ok(text) = pdf_tool.extract_text(bytes).await {
            if !text.trim().is_empty() {
                return text;
            }
        }
    }
    binary_placeholder("PDF FILE", bytes, filename, mimetype)
}

fn binary_placeholder(label: &str, bytes: &[u8], filename: &str, mimetype: &str) -> String {
    let mut preview = base64::engine::general_purpose::STANDARD.encode(bytes);
    preview.truncate(BASE64_PREVIEW_CHARS);
    format!("[{label}: {filename} ({mimetype}); base64_preview={preview}]")
}

fn cap_text(text: String) -> (String, bool) {
    match text.char_indices().nth(MAX_EXTRACTED_CHARS) {
        Some((byte_index, _)) => {
            let mut capped = text[..byte_index].to_owned();
            capped.push_str(TRUNCATION_MARKER);
            (capped, true)
        }
        None => (text, false),
    }
}

//=========================================================================================
// Chapter Splitting (upload-to-book workflow)
//=========================================================================================

/// One chapter split out of an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chapter {
    pub title: String,
    pub html: String,
}

/// Splits extracted plain text into book chapters.
///
/// Blocks are separated by blank lines; a block whose first line is short
/// enough to read as a heading starts a new chapter titled with that line.
/// Text before any heading lands in a "Chapter 1" catch-all.
pub fn split_into_chapters(text: &str) -> Vec<Chapter> {
    const HEADING_MAX_CHARS: usize = 80;

    let mut chapters: Vec<Chapter> = Vec::new();
    for block in text.split("\n\n").map(str::trim).filter(|b| !b.is_empty()) {
        let mut lines = block.lines();
        let first = lines.next().unwrap_or_default().trim();
        let rest: Vec<&str> = lines.map(str::trim).filter(|l| !l.is_empty()).collect();

        let is_heading =
            first.chars().count() <= HEADING_MAX_CHARS && !first.ends_with(['.', ':', ';']);
        if is_heading {
            let html = rest
                .iter()
                .map(|line| format!("<p>{}</p>", crate::markup::escape_html(line)))
                .collect();
            chapters.push(Chapter {
                title: first.to_owned(),
                html,
            });
        } else {
            if chapters.is_empty() {
                chapters.push(Chapter {
                    title: "Chapter 1".to_owned(),
                    html: String::new(),
                });
            }
            let paragraphs: String = std::iter::once(first)
                .chain(rest.into_iter())
                .map(|line| format!("<p>{}</p>", crate::markup::escape_html(line)))
                .collect();
            if let Some(last) = chapters.last_mut() {
                last.html.push_str(&paragraphs);
            }
        }
    }
    chapters
}
