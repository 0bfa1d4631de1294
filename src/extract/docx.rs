//! DOCX raw-text extraction.
//!
//! Reads `word/document.xml` out of the zip container and flattens it: text
//! runs are concatenated, tabs and breaks are kept, and every paragraph ends
//! with a blank line.

use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{Cursor, Read};
use thiserror::Error;

const DOCUMENT_PART: &str = "word/document.xml";

#[derive(Error, Debug)]
pub enum DocxError {
    #[error("not a valid DOCX container: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("missing word/document.xml")]
    MissingDocument,

    #[error("failed to read document part: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document XML: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Whether a zip archive looks like a Word document.
pub fn is_word_document(bytes: &[u8]) -> bool {
    zip::ZipArchive::new(Cursor::new(bytes))
        .map(|archive| archive.index_for_name(DOCUMENT_PART).is_some())
        .unwrap_or(false)
}

/// Extract the raw text of a DOCX file held in memory.
pub fn extract_text(bytes: &[u8]) -> Result<String, DocxError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    match archive.by_name(DOCUMENT_PART) {
        Ok(mut part) => {
            part.read_to_string(&mut xml)?;
        }
        Err(zip::result::ZipError::FileNotFound) => return Err(DocxError::MissingDocument),
        Err(e) => return Err(e.into()),
    }
    document_xml_to_text(&xml)
}

/// Flatten WordprocessingML body XML into plain text.
pub fn document_xml_to_text(xml: &str) -> Result<String, DocxError> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_text_run = false;
    // Tab stop definitions inside paragraph properties are also `w:tab`.
    let mut in_properties = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"t" => in_text_run = true,
                b"pPr" => in_properties = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" if !in_properties => text.push('\t'),
                b"br" | b"cr" => text.push('\n'),
                b"p" => text.push_str("\n\n"),
                _ => {}
            },
            Event::Text(e) if in_text_run => {
                text.push_str(&e.unescape()?);
            }
            Event::CData(e) if in_text_run => {
                text.push_str(&String::from_utf8_lossy(&e));
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"pPr" => in_properties = false,
                b"p" => text.push_str("\n\n"),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}
