//! DOCX text extraction and rendering.
//!
//! A DOCX file is a zip package; all visible text lives in
//! `word/document.xml` as `w:t` runs grouped into `w:p` paragraphs.

use std::io::{Cursor, Read, Write};

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::warn;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::documents::layout::split_paragraphs;
use crate::documents::{non_empty, DocumentCodec, DocumentError, Template};

const DOCUMENT_PART: &str = "word/document.xml";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_PROLOG: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#;

const DOCUMENT_EPILOG: &str = r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="1134" w:right="1134" w:bottom="1134" w:left="1134" w:header="708" w:footer="708" w:gutter="0"/></w:sectPr></w:body></w:document>"#;

/// Paragraph spacing in twips.
const LINE_SPACING_AFTER: u32 = 120;
const PARAGRAPH_SPACING_AFTER: u32 = 240;

pub struct DocxCodec;

impl DocumentCodec for DocxCodec {
    fn extract(&self, bytes: &[u8]) -> Result<String, DocumentError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| DocumentError::MalformedDocument(format!("opening DOCX archive: {e}")))?;

        let xml = read_document_part(&mut archive)?;
        non_empty(text_from_document_xml(&xml)?)
    }

    fn write(&self, text: &str, template: Option<&Template>) -> Result<Vec<u8>, DocumentError> {
        let body = paragraphs_xml(text);

        if let Some(template) = template {
            match write_from_template(&template.bytes, &body) {
                Ok(bytes) => return Ok(bytes),
                Err(e) => warn!("DOCX template unusable ({e}); using a blank document"),
            }
        }

        write_blank(&body)
    }
}

fn read_document_part<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<String, DocumentError> {
    let mut xml = String::new();
    match archive.by_name(DOCUMENT_PART) {
        Ok(mut part) => {
            part.read_to_string(&mut xml).map_err(|e| {
                DocumentError::MalformedDocument(format!("reading {DOCUMENT_PART}: {e}"))
            })?;
        }
        Err(ZipError::FileNotFound) => {
            return Err(DocumentError::MalformedDocument(format!(
                "{DOCUMENT_PART} not found"
            )))
        }
        Err(e) => {
            return Err(DocumentError::MalformedDocument(format!(
                "opening {DOCUMENT_PART}: {e}"
            )))
        }
    }
    Ok(xml)
}

/// Streams the document XML, joining runs with a space and paragraphs with a newline.
fn text_from_document_xml(xml: &str) -> Result<String, DocumentError> {
    let mut reader = Reader::from_str(xml);

    let mut paragraphs: Vec<String> = Vec::new();
    let mut runs: Vec<String> = Vec::new();
    let mut run = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => {
                in_text = true;
                run.clear();
            }
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| {
                    DocumentError::MalformedDocument(format!("decoding {DOCUMENT_PART}: {e}"))
                })?;
                run.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => {
                    in_text = false;
                    let trimmed = run.trim();
                    if !trimmed.is_empty() {
                        runs.push(trimmed.to_string());
                    }
                }
                b"p" if !runs.is_empty() => paragraphs.push(std::mem::take(&mut runs).join(" ")),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(DocumentError::MalformedDocument(format!(
                    "parsing {DOCUMENT_PART} at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
    }
    if !runs.is_empty() {
        paragraphs.push(runs.join(" "));
    }

    Ok(paragraphs.join("\n"))
}

fn paragraphs_xml(text: &str) -> String {
    let mut xml = String::new();
    for paragraph in split_paragraphs(text) {
        let last = paragraph.len().saturating_sub(1);
        for (i, line) in paragraph.iter().enumerate() {
            let after = if i == last {
                PARAGRAPH_SPACING_AFTER
            } else {
                LINE_SPACING_AFTER
            };
            let cleaned: String = line
                .chars()
                .filter(|c| !c.is_control() || *c == '\t')
                .collect();
            xml.push_str(&format!(
                concat!(
                    r#"<w:p><w:pPr><w:spacing w:before="0" w:after="{after}"/></w:pPr>"#,
                    r#"<w:r><w:rPr><w:rFonts w:ascii="Arial" w:hAnsi="Arial" w:cs="Arial"/><w:sz w:val="22"/></w:rPr>"#,
                    r#"<w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#
                ),
                after = after,
                text = escape(cleaned.as_str()),
            ));
        }
    }
    xml
}

fn deflated() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

fn write_blank(body: &str) -> Result<Vec<u8>, DocumentError> {
    let document = format!("{DOCUMENT_PROLOG}{body}{DOCUMENT_EPILOG}");
    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES_XML),
        ("_rels/.rels", RELS_XML),
        (DOCUMENT_PART, document.as_str()),
    ];

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in parts {
        writer
            .start_file(name, deflated())
            .map_err(|e| DocumentError::Write(format!("adding {name}: {e}")))?;
        writer
            .write_all(content.as_bytes())
            .map_err(|e| DocumentError::Write(format!("writing {name}: {e}")))?;
    }
    let cursor = writer
        .finish()
        .map_err(|e| DocumentError::Write(format!("finishing DOCX archive: {e}")))?;
    Ok(cursor.into_inner())
}

/// Copies every part of the template and swaps the body paragraphs of its
/// main document for `body`, keeping the template's section properties.
fn write_from_template(template: &[u8], body: &str) -> Result<Vec<u8>, DocumentError> {
    let template_err = |e: &dyn std::fmt::Display| DocumentError::Template(e.to_string());

    let mut archive = ZipArchive::new(Cursor::new(template)).map_err(|e| template_err(&e))?;
    let xml = read_document_part(&mut archive)?;
    let document = replace_body(&xml, body)
        .ok_or_else(|| DocumentError::Template(format!("{DOCUMENT_PART} has no w:body")))?;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for i in 0..archive.len() {
        let part = archive.by_index_raw(i).map_err(|e| template_err(&e))?;
        if part.name() == DOCUMENT_PART {
            continue;
        }
        writer.raw_copy_file(part).map_err(|e| template_err(&e))?;
    }
    writer
        .start_file(DOCUMENT_PART, deflated())
        .map_err(|e| DocumentError::Write(e.to_string()))?;
    writer
        .write_all(document.as_bytes())
        .map_err(|e| DocumentError::Write(e.to_string()))?;

    let cursor = writer
        .finish()
        .map_err(|e| DocumentError::Write(format!("finishing DOCX archive: {e}")))?;
    Ok(cursor.into_inner())
}

fn replace_body(xml: &str, body: &str) -> Option<String> {
    let body_open = xml.find("<w:body")?;
    let prolog_end = body_open + xml[body_open..].find('>')? + 1;
    let body_close = xml.rfind("</w:body>")?;
    if body_close < prolog_end {
        return None;
    }

    let inner = &xml[prolog_end..body_close];
    let section = inner
        .rfind("<w:sectPr")
        .and_then(|offset| trailing_section(&inner[offset..]))
        .unwrap_or("");

    Some(format!(
        "{}{body}{section}{}",
        &xml[..prolog_end],
        &xml[body_close..]
    ))
}

/// Accepts `tail` only when it is a single `w:sectPr` element closing the
/// body. A section break nested in a paragraph's `w:pPr` is rejected.
fn trailing_section(tail: &str) -> Option<&str> {
    let tail = tail.trim_end();
    let self_closing = tail.ends_with("/>") && tail.find('>') == Some(tail.len() - 1);
    if self_closing || (tail.ends_with("</w:sectPr>") && tail.matches("<w:sectPr").count() == 1) {
        Some(tail)
    } else {
        None
    }
}
