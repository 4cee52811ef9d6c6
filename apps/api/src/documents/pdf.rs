//! PDF text extraction and rendering.
//!
//! Extraction prefers `pdf-extract` (better spacing and reading order) and
//! falls back to page-by-page extraction through `lopdf`, skipping pages that
//! cannot be decoded. Only a document that cannot be opened at all is fatal.

use std::panic::{self, AssertUnwindSafe};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, warn};

use crate::documents::layout::{split_paragraphs, wrap_line};
use crate::documents::{non_empty, DocumentCodec, DocumentError, Template};

const MM: f32 = 72.0 / 25.4;
const A4: (f32, f32) = (595.28, 841.89);
const MARGIN: f32 = 20.0 * MM;
const FONT_SIZE: f32 = 11.0;
/// Average Helvetica glyph width as a fraction of the font size; drives wrapping.
const AVG_GLYPH_WIDTH: f32 = 0.5;
const LINE_HEIGHT: f32 = 6.0 * MM;
const LINE_GAP: f32 = 2.0 * MM;
const PARAGRAPH_GAP: f32 = 5.0 * MM;

pub struct PdfCodec;

impl DocumentCodec for PdfCodec {
    fn extract(&self, bytes: &[u8]) -> Result<String, DocumentError> {
        if bytes.is_empty() {
            return Err(DocumentError::MalformedDocument(
                "PDF file is empty".to_string(),
            ));
        }

        let document = Document::load_mem(bytes)
            .map_err(|e| DocumentError::MalformedDocument(format!("parsing PDF: {e}")))?;

        // pdf-extract panics on some fonts and encodings it cannot resolve.
        let primary = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(bytes)
        }));
        let text = match primary {
            Ok(Ok(pages)) if pages.iter().any(|p| !p.trim().is_empty()) => {
                debug!("pdf-extract read {} pages", pages.len());
                pages.join("\n")
            }
            Ok(Ok(_)) => {
                warn!("pdf-extract found no text; falling back to per-page extraction");
                extract_pages_tolerant(&document)
            }
            Ok(Err(e)) => {
                warn!("pdf-extract failed ({e}); falling back to per-page extraction");
                extract_pages_tolerant(&document)
            }
            Err(_) => {
                warn!("pdf-extract panicked; falling back to per-page extraction");
                extract_pages_tolerant(&document)
            }
        };

        non_empty(text)
    }

    fn write(&self, text: &str, template: Option<&Template>) -> Result<Vec<u8>, DocumentError> {
        let page_size = template
            .and_then(|t| template_page_size(&t.bytes))
            .unwrap_or(A4);
        render(text, page_size)
    }
}

/// Extracts each page on its own, skipping pages whose text cannot be decoded.
fn extract_pages_tolerant(document: &Document) -> String {
    let mut pages = Vec::new();
    for page_number in document.get_pages().keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) => pages.push(text),
            Err(e) => warn!("Skipping PDF page {page_number}: {e}"),
        }
    }
    pages.join("\n")
}

/// Reads the first page's MediaBox from a template PDF.
fn template_page_size(bytes: &[u8]) -> Option<(f32, f32)> {
    let document = match Document::load_mem(bytes) {
        Ok(d) => d,
        Err(e) => {
            warn!("PDF template unreadable ({e}); using A4");
            return None;
        }
    };
    let (_, page_id) = document.get_pages().into_iter().next()?;
    let page = document.get_object(page_id).ok()?.as_dict().ok()?;
    let media_box = page.get(b"MediaBox").ok()?.as_array().ok()?;
    if media_box.len() != 4 {
        return None;
    }
    let coords: Vec<f32> = media_box.iter().filter_map(number).collect();
    if coords.len() != 4 {
        return None;
    }
    let (width, height) = (coords[2] - coords[0], coords[3] - coords[1]);
    (width > 2.0 * MARGIN && height > 2.0 * MARGIN).then_some((width, height))
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn render(text: &str, (width, height): (f32, f32)) -> Result<Vec<u8>, DocumentError> {
    let max_chars = ((width - 2.0 * MARGIN) / (FONT_SIZE * AVG_GLYPH_WIDTH)) as usize;

    let mut pages: Vec<Vec<Operation>> = vec![Vec::new()];
    let mut y = height - MARGIN;

    for paragraph in split_paragraphs(text) {
        for line in &paragraph {
            for chunk in wrap_line(line, max_chars) {
                if y - LINE_HEIGHT < MARGIN {
                    pages.push(Vec::new());
                    y = height - MARGIN;
                }
                y -= LINE_HEIGHT;
                if let Some(ops) = pages.last_mut() {
                    ops.extend(text_line(&chunk, MARGIN, y));
                }
                y -= LINE_GAP;
            }
        }
        y -= PARAGRAPH_GAP;
    }

    build_document(pages, width, height)
}

fn text_line(line: &str, x: f32, y: f32) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new(
            "Tj",
            vec![Object::String(win_ansi(line), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
    ]
}

fn build_document(
    pages: Vec<Vec<Operation>>,
    width: f32,
    height: f32,
) -> Result<Vec<u8>, DocumentError> {
    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let media_box: Vec<Object> = vec![
        Object::Integer(0),
        Object::Integer(0),
        width.into(),
        height.into(),
    ];
    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations }
            .encode()
            .map_err(|e| DocumentError::Write(format!("encoding page content: {e}")))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => media_box.clone(),
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => media_box,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| DocumentError::Write(format!("serializing PDF: {e}")))?;
    Ok(bytes)
}

/// Encodes text for a WinAnsi Type1 font. Unmappable characters become '?'.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => b'\'',
            '\u{201C}' | '\u{201D}' => b'"',
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2022}' => 0x95,
            '\u{20AC}' => 0x80,
            '\t' => b' ',
            c if (c as u32) < 0x80 => c as u8,
            c if (0xA0..=0xFF).contains(&(c as u32)) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}
