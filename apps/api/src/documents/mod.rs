//! Document ingestion and rendering.
//!
//! Every supported format implements [`DocumentCodec`]: `extract` turns raw
//! upload bytes into plain text, `write` turns plain text back into a styled
//! document. Callers pick an implementation with [`codec_for`].

pub mod docx;
pub mod layout;
pub mod pdf;
pub mod sections;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use crate::documents::docx::DocxCodec;
use crate::documents::pdf::PdfCodec;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("malformed document: {0}")]
    MalformedDocument(String),

    #[error("extracted text is empty")]
    EmptyResult,

    #[error("template unavailable: {0}")]
    Template(String),

    #[error("failed to write document: {0}")]
    Write(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Resolves the format from an uploaded filename's extension (case-insensitive).
    pub fn from_filename(filename: &str) -> Result<Self, DocumentError> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => Ok(DocumentFormat::Pdf),
            "docx" => Ok(DocumentFormat::Docx),
            _ => Err(DocumentError::UnsupportedFormat(format!(".{ext}"))),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "application/pdf",
            DocumentFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

/// A template file loaded into memory, ready to be handed to a writer.
#[derive(Debug, Clone)]
pub struct Template {
    pub bytes: Vec<u8>,
}

/// Per-format template paths plus the policy applied when one cannot be read.
#[derive(Debug, Clone, Default)]
pub struct TemplateSettings {
    pub pdf: Option<PathBuf>,
    pub docx: Option<PathBuf>,
    /// When false a missing or unreadable template falls back to a blank document.
    pub required: bool,
}

impl TemplateSettings {
    pub fn load(&self, format: DocumentFormat) -> Result<Option<Template>, DocumentError> {
        let path = match format {
            DocumentFormat::Pdf => self.pdf.as_ref(),
            DocumentFormat::Docx => self.docx.as_ref(),
        };
        let Some(path) = path else {
            if self.required {
                return Err(DocumentError::Template(format!(
                    "no {} template configured",
                    format.extension()
                )));
            }
            return Ok(None);
        };

        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(Template { bytes })),
            Err(e) if self.required => Err(DocumentError::Template(format!(
                "{}: {e}",
                path.display()
            ))),
            Err(e) => {
                warn!(
                    "Template {} unavailable ({e}); using a blank document",
                    path.display()
                );
                Ok(None)
            }
        }
    }
}

/// Format-specific extraction and rendering.
pub trait DocumentCodec: Send + Sync {
    /// Returns the document's plain text. Never returns an empty string.
    fn extract(&self, bytes: &[u8]) -> Result<String, DocumentError>;

    /// Renders `text` as a document, reusing `template` when it can be parsed.
    fn write(&self, text: &str, template: Option<&Template>) -> Result<Vec<u8>, DocumentError>;
}

static PDF_CODEC: PdfCodec = PdfCodec;
static DOCX_CODEC: DocxCodec = DocxCodec;

pub fn codec_for(format: DocumentFormat) -> &'static dyn DocumentCodec {
    match format {
        DocumentFormat::Pdf => &PDF_CODEC,
        DocumentFormat::Docx => &DOCX_CODEC,
    }
}

/// Trims extractor output and turns an empty result into an error.
pub(crate) fn non_empty(text: String) -> Result<String, DocumentError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DocumentError::EmptyResult);
    }
    if trimmed.len() == text.len() {
        Ok(text)
    } else {
        Ok(trimmed.to_string())
    }
}
