//! CV processing: request preconditions, the response record, and the
//! orchestrator that drives extraction, AI calls and persistence.

pub mod orchestrator;

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::documents::DocumentFormat;
use crate::errors::AppError;
use crate::resume::Resume;

pub use orchestrator::CvProcessor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Format,
    Roast,
    Letter,
}

impl Mode {
    pub fn requires_job_description(self) -> bool {
        matches!(self, Mode::Format | Mode::Letter)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Format => "format",
            Mode::Roast => "roast",
            Mode::Letter => "letter",
        }
    }
}

impl FromStr for Mode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "format" => Ok(Mode::Format),
            "roast" => Ok(Mode::Roast),
            "letter" => Ok(Mode::Letter),
            _ => Err(AppError::Validation(
                "mode must be one of 'format', 'roast' or 'letter'".to_string(),
            )),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a `format` result is delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormatOutput {
    /// Structured `Resume` JSON in the response body.
    #[default]
    Structured,
    /// Rewritten CV rendered as a document and persisted.
    File,
}

impl FromStr for FormatOutput {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "json" => Ok(FormatOutput::Structured),
            "file" => Ok(FormatOutput::File),
            _ => Err(AppError::Validation(
                "output must be 'json' or 'file'".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Completed,
    Failed,
}

/// Result of one request. Returned to the caller and forwarded to the webhook.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub document_id: String,
    pub status: ProcessStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume: Option<Resume>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_letter_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessResponse {
    pub fn new(document_id: String) -> Self {
        Self {
            document_id,
            status: ProcessStatus::Completed,
            resume: None,
            cover_letter: None,
            cover_letter_file: None,
            formatted_file: None,
            feedback: None,
            error: None,
        }
    }

    pub fn fail(&mut self, message: String) {
        self.status = ProcessStatus::Failed;
        self.error = Some(message);
    }

    pub fn is_completed(&self) -> bool {
        self.status == ProcessStatus::Completed
    }
}

/// The file part of a multipart upload, before validation.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Bytes,
}

/// Raw multipart fields as received.
#[derive(Debug, Clone, Default)]
pub struct ProcessForm {
    pub document_id: Option<String>,
    pub mode: Option<String>,
    pub job_description: Option<String>,
    pub output: Option<String>,
    pub file: Option<UploadedFile>,
}

/// An upload whose format has been recognised. Lives only until extraction.
#[derive(Debug)]
pub struct UploadedDocument {
    pub filename: String,
    pub format: DocumentFormat,
    pub bytes: Bytes,
}

#[derive(Debug)]
pub struct ValidatedRequest {
    pub document_id: String,
    pub mode: Mode,
    pub output: FormatOutput,
    pub job_description: Option<String>,
    pub document: UploadedDocument,
}

/// Checks every precondition that can be decided without a remote call.
pub fn validate_request(form: ProcessForm, max_file_size: u64) -> Result<ValidatedRequest, AppError> {
    let mode: Mode = form.mode.as_deref().unwrap_or_default().parse()?;

    let job_description = form
        .job_description
        .map(|jd| jd.trim().to_string())
        .filter(|jd| !jd.is_empty());
    if mode.requires_job_description() && job_description.is_none() {
        return Err(AppError::Validation(format!(
            "jobDescription is required for {mode} mode"
        )));
    }

    let output: FormatOutput = form.output.as_deref().unwrap_or_default().parse()?;

    let file = form
        .file
        .ok_or_else(|| AppError::Validation("No file provided".to_string()))?;

    let format = DocumentFormat::from_filename(&file.filename).map_err(|_| {
        AppError::Validation("Unsupported file type; only PDF and DOCX are allowed".to_string())
    })?;

    if file.bytes.len() as u64 > max_file_size {
        return Err(file_too_large(max_file_size));
    }

    let document_id = form
        .document_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    Ok(ValidatedRequest {
        document_id,
        mode,
        output,
        job_description,
        document: UploadedDocument {
            filename: file.filename,
            format,
            bytes: file.bytes,
        },
    })
}

pub fn file_too_large(max_file_size: u64) -> AppError {
    AppError::Validation(format!("File size exceeds limit: {max_file_size} bytes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(mode: &str, jd: Option<&str>, filename: &str, size: usize) -> ProcessForm {
        ProcessForm {
            document_id: None,
            mode: Some(mode.to_string()),
            job_description: jd.map(str::to_string),
            output: None,
            file: Some(UploadedFile {
                filename: filename.to_string(),
                bytes: Bytes::from(vec![b'x'; size]),
            }),
        }
    }

    fn validation_message(result: Result<ValidatedRequest, AppError>) -> String {
        match result {
            Err(AppError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_format_requires_job_description() {
        let msg = validation_message(validate_request(form("format", None, "cv.pdf", 10), 100));
        assert_eq!(msg, "jobDescription is required for format mode");

        let msg = validation_message(validate_request(
            form("letter", Some("   "), "cv.pdf", 10),
            100,
        ));
        assert_eq!(msg, "jobDescription is required for letter mode");
    }

    #[test]
    fn test_roast_needs_no_job_description() {
        let request = validate_request(form("roast", None, "cv.docx", 10), 100).unwrap();
        assert_eq!(request.mode, Mode::Roast);
        assert_eq!(request.document.format, DocumentFormat::Docx);
        assert!(request.job_description.is_none());
        assert!(Uuid::parse_str(&request.document_id).is_ok());
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let msg = validation_message(validate_request(form("ats", None, "cv.pdf", 10), 100));
        assert!(msg.contains("mode must be one of"));

        let mut no_mode = form("roast", None, "cv.pdf", 10);
        no_mode.mode = None;
        assert!(validate_request(no_mode, 100).is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let msg = validation_message(validate_request(form("roast", None, "cv.txt", 10), 100));
        assert_eq!(msg, "Unsupported file type; only PDF and DOCX are allowed");
    }

    #[test]
    fn test_oversized_file() {
        let msg = validation_message(validate_request(form("roast", None, "cv.pdf", 101), 100));
        assert_eq!(msg, "File size exceeds limit: 100 bytes");
        assert!(validate_request(form("roast", None, "cv.pdf", 100), 100).is_ok());
    }

    #[test]
    fn test_missing_file() {
        let mut no_file = form("roast", None, "cv.pdf", 1);
        no_file.file = None;
        assert_eq!(
            validation_message(validate_request(no_file, 100)),
            "No file provided"
        );
    }

    #[test]
    fn test_output_and_document_id() {
        let mut f = form("format", Some("Rust engineer"), "cv.pdf", 1);
        f.output = Some("file".to_string());
        f.document_id = Some(" doc-42 ".to_string());
        let request = validate_request(f, 100).unwrap();
        assert_eq!(request.output, FormatOutput::File);
        assert_eq!(request.document_id, "doc-42");
        assert_eq!(request.job_description.as_deref(), Some("Rust engineer"));

        let mut bad = form("format", Some("Rust engineer"), "cv.pdf", 1);
        bad.output = Some("html".to_string());
        assert!(validate_request(bad, 100).is_err());
    }

    #[test]
    fn test_response_serialization_omits_empty_fields() {
        let mut response = ProcessResponse::new("doc-1".to_string());
        response.feedback = Some("Too many buzzwords".to_string());
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "documentId": "doc-1",
                "status": "completed",
                "feedback": "Too many buzzwords"
            })
        );

        response.fail("Failed to roast CV: boom".to_string());
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error"], "Failed to roast CV: boom");
    }
}
