//! CV processing pipeline.
//!
//! Flow: extract text (blocking pool) → section scan (logged only) →
//!       mode-specific AI call → optional render + persist → response.
//!
//! Every failure after validation is reported in-band: the returned
//! [`ProcessResponse`] is marked failed with a "Failed to <action>: <cause>"
//! message and no later step runs.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::documents::sections::CvSections;
use crate::documents::{codec_for, DocumentError, DocumentFormat, TemplateSettings};
use crate::errors::AppError;
use crate::llm_client::{ask, PromptInputs, PromptKind, TextGenerator};
use crate::processing::{FormatOutput, Mode, ProcessResponse, UploadedDocument, ValidatedRequest};
use crate::resume;
use crate::storage::ArtifactStore;

#[derive(Clone)]
pub struct CvProcessor {
    llm: Arc<dyn TextGenerator>,
    store: Arc<dyn ArtifactStore>,
    templates: TemplateSettings,
}

impl CvProcessor {
    pub fn new(
        llm: Arc<dyn TextGenerator>,
        store: Arc<dyn ArtifactStore>,
        templates: TemplateSettings,
    ) -> Self {
        Self {
            llm,
            store,
            templates,
        }
    }

    /// Runs one validated request to completion. Never returns an error;
    /// failures end up in the response's `error` field.
    pub async fn process(&self, request: ValidatedRequest) -> ProcessResponse {
        let mut response = ProcessResponse::new(request.document_id.clone());
        let action = action_label(request.mode, request.output);
        info!(
            "Processing document {} ('{}') in {} mode",
            request.document_id, request.document.filename, request.mode
        );

        match self.run(request, &mut response).await {
            Ok(()) => info!("Document {} completed", response.document_id),
            Err(e) => {
                warn!("Document {} failed to {action}: {e}", response.document_id);
                response.fail(format!("Failed to {action}: {e}"));
            }
        }
        response
    }

    async fn run(
        &self,
        request: ValidatedRequest,
        response: &mut ProcessResponse,
    ) -> Result<(), AppError> {
        let format = request.document.format;

        // Step 1: Extract text; the upload bytes are dropped here
        let cv_text = extract_text(request.document).await?;
        debug!("Extracted {} chars of CV text", cv_text.len());

        // Step 2: Section scan, diagnostics only
        let sections = CvSections::from_text(&cv_text);
        debug!(
            "Detected {} section lines: education={}, experience={}, projects={}, skills={}",
            sections.line_count(),
            sections.education.len(),
            sections.experience.len(),
            sections.projects.len(),
            sections.skills.len()
        );

        // Step 3: Mode-specific generation
        let inputs = PromptInputs {
            cv_text: &cv_text,
            job_description: request.job_description.as_deref(),
        };

        match (request.mode, request.output) {
            (Mode::Format, FormatOutput::Structured) => {
                let jd = request.job_description.as_deref().unwrap_or_default();
                let resume = resume::optimize(self.llm.as_ref(), &cv_text, jd).await?;
                response.resume = Some(resume);
            }
            (Mode::Format, FormatOutput::File) => {
                let rewritten = ask(self.llm.as_ref(), PromptKind::AtsText, &inputs).await?;
                let name = format!("cv_{}_formatted.{}", Uuid::new_v4(), format.extension());
                let url = self.render_and_store(&rewritten, format, &name).await?;
                response.formatted_file = Some(url);
            }
            (Mode::Roast, _) => {
                let feedback = ask(self.llm.as_ref(), PromptKind::Roast, &inputs).await?;
                response.feedback = Some(feedback);
            }
            (Mode::Letter, _) => {
                let letter = ask(self.llm.as_ref(), PromptKind::CoverLetter, &inputs).await?;
                let name = format!("cover_letter_{}.{}", Uuid::new_v4(), format.extension());
                let url = self.render_and_store(&letter, format, &name).await?;
                response.cover_letter = Some(letter);
                response.cover_letter_file = Some(url);
            }
        }

        Ok(())
    }

    /// Renders `text` in the upload's format and hands it to the artifact store.
    async fn render_and_store(
        &self,
        text: &str,
        format: DocumentFormat,
        name: &str,
    ) -> Result<String, AppError> {
        let templates = self.templates.clone();
        let text = text.to_string();
        let bytes = tokio::task::spawn_blocking(move || {
            let template = templates.load(format)?;
            codec_for(format).write(&text, template.as_ref())
        })
        .await
        .map_err(|e| DocumentError::Write(format!("writer task failed: {e}")))??;

        debug!("Rendered {name}: {} bytes", bytes.len());
        let url = self.store.put(name, bytes, format.content_type()).await?;
        Ok(url)
    }
}

fn action_label(mode: Mode, output: FormatOutput) -> &'static str {
    match (mode, output) {
        (Mode::Format, FormatOutput::Structured) => "format CV",
        (Mode::Format, FormatOutput::File) => "generate formatted CV",
        (Mode::Roast, _) => "roast CV",
        (Mode::Letter, _) => "generate cover letter",
    }
}

/// Parsers are synchronous and may panic on hostile input, so they run on
/// the blocking pool and a panic surfaces as a malformed document.
async fn extract_text(document: UploadedDocument) -> Result<String, DocumentError> {
    let format = document.format;
    tokio::task::spawn_blocking(move || codec_for(format).extract(&document.bytes))
        .await
        .map_err(|e| DocumentError::MalformedDocument(format!("extractor aborted: {e}")))?
}
