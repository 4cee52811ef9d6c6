//! Structured résumé output for `format` requests.
//!
//! Flow: ATS structured prompt → strip fences → deserialize → validate.
//! Deserialization already turns absent/null collections into empty vectors;
//! validation only repairs `sectionOrder`. Neither step invents content.

pub mod models;

use tracing::debug;

pub use models::Resume;

use crate::llm_client::{ask, strip_json_fences, LlmError, PromptInputs, PromptKind, TextGenerator};

/// Display order used when the model omits or garbles `sectionOrder`.
pub const CANONICAL_SECTION_ORDER: [&str; 7] = [
    "header",
    "profileSummary",
    "experiences",
    "education",
    "skills",
    "projects",
    "awards",
];

/// Normalizes `section_order`: keeps known keys in first-seen order, drops
/// unknown and duplicate keys, and falls back to the canonical order when
/// nothing usable remains. Idempotent.
pub fn validate_resume(mut resume: Resume) -> Resume {
    let mut order: Vec<String> = Vec::with_capacity(CANONICAL_SECTION_ORDER.len());
    for key in &resume.section_order {
        let key = key.trim();
        if CANONICAL_SECTION_ORDER.contains(&key) && !order.iter().any(|k| k == key) {
            order.push(key.to_string());
        }
    }
    if order.is_empty() {
        order = CANONICAL_SECTION_ORDER
            .iter()
            .map(|k| k.to_string())
            .collect();
    }
    resume.section_order = order;
    resume
}

/// Parses a raw model reply (possibly fenced) into a validated [`Resume`].
pub fn parse_resume_reply(raw: &str) -> Result<Resume, LlmError> {
    let json = strip_json_fences(raw);
    let resume: Resume = serde_json::from_str(json)?;
    Ok(validate_resume(resume))
}

/// Asks the model for an ATS-optimized structured résumé.
pub async fn optimize(
    generator: &dyn TextGenerator,
    cv_text: &str,
    job_description: &str,
) -> Result<Resume, LlmError> {
    let reply = ask(
        generator,
        PromptKind::AtsStructured,
        &PromptInputs {
            cv_text,
            job_description: Some(job_description),
        },
    )
    .await?;
    debug!("Structured reply received: {} chars", reply.len());
    parse_resume_reply(&reply)
}
