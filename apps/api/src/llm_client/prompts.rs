//! Prompt templates for every generation the service performs.
//! Placeholders `{job_description}` and `{cv_text}` are substituted verbatim.

use crate::llm_client::LlmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    CoverLetter,
    /// ATS rewrite returned as plain text, rendered into a document.
    AtsText,
    /// ATS rewrite returned as JSON matching the `Resume` schema.
    AtsStructured,
    Roast,
}

impl PromptKind {
    fn template(self) -> &'static str {
        match self {
            PromptKind::CoverLetter => COVER_LETTER_PROMPT,
            PromptKind::AtsText => ATS_TEXT_PROMPT,
            PromptKind::AtsStructured => ATS_STRUCTURED_PROMPT,
            PromptKind::Roast => ROAST_PROMPT,
        }
    }

    fn needs_job_description(self) -> bool {
        !matches!(self, PromptKind::Roast)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PromptInputs<'a> {
    pub cv_text: &'a str,
    pub job_description: Option<&'a str>,
}

pub fn build_prompt(kind: PromptKind, inputs: &PromptInputs<'_>) -> Result<String, LlmError> {
    if inputs.cv_text.trim().is_empty() {
        return Err(LlmError::InvalidInput("CV content is empty".to_string()));
    }

    let job_description = inputs.job_description.unwrap_or_default();
    if kind.needs_job_description() && job_description.trim().is_empty() {
        return Err(LlmError::InvalidInput(
            "job description is empty".to_string(),
        ));
    }

    // Job description first: a CV containing the literal `{job_description}`
    // must not be expanded.
    Ok(kind
        .template()
        .replace("{job_description}", job_description.trim())
        .replace("{cv_text}", inputs.cv_text.trim()))
}

pub const COVER_LETTER_PROMPT: &str = r#"Based on the following resume/CV and job description, please create a compelling cover letter.
The cover letter should:
1. Be personalized based on the candidate's experience in the CV
2. Address key requirements from the job description
3. Highlight the most relevant skills and experiences
4. Show enthusiasm for the role and company
5. Be professional but conversational in tone
6. Be around 300-400 words in length

Job Description:
{job_description}

Candidate's CV:
{cv_text}

Please write a complete cover letter that the candidate can use or adapt. Return plain text only, with paragraphs separated by a blank line."#;

pub const ATS_TEXT_PROMPT: &str = r#"You are an expert CV/resume formatter that specializes in creating ATS-friendly resumes.
Your task is to reformat the provided CV to optimize it for Applicant Tracking Systems (ATS) based on the job description.
Follow these guidelines:
1. Use a clean, standard formatting
2. Include relevant keywords from the job description
3. Quantify achievements where the CV already provides the numbers
4. Emphasize skills and experiences that match the job requirements
5. Format the sections in a standardized way: Contact Information, Professional Summary, Work Experience, Skills, Education
6. Never invent employers, dates, degrees or achievements that are not in the CV

Here is the job description:
{job_description}

Here is the CV to optimize:
{cv_text}

Please provide only the optimized CV content as plain text, with sections separated by a blank line."#;

pub const ATS_STRUCTURED_PROMPT: &str = r#"You are an expert CV/resume writer that specializes in ATS-friendly resumes.
Parse the CV below and rewrite it so it is optimized for the job description, then return it as a single JSON object.

Rules:
- Use keywords from the job description where they truthfully apply to the candidate.
- Never invent employers, dates, degrees, links or achievements that are not in the CV.
- Use empty strings or empty arrays for information the CV does not contain.
- Respond with valid JSON only: no markdown fences, no explanations.

OUTPUT SCHEMA (return exactly this structure):
{
  "header": {
    "fullname": "string", "jobTitle": "string", "location": "string", "email": "string",
    "phone": "string", "linkedin": "string", "linkedinUrl": "string",
    "github": "string", "githubUrl": "string", "website": "string", "websiteUrl": "string"
  },
  "profileSummary": "string",
  "skills": [{"title": "string", "values": ["string"]}],
  "experiences": [{"company": "string", "occupation": "string", "startDate": "string", "endDate": "string", "location": "string", "desc": ["string"]}],
  "education": [{"degree": "string", "institution": "string", "startDate": "string", "endDate": "string", "location": "string", "desc": ["string"]}],
  "projects": [{"title": "string", "link": "string", "subtitle": "string", "desc": ["string"]}],
  "awards": [{"title": "string", "link": "string", "issuer": "string", "date": "string", "desc": ["string"]}],
  "sectionOrder": ["header", "profileSummary", "experiences", "education", "skills", "projects", "awards"]
}

JOB DESCRIPTION:
{job_description}

CV:
{cv_text}"#;

pub const ROAST_PROMPT: &str = r#"You are a brutally honest CV reviewer. Your job is to "roast" the following CV by:
1. Identifying weak, generic, or cliché language
2. Pointing out missing or vague quantifiable achievements
3. Highlighting formatting or structure issues
4. Noting overused buzzwords or jargon
5. Suggesting specific improvements
Be direct, somewhat humorous, but ultimately constructive. The goal is to help the person improve their CV through honest feedback.

Here is the CV to roast:
{cv_text}

Provide your feedback as bullet points with clear, actionable suggestions for improvement."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roast_prompt_needs_only_cv() {
        let prompt = build_prompt(
            PromptKind::Roast,
            &PromptInputs {
                cv_text: "Responsible for managing things",
                job_description: None,
            },
        )
        .unwrap();
        assert!(prompt.contains("Responsible for managing things"));
        assert!(!prompt.contains("{cv_text}"));
    }

    #[test]
    fn test_job_description_required_for_other_kinds() {
        for kind in [
            PromptKind::CoverLetter,
            PromptKind::AtsText,
            PromptKind::AtsStructured,
        ] {
            let result = build_prompt(
                kind,
                &PromptInputs {
                    cv_text: "Jane Doe",
                    job_description: Some("   "),
                },
            );
            assert!(
                matches!(result, Err(LlmError::InvalidInput(ref m)) if m.contains("job description")),
                "{kind:?}"
            );
        }
    }

    #[test]
    fn test_empty_cv_is_rejected() {
        let result = build_prompt(PromptKind::Roast, &PromptInputs::default());
        assert!(matches!(result, Err(LlmError::InvalidInput(_))));
    }

    #[test]
    fn test_placeholders_substituted_once() {
        let prompt = build_prompt(
            PromptKind::CoverLetter,
            &PromptInputs {
                cv_text: "My CV mentions {job_description} literally",
                job_description: Some("Backend engineer, Rust"),
            },
        )
        .unwrap();
        assert!(prompt.contains("Backend engineer, Rust"));
        assert!(prompt.contains("My CV mentions {job_description} literally"));
    }

    #[test]
    fn test_structured_prompt_names_every_section() {
        for key in crate::resume::CANONICAL_SECTION_ORDER {
            assert!(ATS_STRUCTURED_PROMPT.contains(key), "{key}");
        }
    }
}
