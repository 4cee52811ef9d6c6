use std::path::PathBuf;

use anyhow::{bail, Context, Result};

const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Where generated documents are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    S3 {
        bucket: String,
        endpoint: Option<String>,
        region: String,
    },
}

/// Application configuration loaded from environment variables.
/// Start-up fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    /// Bearer secret callers must present on authenticated routes.
    pub service_api_key: String,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
    pub max_file_size: u64,
    pub docx_template: Option<PathBuf>,
    pub pdf_template: Option<PathBuf>,
    pub template_required: bool,
    pub storage: StorageBackend,
    pub webhook_url: Option<String>,
    pub webhook_secret: String,
    pub rate_limit_per_minute: u32,
    pub rate_limit_per_day: u32,
    pub shutdown_grace_secs: u64,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let port = parse_env("PORT", 8080u16)?;

        let max_file_size = parse_env("MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE)?;
        if max_file_size == 0 {
            bail!("MAX_FILE_SIZE must be positive, got 0");
        }

        let storage = match optional_env("STORAGE_BACKEND").as_deref() {
            None | Some("local") => StorageBackend::Local,
            Some("s3") => StorageBackend::S3 {
                bucket: require_env("S3_BUCKET")?,
                endpoint: optional_env("S3_ENDPOINT"),
                region: optional_env("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            },
            Some(other) => bail!("STORAGE_BACKEND must be 'local' or 's3', got '{other}'"),
        };

        Ok(Config {
            port,
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_model: optional_env("GEMINI_MODEL")
                .unwrap_or_else(|| "gemini-2.0-flash".to_string()),
            gemini_api_base: optional_env("GEMINI_API_BASE")
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string()),
            service_api_key: require_env("SERVICE_API_KEY")?,
            upload_dir: optional_env("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./uploads")),
            public_base_url: optional_env("PUBLIC_BASE_URL")
                .unwrap_or_else(|| format!("http://localhost:{port}")),
            max_file_size,
            docx_template: Some(
                optional_env("DOCX_TEMPLATE")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./templates/cv_template.docx")),
            ),
            pdf_template: Some(
                optional_env("PDF_TEMPLATE")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./templates/cv_template.pdf")),
            ),
            template_required: parse_env("TEMPLATE_REQUIRED", false)?,
            storage,
            webhook_url: optional_env("WEBHOOK_URL"),
            webhook_secret: optional_env("WEBHOOK_SECRET").unwrap_or_default(),
            rate_limit_per_minute: parse_env("RATE_LIMIT_PER_MINUTE", 10u32)?,
            rate_limit_per_day: parse_env("RATE_LIMIT_PER_DAY", 180u32)?,
            shutdown_grace_secs: parse_env("SHUTDOWN_GRACE_SECS", 5u64)?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    optional_env(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Returns the variable's value, treating empty strings as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid {key} value {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Configuration used by handler tests: local storage, no webhook, no templates.
    pub fn for_tests(upload_dir: PathBuf) -> Self {
        Config {
            port: 8080,
            gemini_api_key: "test-gemini-key".to_string(),
            gemini_model: "gemini-2.0-flash".to_string(),
            gemini_api_base: "http://127.0.0.1:9".to_string(),
            service_api_key: "test-secret".to_string(),
            upload_dir,
            public_base_url: "http://localhost:8080".to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            docx_template: None,
            pdf_template: None,
            template_required: false,
            storage: StorageBackend::Local,
            webhook_url: None,
            webhook_secret: String::new(),
            rate_limit_per_minute: 1000,
            rate_limit_per_day: 10_000,
            shutdown_grace_secs: 5,
            rust_log: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        let value: u32 = parse_env("RESUME_API_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("RESUME_API_TEST_BAD_NUMBER", "ten");
        let result: Result<u64> = parse_env("RESUME_API_TEST_BAD_NUMBER", 1);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("RESUME_API_TEST_BAD_NUMBER"));
    }

    #[test]
    fn test_optional_env_treats_blank_as_unset() {
        std::env::set_var("RESUME_API_TEST_BLANK", "   ");
        assert!(optional_env("RESUME_API_TEST_BLANK").is_none());
    }
}
