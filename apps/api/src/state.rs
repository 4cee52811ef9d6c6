use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::documents::TemplateSettings;
use crate::llm_client::TextGenerator;
use crate::processing::CvProcessor;
use crate::routes::rate_limit::RateLimits;
use crate::storage::ArtifactStore;
use crate::webhook::WebhookClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub processor: CvProcessor,
    pub webhook: WebhookClient,
    /// Process-wide buckets; every clone of the state shares them.
    pub limits: Arc<RateLimits>,
}

impl AppState {
    /// Wires the processor, webhook client and rate limiters from `config`.
    /// The generator and store are passed in so tests can substitute them.
    pub fn new(
        config: Config,
        llm: Arc<dyn TextGenerator>,
        store: Arc<dyn ArtifactStore>,
    ) -> Result<Self> {
        let templates = TemplateSettings {
            pdf: config.pdf_template.clone(),
            docx: config.docx_template.clone(),
            required: config.template_required,
        };
        let processor = CvProcessor::new(llm, store, templates);
        let webhook = WebhookClient::new(config.webhook_url.clone(), config.webhook_secret.clone())?;
        let limits = Arc::new(RateLimits::new(
            config.rate_limit_per_minute,
            config.rate_limit_per_day,
        )?);

        Ok(Self {
            config,
            processor,
            webhook,
            limits,
        })
    }
}
