//! Application API for invoicing-service.
//!
//! `InvoicingApi` is what an HTTP layer calls. It loads records through the
//! repository, runs the domain rules, persists the result and talks to the
//! collaborators (renderer, delivery, AI extraction, access policy).

mod customers;
mod expenses;
mod invoices;
mod reports;

use crate::config::InvoicingConfig;
use crate::error::DomainError;
use crate::models::CompanySettings;
use crate::services::extraction::ExtractionPipeline;
use crate::services::metrics::record_error;
use crate::services::providers::{
    AccessPolicy, AiExtractor, AllowListPolicy, DeliveryProvider, DocumentRenderer, ProviderError,
    RecordingDeliveryProvider, TextInvoiceRenderer,
};
use crate::services::{Clock, InvoicingRepository, SystemClock};
use service_core::error::AppError;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use validator::Validate;

pub use invoices::SendOptions;

/// Record a rejected request and hand the error back for propagation.
pub(crate) fn reject(err: impl Into<AppError>) -> AppError {
    let err = err.into();
    record_error(err.kind());
    if err.is_client_error() {
        warn!(error = %err, "Request rejected");
    } else {
        tracing::error!(error = %err, "Request failed");
    }
    err
}

pub(crate) fn not_found(what: &str, id: impl std::fmt::Display) -> AppError {
    reject(AppError::NotFound(anyhow::anyhow!("{} {} not found", what, id)))
}

pub(crate) fn gateway(err: ProviderError) -> AppError {
    reject(AppError::BadGateway(err.to_string()))
}

/// The bookkeeping application: invoices, expenses, customers and reports.
pub struct InvoicingApi {
    repo: Arc<dyn InvoicingRepository>,
    renderer: Arc<dyn DocumentRenderer>,
    delivery: Arc<dyn DeliveryProvider>,
    access: Arc<dyn AccessPolicy>,
    clock: Arc<dyn Clock>,
    extraction: ExtractionPipeline,
    config: InvoicingConfig,
    /// Serializes number assignment so two creates never take the same number.
    numbering: Mutex<()>,
}

impl InvoicingApi {
    /// Wire the API with default collaborators: the allow-list from config,
    /// the text renderer, a disabled delivery provider, the wall clock and
    /// pattern-only extraction.
    pub fn new(config: InvoicingConfig, repo: Arc<dyn InvoicingRepository>) -> Self {
        let access = Arc::new(AllowListPolicy::new(&config.allowed_emails));
        Self {
            repo,
            renderer: Arc::new(TextInvoiceRenderer::default()),
            delivery: Arc::new(RecordingDeliveryProvider::new(false)),
            access,
            clock: Arc::new(SystemClock),
            extraction: ExtractionPipeline::pattern_only(),
            config,
            numbering: Mutex::new(()),
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn DocumentRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_delivery(mut self, delivery: Arc<dyn DeliveryProvider>) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn with_access_policy(mut self, access: Arc<dyn AccessPolicy>) -> Self {
        self.access = access;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Installs the AI extractor when `ai_extraction_enabled` is set;
    /// otherwise extraction stays pattern-only.
    pub fn with_ai_extractor(mut self, ai: Arc<dyn AiExtractor>) -> Self {
        if self.config.ai_extraction_enabled {
            self.extraction = ExtractionPipeline::new(Some(ai));
        } else {
            info!("AI extraction disabled in configuration; using pattern matching only");
        }
        self
    }

    pub fn config(&self) -> &InvoicingConfig {
        &self.config
    }

    /// Admit or refuse a signed-in user by e-mail address.
    #[instrument(skip(self), fields(service = "invoicing-service", method = "Authorize"))]
    pub async fn authorize(&self, email: &str) -> Result<(), AppError> {
        if self.access.is_allowed(email).await {
            Ok(())
        } else {
            Err(reject(AppError::Forbidden(anyhow::anyhow!(
                "{} is not allowed to use this application",
                email
            ))))
        }
    }

    /// Current company settings; created from configuration on first use.
    #[instrument(skip(self), fields(service = "invoicing-service", method = "GetSettings"))]
    pub async fn get_settings(&self) -> Result<CompanySettings, AppError> {
        if let Some(settings) = self.repo.load_settings().await? {
            return Ok(settings);
        }
        let settings = CompanySettings::new(
            self.config.service_name.clone(),
            self.config.invoice_prefix.clone(),
        );
        self.repo.save_settings(&settings).await?;
        info!(prefix = %settings.invoice_prefix, "Default company settings created");
        Ok(settings)
    }

    /// Replace the company settings. The invoice counter never moves back.
    #[instrument(skip(self, settings), fields(service = "invoicing-service", method = "UpdateSettings"))]
    pub async fn update_settings(
        &self,
        mut settings: CompanySettings,
    ) -> Result<CompanySettings, AppError> {
        settings.validate().map_err(reject)?;
        customers::require_company_name(Some(&settings.company_name))?;
        if settings.invoice_prefix.trim().is_empty() {
            return Err(reject(DomainError::Validation(
                "Invoice prefix is required".to_string(),
            )));
        }

        let _guard = self.numbering.lock().await;
        let current = self.get_settings().await?;
        if settings.next_invoice_number < current.next_invoice_number {
            warn!(
                requested = settings.next_invoice_number,
                current = current.next_invoice_number,
                "Refusing to rewind invoice counter"
            );
            settings.next_invoice_number = current.next_invoice_number;
        }
        self.repo.save_settings(&settings).await?;
        info!(company = %settings.company_name, "Company settings updated");
        Ok(settings)
    }
}
