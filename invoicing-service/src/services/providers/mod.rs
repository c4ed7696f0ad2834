//! Collaborator abstractions for invoicing-service.
//!
//! Document extraction, document rendering, delivery and access control live
//! outside the financial engine; these traits are the seams they plug into.

pub mod access;
pub mod mock;
pub mod renderer;

use crate::models::{CompanySettings, Customer, Invoice};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use access::AllowListPolicy;
pub use mock::{MockAiExtractor, RecordingDeliveryProvider};
pub use renderer::TextInvoiceRenderer;

/// Error type for provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub provider_id: Option<String>,
    pub success: bool,
    pub message: Option<String>,
}

impl ProviderResponse {
    pub fn success(provider_id: Option<String>) -> Self {
        Self {
            provider_id,
            success: true,
            message: None,
        }
    }
}

/// An uploaded supplier document.
#[derive(Debug, Clone, Default)]
pub struct DocumentContext {
    pub file_name: String,
    pub mime_type: String,
    /// Where the upload layer stored the file.
    pub url: Option<String>,
    pub bytes: Vec<u8>,
    /// Pre-extracted text content.
    pub text_content: Option<String>,
}

impl DocumentContext {
    pub fn is_pdf(&self) -> bool {
        self.file_name.to_lowercase().ends_with(".pdf")
    }
}

/// A language model that reads a supplier document and answers with a JSON
/// object using the keys `leverancier, factuurnummer, datum, categorie,
/// beschrijving, subtotaal, btw, totaal`.
#[async_trait]
pub trait AiExtractor: Send + Sync {
    async fn extract(
        &self,
        document: &DocumentContext,
        categories: &[&str],
    ) -> Result<String, ProviderError>;
    fn is_enabled(&self) -> bool;
}

/// A rendered invoice document.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    /// Retrievable reference stored on the invoice.
    pub location: String,
}

#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(
        &self,
        invoice: &Invoice,
        customer: &Customer,
        settings: &CompanySettings,
    ) -> Result<RenderedDocument, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct DeliveryMessage {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub body_text: String,
    pub from_name: Option<String>,
    pub reply_to: Option<String>,
    pub attachments: Vec<Attachment>,
}

#[async_trait]
pub trait DeliveryProvider: Send + Sync {
    async fn send(&self, message: &DeliveryMessage) -> Result<ProviderResponse, ProviderError>;
    fn is_enabled(&self) -> bool;
}

/// Decides who may use the application.
#[async_trait]
pub trait AccessPolicy: Send + Sync {
    async fn is_allowed(&self, email: &str) -> bool;
}
