//! Mock provider implementations for testing and dry runs.

use super::{
    AiExtractor, DeliveryMessage, DeliveryProvider, DocumentContext, ProviderError,
    ProviderResponse,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Delivery provider that keeps every message instead of sending it.
pub struct RecordingDeliveryProvider {
    enabled: bool,
    send_count: AtomicU64,
    sent: Mutex<Vec<DeliveryMessage>>,
}

impl RecordingDeliveryProvider {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            send_count: AtomicU64::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }

    pub fn sent_messages(&self) -> Vec<DeliveryMessage> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl DeliveryProvider for RecordingDeliveryProvider {
    async fn send(&self, message: &DeliveryMessage) -> Result<ProviderResponse, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NotConfigured(
                "Recording delivery provider is not enabled".to_string(),
            ));
        }
        if !message.to.contains('@') {
            return Err(ProviderError::InvalidRecipient(message.to.clone()));
        }

        let count = self.send_count.fetch_add(1, Ordering::SeqCst) + 1;
        match self.sent.lock() {
            Ok(mut sent) => sent.push(message.clone()),
            Err(poisoned) => poisoned.into_inner().push(message.clone()),
        }

        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            attachments = message.attachments.len(),
            "[MOCK] Message would be delivered"
        );

        Ok(ProviderResponse::success(Some(format!("mock-delivery-{}", count))))
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// AI extractor returning a canned response.
pub struct MockAiExtractor {
    enabled: bool,
    response: Result<String, String>,
}

impl MockAiExtractor {
    /// Answers every document with `response`.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            enabled: true,
            response: Ok(response.into()),
        }
    }

    /// Fails every request with an API error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            enabled: true,
            response: Err(message.into()),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            response: Err("disabled".to_string()),
        }
    }
}

#[async_trait]
impl AiExtractor for MockAiExtractor {
    async fn extract(
        &self,
        document: &DocumentContext,
        _categories: &[&str],
    ) -> Result<String, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NotConfigured(
                "Mock AI extractor not enabled".to_string(),
            ));
        }
        tracing::debug!(file_name = %document.file_name, "[MOCK] Extracting document");
        self.response.clone().map_err(ProviderError::ApiError)
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}
