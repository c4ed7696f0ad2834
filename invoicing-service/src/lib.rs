//! invoicing-service: bookkeeping engine for a two-partner business.
//!
//! Invoices, expenses, customers and period reports, with document
//! extraction, rendering and delivery behind collaborator traits.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use api::{InvoicingApi, SendOptions};
pub use config::InvoicingConfig;

/// Install tracing and register metrics for the process.
pub fn init_observability(config: &InvoicingConfig) {
    service_core::observability::init_tracing(
        &config.service_name,
        &config.common.log_level,
        config.common.log_json,
    );
    services::init_metrics();
}
