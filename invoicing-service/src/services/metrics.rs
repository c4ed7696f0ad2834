//! Prometheus metrics for invoicing-service.

use once_cell::sync::Lazy;
use prometheus::{register_counter, register_counter_vec, Counter, CounterVec, TextEncoder};
use rust_decimal::prelude::ToPrimitive;

use crate::models::Money;

/// Invoice operations by kind.
pub static INVOICE_OPERATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_invoice_operations_total",
        "Total number of invoice operations",
        &["operation"] // create, update, send, pay, expire, delete
    )
    .expect("Failed to register invoice_operations_total")
});

/// Expense operations by kind.
pub static EXPENSE_OPERATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_expense_operations_total",
        "Total number of expense operations",
        &["operation"] // create, capture, update, approve, pay, delete
    )
    .expect("Failed to register expense_operations_total")
});

/// Document extractions by the method that produced the fields.
pub static EXTRACTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_extractions_total",
        "Total number of document extractions by method",
        &["method"]
    )
    .expect("Failed to register extractions_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Sum of invoice totals at creation, in euros.
pub static INVOICE_AMOUNT_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "invoicing_invoice_amount_total",
        "Total invoiced amount in euros"
    )
    .expect("Failed to register invoice_amount_total")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&INVOICE_OPERATIONS_TOTAL);
    Lazy::force(&EXPENSE_OPERATIONS_TOTAL);
    Lazy::force(&EXTRACTIONS_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&INVOICE_AMOUNT_TOTAL);
}

pub fn record_invoice_operation(operation: &str) {
    INVOICE_OPERATIONS_TOTAL
        .with_label_values(&[operation])
        .inc();
}

pub fn record_expense_operation(operation: &str) {
    EXPENSE_OPERATIONS_TOTAL
        .with_label_values(&[operation])
        .inc();
}

pub fn record_extraction(method: &str) {
    EXTRACTIONS_TOTAL.with_label_values(&[method]).inc();
}

pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

pub fn record_invoiced_amount(amount: Money) {
    if let Some(value) = amount.amount().to_f64() {
        if value > 0.0 {
            INVOICE_AMOUNT_TOTAL.inc_by(value);
        }
    }
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
