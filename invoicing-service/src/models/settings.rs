//! Company settings for invoicing-service.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// The business's own details, printed on invoices and e-mails.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CompanySettings {
    #[validate(length(min = 1, message = "Company name is required"))]
    pub company_name: String,
    pub address: Option<String>,
    pub postcode: Option<String>,
    pub city: Option<String>,
    pub kvk_number: Option<String>,
    pub vat_number: Option<String>,
    pub iban: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub invoice_prefix: String,
    #[validate(range(min = 1))]
    pub next_invoice_number: u32,
}

impl CompanySettings {
    pub fn new(company_name: impl Into<String>, invoice_prefix: impl Into<String>) -> Self {
        CompanySettings {
            company_name: company_name.into(),
            address: None,
            postcode: None,
            city: None,
            kvk_number: None,
            vat_number: None,
            iban: None,
            email: None,
            phone: None,
            website: None,
            invoice_prefix: invoice_prefix.into(),
            next_invoice_number: 1,
        }
    }

    /// Number the next invoice will receive, e.g. `F0007`.
    pub fn peek_invoice_number(&self) -> String {
        format_invoice_number(&self.invoice_prefix, self.next_invoice_number)
    }

    /// Take the next invoice number and advance the counter.
    pub fn take_invoice_number(&mut self) -> String {
        let number = self.peek_invoice_number();
        self.next_invoice_number = self.next_invoice_number.saturating_add(1);
        number
    }

    /// Postcode and city on one line.
    pub fn locality(&self) -> Option<String> {
        match (self.postcode.as_deref(), self.city.as_deref()) {
            (Some(p), Some(c)) => Some(format!("{p} {c}")),
            (Some(p), None) => Some(p.to_string()),
            (None, Some(c)) => Some(c.to_string()),
            (None, None) => None,
        }
    }
}

pub fn format_invoice_number(prefix: &str, number: u32) -> String {
    format!("{prefix}{number:04}")
}
