//! Customer model for invoicing-service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Customer billed by the business.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: Uuid,
    pub company_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub postcode: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub kvk_number: Option<String>,
    pub vat_number: Option<String>,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Customer {
    pub fn new(input: CreateCustomer, now: DateTime<Utc>) -> Self {
        Customer {
            customer_id: Uuid::new_v4(),
            company_name: input.company_name.trim().to_string(),
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            phone: input.phone,
            address: input.address,
            postcode: input.postcode,
            city: input.city,
            country: input.country.or_else(|| Some("Nederland".to_string())),
            kvk_number: input.kvk_number,
            vat_number: input.vat_number,
            notes: input.notes,
            created_utc: now,
            updated_utc: now,
        }
    }

    /// "First Last", falling back to the company name.
    pub fn contact_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            self.company_name.clone()
        } else {
            parts.join(" ")
        }
    }

    pub fn apply(&mut self, changes: UpdateCustomer, now: DateTime<Utc>) {
        if let Some(company_name) = changes.company_name {
            self.company_name = company_name.trim().to_string();
        }
        macro_rules! patch {
            ($($field:ident),*) => {
                $(if changes.$field.is_some() { self.$field = changes.$field; })*
            };
        }
        patch!(
            first_name, last_name, email, phone, address, postcode, city, country, kvk_number,
            vat_number, notes
        );
        self.updated_utc = now;
    }
}

/// Input for creating a customer.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateCustomer {
    #[validate(length(min = 1, message = "Company name is required"))]
    pub company_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub postcode: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub kvk_number: Option<String>,
    pub vat_number: Option<String>,
    pub notes: Option<String>,
}

/// Input for updating a customer.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCustomer {
    #[validate(length(min = 1, message = "Company name is required"))]
    pub company_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub postcode: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub kvk_number: Option<String>,
    pub vat_number: Option<String>,
    pub notes: Option<String>,
}
