#![allow(dead_code)]

use chrono::NaiveDate;
use invoicing_service::models::{CreateCustomer, CreateInvoice, Customer, LineItem, Owner};
use invoicing_service::services::providers::{AiExtractor, RecordingDeliveryProvider};
use invoicing_service::services::{FixedClock, InMemoryRepository};
use invoicing_service::{InvoicingApi, InvoicingConfig};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

pub const ALLOWED_EMAIL: &str = "daan@opwolken.nl";
pub const CUSTOMER_EMAIL: &str = "finance@acme.nl";

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date")
}

pub fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("Invalid test date")
}

pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("Invalid test decimal")
}

pub fn line(description: &str, quantity: &str, rate: &str, vat: &str) -> LineItem {
    LineItem::new(description, dec(quantity), dec(rate), dec(vat)).expect("Invalid test line")
}

pub fn test_config() -> InvoicingConfig {
    InvoicingConfig {
        allowed_emails: vec![ALLOWED_EMAIL.to_string(), "Wim@Opwolken.nl ".to_string()],
        ..Default::default()
    }
}

pub struct TestApp {
    pub api: InvoicingApi,
    pub repo: Arc<InMemoryRepository>,
    pub delivery: Arc<RecordingDeliveryProvider>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::build(test_config(), true, None).await
    }

    /// A delivery provider that refuses every message.
    pub async fn spawn_with_failing_delivery() -> Self {
        Self::build(test_config(), false, None).await
    }

    pub async fn spawn_with_ai(ai: Arc<dyn AiExtractor>) -> Self {
        let config = InvoicingConfig {
            ai_extraction_enabled: true,
            ..test_config()
        };
        Self::build(config, true, Some(ai)).await
    }

    async fn build(
        config: InvoicingConfig,
        delivery_enabled: bool,
        ai: Option<Arc<dyn AiExtractor>>,
    ) -> Self {
        invoicing_service::init_observability(&config);

        let repo = Arc::new(InMemoryRepository::new());
        let delivery = Arc::new(RecordingDeliveryProvider::new(delivery_enabled));
        let mut api = InvoicingApi::new(config, repo.clone())
            .with_delivery(delivery.clone())
            .with_clock(Arc::new(FixedClock::on(today())));
        if let Some(ai) = ai {
            api = api.with_ai_extractor(ai);
        }

        TestApp {
            api,
            repo,
            delivery,
        }
    }

    pub async fn seed_customer(&self, company_name: &str, email: Option<&str>) -> Customer {
        self.api
            .create_customer(CreateCustomer {
                company_name: company_name.to_string(),
                first_name: Some("Jan".to_string()),
                last_name: Some("Jansen".to_string()),
                email: email.map(str::to_string),
                city: Some("Utrecht".to_string()),
                ..Default::default()
            })
            .await
            .expect("Failed to create customer")
    }

    /// Concept invoice input with one €100 line at 21% VAT.
    pub fn invoice_input(&self, customer: &Customer, invoice_date: &str) -> CreateInvoice {
        CreateInvoice {
            customer_id: Some(customer.customer_id),
            subject: Some("Website onderhoud".to_string()),
            invoice_date: Some(date(invoice_date)),
            owner: Owner::Both,
            lines: vec![line("Onderhoud", "1", "100", "21")],
            ..Default::default()
        }
    }
}
