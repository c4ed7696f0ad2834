//! Configuration for invoicing-service.

use crate::models::Money;
use rust_decimal::Decimal;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;

#[derive(Debug, Clone, Deserialize)]
pub struct InvoicingConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// E-mail addresses allowed to use the application. Empty admits nobody.
    #[serde(default)]
    pub allowed_emails: Vec<String>,
    #[serde(default = "default_invoice_prefix")]
    pub invoice_prefix: String,
    #[serde(default = "default_payment_term_days")]
    pub payment_term_days: u32,
    /// Daan's share of records attributed to both partners; Wim gets the rest.
    #[serde(default = "default_both_share")]
    pub both_share: Decimal,
    #[serde(default = "default_income_tax_brackets")]
    pub income_tax_brackets: Vec<TaxBracket>,
    #[serde(default)]
    pub ai_extraction_enabled: bool,
    /// Bucket for expenses without a category in breakdowns.
    #[serde(default = "default_category")]
    pub default_category: String,
}

/// One band of a progressive income tax schedule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaxBracket {
    /// Upper bound of taxable profit for this band; `None` for the top band.
    pub upper_bound: Option<Money>,
    /// Percentage, e.g. `36.97`.
    pub rate: Decimal,
}

fn default_service_name() -> String {
    "invoicing-service".to_string()
}

fn default_invoice_prefix() -> String {
    "F".to_string()
}

fn default_payment_term_days() -> u32 {
    30
}

fn default_both_share() -> Decimal {
    Decimal::new(5, 1)
}

fn default_category() -> String {
    "Overig".to_string()
}

/// Dutch box 1, 2024.
pub fn default_income_tax_brackets() -> Vec<TaxBracket> {
    vec![
        TaxBracket {
            upper_bound: Some(Money::from_cents(7_551_800)),
            rate: Decimal::new(3697, 2),
        },
        TaxBracket {
            upper_bound: None,
            rate: Decimal::new(4950, 2),
        },
    ]
}

impl Default for InvoicingConfig {
    fn default() -> Self {
        Self {
            common: core_config::Config::default(),
            service_name: default_service_name(),
            allowed_emails: Vec::new(),
            invoice_prefix: default_invoice_prefix(),
            payment_term_days: default_payment_term_days(),
            both_share: default_both_share(),
            income_tax_brackets: default_income_tax_brackets(),
            ai_extraction_enabled: false,
            default_category: default_category(),
        }
    }
}

impl InvoicingConfig {
    /// Read the optional `invoicing` file and `INVOICING__*` variables.
    /// Logging settings come from the shared `configuration` file and
    /// `APP__*` variables.
    pub fn load() -> Result<Self, AppError> {
        let mut config: Self =
            core_config::load_section("invoicing", "INVOICING", &["allowed_emails"])?;
        config.common = core_config::Config::load()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.both_share < Decimal::ZERO || self.both_share > Decimal::ONE {
            return Err(config_error(format!(
                "both_share must be between 0 and 1, got {}",
                self.both_share
            )));
        }
        if self.payment_term_days == 0 {
            return Err(config_error("payment_term_days must be at least 1".to_string()));
        }
        if self.income_tax_brackets.is_empty() {
            return Err(config_error("income_tax_brackets must not be empty".to_string()));
        }

        let last = self.income_tax_brackets.len() - 1;
        let mut previous: Option<Money> = None;
        for (i, bracket) in self.income_tax_brackets.iter().enumerate() {
            if bracket.rate < Decimal::ZERO || bracket.rate > Decimal::ONE_HUNDRED {
                return Err(config_error(format!(
                    "tax rate {} is not a percentage",
                    bracket.rate
                )));
            }
            match bracket.upper_bound {
                Some(bound) => {
                    if previous.is_some_and(|p| bound <= p) {
                        return Err(config_error(
                            "income_tax_brackets must be in ascending order".to_string(),
                        ));
                    }
                    previous = Some(bound);
                }
                None if i != last => {
                    return Err(config_error(
                        "only the last income tax bracket may be open-ended".to_string(),
                    ));
                }
                None => {}
            }
        }
        Ok(())
    }
}

fn config_error(msg: String) -> AppError {
    AppError::ConfigError(anyhow::anyhow!(msg))
}
