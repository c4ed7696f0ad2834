//! Line item model for invoicing-service.

use super::money::{round_cents, Money};
use super::vat::VatRate;
use crate::error::DomainError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Line item on an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub description: String,
    pub quantity: Decimal,
    pub unit_rate: Decimal,
    #[serde(default)]
    pub vat_rate: VatRate,
}

/// Derived amounts for a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineAmounts {
    pub line_total: Money,
    pub line_vat: Money,
}

impl LineItem {
    /// Build a line, rejecting negative quantities or rates and unknown VAT bands.
    pub fn new(
        description: impl Into<String>,
        quantity: Decimal,
        unit_rate: Decimal,
        vat_percentage: Decimal,
    ) -> Result<Self, DomainError> {
        let item = LineItem {
            description: description.into(),
            quantity,
            unit_rate,
            vat_rate: VatRate::from_percentage(vat_percentage)?,
        };
        item.validate()?;
        Ok(item)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.quantity.is_sign_negative() && !self.quantity.is_zero() {
            return Err(DomainError::InvalidInput(format!(
                "quantity must not be negative (got {})",
                self.quantity
            )));
        }
        if self.unit_rate.is_sign_negative() && !self.unit_rate.is_zero() {
            return Err(DomainError::InvalidInput(format!(
                "unit rate must not be negative (got {})",
                self.unit_rate
            )));
        }
        Ok(())
    }

    /// quantity × unit rate, rounded to cents.
    pub fn line_total(&self) -> Result<Money, DomainError> {
        self.validate()?;
        Ok(Money::new(round_cents(self.quantity * self.unit_rate)))
    }

    /// line total × VAT percentage / 100, rounded to cents.
    pub fn line_vat(&self) -> Result<Money, DomainError> {
        Ok(self.line_total()?.percent(self.vat_rate.as_decimal()))
    }

    pub fn amounts(&self) -> Result<LineAmounts, DomainError> {
        let line_total = self.line_total()?;
        Ok(LineAmounts {
            line_total,
            line_vat: line_total.percent(self.vat_rate.as_decimal()),
        })
    }

    /// A line counts towards a committed invoice only when it has a description.
    pub fn is_substantive(&self) -> bool {
        !self.description.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn line_total_multiplies_and_rounds() {
        let item = LineItem::new("Consultancy", dec("2"), dec("12.50"), dec("21")).unwrap();
        assert_eq!(item.line_total().unwrap(), Money::from_cents(2500));
        assert_eq!(item.line_vat().unwrap(), Money::from_cents(525));

        let half = LineItem::new("Half day", dec("0.5"), dec("99.99"), dec("9")).unwrap();
        // 49.995 -> 50.00, VAT 4.50
        assert_eq!(half.line_total().unwrap(), Money::from_cents(5000));
        assert_eq!(half.line_vat().unwrap(), Money::from_cents(450));
    }

    #[test]
    fn vat_is_rounded_per_line() {
        for rate in VatRate::ALL {
            let item = LineItem {
                description: "x".into(),
                quantity: dec("3"),
                unit_rate: dec("0.35"),
                vat_rate: rate,
            };
            let expected = round_cents(dec("1.05") * rate.as_decimal() / dec("100"));
            assert_eq!(item.line_vat().unwrap().amount(), expected);
        }
    }

    #[test]
    fn fractional_quantities_round_half_away_from_zero() {
        // (quantity, unit rate, line total, VAT cents for Zero/Reduced/Standard)
        let cases: [(&str, &str, i64, [i64; 3]); 6] = [
            ("1.5", "33.33", 5000, [0, 450, 1050]),
            ("0.333", "10", 333, [0, 30, 70]),
            ("2.25", "0.05", 11, [0, 1, 2]),
            ("7", "14.285", 10000, [0, 900, 2100]),
            ("0.125", "0.04", 1, [0, 0, 0]),
            ("3.5", "0.10", 35, [0, 3, 7]),
        ];
        for (quantity, unit_rate, total_cents, vat_cents) in cases {
            for (rate, expected_vat) in VatRate::ALL.into_iter().zip(vat_cents) {
                let item = LineItem {
                    description: "Uren".into(),
                    quantity: dec(quantity),
                    unit_rate: dec(unit_rate),
                    vat_rate: rate,
                };
                let total = item.line_total().unwrap();
                assert_eq!(total.amount(), round_cents(dec(quantity) * dec(unit_rate)));
                assert_eq!(total, Money::from_cents(total_cents), "{} x {}", quantity, unit_rate);

                let vat = item.line_vat().unwrap();
                assert_eq!(
                    vat.amount(),
                    round_cents(total.amount() * rate.as_decimal() / dec("100"))
                );
                assert_eq!(
                    vat,
                    Money::from_cents(expected_vat),
                    "{} x {} @ {:?}",
                    quantity,
                    unit_rate,
                    rate
                );

                let amounts = item.amounts().unwrap();
                assert_eq!((amounts.line_total, amounts.line_vat), (total, vat));
            }
        }
    }

    #[test]
    fn negative_quantity_or_rate_is_invalid_input() {
        assert!(matches!(
            LineItem::new("Refund", dec("-1"), dec("10"), dec("21")),
            Err(DomainError::InvalidInput(_))
        ));
        let item = LineItem {
            description: "Discount".into(),
            quantity: dec("1"),
            unit_rate: dec("-5"),
            vat_rate: VatRate::Standard,
        };
        assert!(matches!(item.line_total(), Err(DomainError::InvalidInput(_))));
        assert!(matches!(item.line_vat(), Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn unknown_vat_band_is_rejected() {
        assert!(matches!(
            LineItem::new("Books", dec("1"), dec("10"), dec("6")),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn blank_descriptions_are_not_substantive() {
        let blank = LineItem::new("   ", dec("1"), dec("10"), dec("0")).unwrap();
        assert!(!blank.is_substantive());
        let real = LineItem::new("Hosting", dec("1"), dec("10"), dec("0")).unwrap();
        assert!(real.is_substantive());
    }
}
