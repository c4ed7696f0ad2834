//! VAT bands.

use crate::error::DomainError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Dutch VAT band applied to an invoice line.
///
/// Serialized as the plain percentage (`0`, `9` or `21`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum VatRate {
    Zero,
    Reduced,
    #[default]
    Standard,
}

impl VatRate {
    pub const ALL: [VatRate; 3] = [VatRate::Zero, VatRate::Reduced, VatRate::Standard];

    pub fn percentage(&self) -> u32 {
        match self {
            VatRate::Zero => 0,
            VatRate::Reduced => 9,
            VatRate::Standard => 21,
        }
    }

    pub fn as_decimal(&self) -> Decimal {
        Decimal::from(self.percentage())
    }

    /// Accepts `21`, `21.0` or `21.00`; anything outside the bands is rejected.
    pub fn from_percentage(pct: Decimal) -> Result<Self, DomainError> {
        let normalized = pct.normalize();
        if normalized.scale() != 0 {
            return Err(invalid_band(pct));
        }
        let whole = u32::try_from(normalized.mantissa()).map_err(|_| invalid_band(pct))?;
        VatRate::try_from(whole)
    }
}

fn invalid_band<T: std::fmt::Display>(value: T) -> DomainError {
    DomainError::InvalidInput(format!(
        "VAT percentage {} is not one of the allowed bands 0, 9, 21",
        value
    ))
}

impl TryFrom<u32> for VatRate {
    type Error = DomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(VatRate::Zero),
            9 => Ok(VatRate::Reduced),
            21 => Ok(VatRate::Standard),
            other => Err(invalid_band(other)),
        }
    }
}

impl From<VatRate> for u32 {
    fn from(rate: VatRate) -> Self {
        rate.percentage()
    }
}
