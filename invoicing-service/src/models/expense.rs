//! Expense model for invoicing-service.

use super::money::Money;
use super::owner::Owner;
use crate::error::DomainError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;
use uuid::Uuid;

/// Category suggestions offered when reviewing an expense.
pub const SUGGESTED_CATEGORIES: [&str; 9] = [
    "Software & Licenties",
    "Kantoorkosten",
    "Hosting & Domein",
    "Telefoon & Internet",
    "Reiskosten",
    "Marketing",
    "Verzekering",
    "Accountant",
    "Overig",
];

/// Expense status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    #[serde(alias = "nieuw")]
    New,
    #[serde(alias = "goedgekeurd")]
    Approved,
    #[serde(alias = "betaald")]
    Paid,
}

impl ExpenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseStatus::New => "new",
            ExpenseStatus::Approved => "approved",
            ExpenseStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the fields of a captured expense were first populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    #[serde(alias = "gemini")]
    Ai,
    #[serde(alias = "regex")]
    Pattern,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Ai => "ai",
            ExtractionMethod::Pattern => "pattern",
        }
    }
}

/// Best-effort fields read from a supplier document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawExtraction {
    pub supplier: String,
    pub invoice_number: String,
    pub date: Option<NaiveDate>,
    pub category: String,
    pub description: String,
    pub subtotal: Money,
    pub vat: Money,
    pub total: Money,
    pub method: ExtractionMethod,
}

impl RawExtraction {
    pub fn empty(method: ExtractionMethod) -> Self {
        RawExtraction {
            supplier: String::new(),
            invoice_number: String::new(),
            date: None,
            category: String::new(),
            description: String::new(),
            subtotal: Money::ZERO,
            vat: Money::ZERO,
            total: Money::ZERO,
            method,
        }
    }
}

/// Expense record.
///
/// `total` is always `subtotal + vat`; status only moves through
/// [`Expense::approve`] and [`Expense::mark_paid`].
#[derive(Debug, Clone, Serialize)]
pub struct Expense {
    pub expense_id: Uuid,
    pub supplier: String,
    pub supplier_invoice_number: Option<String>,
    pub expense_date: Option<NaiveDate>,
    pub category: String,
    pub description: Option<String>,
    subtotal: Money,
    vat: Money,
    total: Money,
    pub owner: Owner,
    status: ExpenseStatus,
    pub document_ref: Option<String>,
    extraction_method: Option<ExtractionMethod>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for recording an expense by hand.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateExpense {
    pub supplier: String,
    pub supplier_invoice_number: Option<String>,
    pub expense_date: Option<NaiveDate>,
    #[serde(default)]
    pub category: String,
    pub description: Option<String>,
    #[serde(default)]
    pub subtotal: Money,
    #[serde(default)]
    pub vat: Money,
    /// Ignored; the total is derived from subtotal and VAT.
    pub total: Option<Money>,
    #[serde(default)]
    pub owner: Owner,
    pub document_ref: Option<String>,
}

/// Corrections to an expense that has not been paid.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateExpense {
    pub supplier: Option<String>,
    pub supplier_invoice_number: Option<String>,
    pub expense_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub subtotal: Option<Money>,
    pub vat: Option<Money>,
    /// Ignored; the total is derived from subtotal and VAT.
    pub total: Option<Money>,
    pub owner: Option<Owner>,
}

/// Filter parameters for listing expenses.
#[derive(Debug, Clone, Default)]
pub struct ListExpensesFilter {
    pub status: Option<ExpenseStatus>,
    pub category: Option<String>,
    pub owner: Option<Owner>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ListExpensesFilter {
    pub fn has_date_range(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }

    /// Undated expenses never match a date range.
    pub fn matches(&self, expense: &Expense) -> bool {
        let in_range = match expense.expense_date {
            Some(date) => {
                self.start_date.map_or(true, |d| date >= d)
                    && self.end_date.map_or(true, |d| date <= d)
            }
            None => !self.has_date_range(),
        };
        in_range
            && self.status.map_or(true, |s| expense.status == s)
            && self.owner.map_or(true, |o| expense.owner == o)
            && self
                .category
                .as_deref()
                .map_or(true, |c| expense.category.eq_ignore_ascii_case(c))
    }
}

fn check_amounts(subtotal: Money, vat: Money) -> Result<(), DomainError> {
    if subtotal.is_negative() || vat.is_negative() {
        return Err(DomainError::InvalidInput(
            "expense amounts must not be negative".to_string(),
        ));
    }
    Ok(())
}

fn warn_on_stale_total(supplied: Option<Money>, derived: Money) {
    if let Some(supplied) = supplied {
        if supplied != derived {
            warn!(
                supplied = %supplied,
                derived = %derived,
                "Ignoring supplied expense total that does not match subtotal + vat"
            );
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

impl Expense {
    /// Record an expense entered by hand. Starts in `new`.
    pub fn create(input: CreateExpense, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if input.supplier.trim().is_empty() {
            return Err(DomainError::Validation("Supplier is required".to_string()));
        }
        check_amounts(input.subtotal, input.vat)?;
        let total = input.subtotal + input.vat;
        warn_on_stale_total(input.total, total);

        Ok(Expense {
            expense_id: Uuid::new_v4(),
            supplier: input.supplier.trim().to_string(),
            supplier_invoice_number: non_blank(input.supplier_invoice_number),
            expense_date: input.expense_date,
            category: input.category.trim().to_string(),
            description: non_blank(input.description),
            subtotal: input.subtotal,
            vat: input.vat,
            total,
            owner: input.owner,
            status: ExpenseStatus::New,
            document_ref: input.document_ref,
            extraction_method: None,
            created_utc: now,
            updated_utc: now,
        })
    }

    /// Populate a pending-review expense from a document extraction.
    ///
    /// Fields may be blank or wrong; the result stays `new` until a person
    /// corrects and approves it. Negative amounts are clamped to zero rather
    /// than rejected, so a capture always yields a record.
    pub fn capture_from_document(
        raw: RawExtraction,
        owner: Owner,
        document_ref: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let subtotal = raw.subtotal.non_negative();
        let vat = raw.vat.non_negative();
        let total = subtotal + vat;
        if !raw.total.is_zero() {
            warn_on_stale_total(Some(raw.total), total);
        }

        Expense {
            expense_id: Uuid::new_v4(),
            supplier: raw.supplier.trim().to_string(),
            supplier_invoice_number: non_blank(Some(raw.invoice_number)),
            expense_date: raw.date,
            category: raw.category.trim().to_string(),
            description: non_blank(Some(raw.description)),
            subtotal,
            vat,
            total,
            owner,
            status: ExpenseStatus::New,
            document_ref,
            extraction_method: Some(raw.method),
            created_utc: now,
            updated_utc: now,
        }
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn vat(&self) -> Money {
        self.vat
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn status(&self) -> ExpenseStatus {
        self.status
    }

    pub fn extraction_method(&self) -> Option<ExtractionMethod> {
        self.extraction_method
    }

    /// Correct any field of an unpaid expense. The total is re-derived.
    pub fn correct(&mut self, changes: UpdateExpense, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status == ExpenseStatus::Paid {
            return Err(DomainError::InvalidStateTransition(format!(
                "Expense {} is paid and can no longer be changed",
                self.expense_id
            )));
        }
        let subtotal = changes.subtotal.unwrap_or(self.subtotal);
        let vat = changes.vat.unwrap_or(self.vat);
        check_amounts(subtotal, vat)?;
        if let Some(supplier) = &changes.supplier {
            if supplier.trim().is_empty() {
                return Err(DomainError::Validation("Supplier is required".to_string()));
            }
        }
        let total = subtotal + vat;
        warn_on_stale_total(changes.total, total);

        if let Some(supplier) = changes.supplier {
            self.supplier = supplier.trim().to_string();
        }
        if changes.supplier_invoice_number.is_some() {
            self.supplier_invoice_number = non_blank(changes.supplier_invoice_number);
        }
        if changes.expense_date.is_some() {
            self.expense_date = changes.expense_date;
        }
        if let Some(category) = changes.category {
            self.category = category.trim().to_string();
        }
        if changes.description.is_some() {
            self.description = non_blank(changes.description);
        }
        if let Some(owner) = changes.owner {
            self.owner = owner;
        }
        self.subtotal = subtotal;
        self.vat = vat;
        self.total = total;
        self.updated_utc = now;
        Ok(())
    }

    /// new -> approved.
    pub fn approve(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.advance(ExpenseStatus::New, ExpenseStatus::Approved, now)
    }

    /// approved -> paid.
    pub fn mark_paid(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.advance(ExpenseStatus::Approved, ExpenseStatus::Paid, now)
    }

    fn advance(
        &mut self,
        from: ExpenseStatus,
        to: ExpenseStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.status != from {
            return Err(DomainError::InvalidStateTransition(format!(
                "Expense {} cannot move from {} to {}",
                self.expense_id, self.status, to
            )));
        }
        self.status = to;
        self.updated_utc = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual(subtotal: i64, vat: i64) -> Expense {
        Expense::create(
            CreateExpense {
                supplier: "Hetzner".into(),
                category: "Hosting & Domein".into(),
                subtotal: Money::from_cents(subtotal),
                vat: Money::from_cents(vat),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn total_is_derived_not_trusted() {
        let expense = Expense::create(
            CreateExpense {
                supplier: "KPN".into(),
                subtotal: Money::from_cents(4000),
                vat: Money::from_cents(840),
                total: Some(Money::from_cents(9999)),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(expense.total(), Money::from_cents(4840));
    }

    #[test]
    fn supplier_is_required_for_manual_entry() {
        let result = Expense::create(
            CreateExpense {
                supplier: "  ".into(),
                ..Default::default()
            },
            Utc::now(),
        );
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn approval_lifecycle() {
        let mut expense = manual(1000, 210);
        assert_eq!(expense.status(), ExpenseStatus::New);
        assert!(matches!(
            expense.mark_paid(Utc::now()),
            Err(DomainError::InvalidStateTransition(_))
        ));
        expense.approve(Utc::now()).unwrap();
        assert!(expense.approve(Utc::now()).is_err());
        expense.mark_paid(Utc::now()).unwrap();
        assert_eq!(expense.status(), ExpenseStatus::Paid);
        assert!(expense.mark_paid(Utc::now()).is_err());
    }

    #[test]
    fn corrections_recompute_total_and_keep_method() {
        let mut raw = RawExtraction::empty(ExtractionMethod::Pattern);
        raw.supplier = "Bol.com".into();
        raw.subtotal = Money::from_cents(1000);
        raw.vat = Money::from_cents(210);
        raw.total = Money::from_cents(1210);
        let mut expense =
            Expense::capture_from_document(raw, Owner::Daan, Some("docs/a.pdf".into()), Utc::now());
        assert_eq!(expense.extraction_method(), Some(ExtractionMethod::Pattern));

        expense
            .correct(
                UpdateExpense {
                    vat: Some(Money::from_cents(90)),
                    total: Some(Money::from_cents(1210)),
                    category: Some("Kantoorkosten".into()),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(expense.total(), Money::from_cents(1090));
        assert_eq!(expense.category, "Kantoorkosten");
        assert_eq!(expense.extraction_method(), Some(ExtractionMethod::Pattern));
    }

    #[test]
    fn capture_clamps_negative_amounts() {
        let mut raw = RawExtraction::empty(ExtractionMethod::Ai);
        raw.supplier = "Adobe".into();
        raw.subtotal = Money::from_cents(-2000);
        raw.vat = Money::from_cents(3000);
        let expense = Expense::capture_from_document(raw, Owner::Wim, None, Utc::now());
        assert_eq!(expense.status(), ExpenseStatus::New);
        assert_eq!(expense.subtotal(), Money::ZERO);
        assert_eq!(expense.total(), Money::from_cents(3000));
    }

    #[test]
    fn paid_expenses_are_immutable() {
        let mut expense = manual(1000, 0);
        expense.approve(Utc::now()).unwrap();
        expense
            .correct(
                UpdateExpense {
                    description: Some("Server".into()),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();
        expense.mark_paid(Utc::now()).unwrap();
        let result = expense.correct(
            UpdateExpense {
                subtotal: Some(Money::from_cents(1)),
                ..Default::default()
            },
            Utc::now(),
        );
        assert!(matches!(result, Err(DomainError::InvalidStateTransition(_))));
        assert_eq!(expense.subtotal(), Money::from_cents(1000));
    }

    #[test]
    fn negative_amounts_are_rejected() {
        let mut expense = manual(1000, 210);
        let result = expense.correct(
            UpdateExpense {
                vat: Some(Money::from_cents(-1)),
                ..Default::default()
            },
            Utc::now(),
        );
        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn undated_expenses_never_match_a_date_range() {
        let expense = manual(1000, 210);
        assert!(ListExpensesFilter::default().matches(&expense));
        let ranged = ListExpensesFilter {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..Default::default()
        };
        assert!(!ranged.matches(&expense));
    }
}
