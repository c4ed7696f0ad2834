//! Invoice aggregate for invoicing-service.

use super::line_item::{LineAmounts, LineItem};
use super::money::Money;
use super::owner::Owner;
use crate::error::DomainError;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Invoice status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[serde(alias = "draft")]
    Concept,
    #[serde(alias = "verzonden")]
    Sent,
    #[serde(alias = "betaald")]
    Paid,
    #[serde(alias = "verlopen")]
    Expired,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 4] = [
        InvoiceStatus::Concept,
        InvoiceStatus::Sent,
        InvoiceStatus::Paid,
        InvoiceStatus::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Concept => "concept",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Expired => "expired",
        }
    }

    /// Forward-only lifecycle; nothing returns to concept.
    pub fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        matches!(
            (self, next),
            (InvoiceStatus::Concept, InvoiceStatus::Sent)
                | (InvoiceStatus::Sent, InvoiceStatus::Paid)
                | (InvoiceStatus::Sent, InvoiceStatus::Expired)
                | (InvoiceStatus::Expired, InvoiceStatus::Paid)
        )
    }

    /// Counted as billed revenue on the dashboard.
    pub fn is_billed(&self) -> bool {
        !matches!(self, InvoiceStatus::Concept)
    }

    /// Billed but not yet paid.
    pub fn is_outstanding(&self) -> bool {
        matches!(self, InvoiceStatus::Sent | InvoiceStatus::Expired)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived invoice totals. `total == subtotal + vat_total` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub vat_total: Money,
    pub total: Money,
}

impl InvoiceTotals {
    pub fn compute(lines: &[LineItem]) -> Result<Self, DomainError> {
        let mut subtotal = Money::ZERO;
        let mut vat_total = Money::ZERO;
        for line in lines {
            let amounts = line.amounts()?;
            subtotal += amounts.line_total;
            vat_total += amounts.line_vat;
        }
        Ok(InvoiceTotals {
            subtotal,
            vat_total,
            total: subtotal + vat_total,
        })
    }
}

/// Per-line and invoice totals for an unsaved form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TotalsPreview {
    pub lines: Vec<LineAmounts>,
    pub totals: InvoiceTotals,
}

impl TotalsPreview {
    pub fn compute(lines: &[LineItem]) -> Result<Self, DomainError> {
        let amounts = lines
            .iter()
            .map(LineItem::amounts)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TotalsPreview {
            lines: amounts,
            totals: InvoiceTotals::compute(lines)?,
        })
    }
}

/// Invoice document.
///
/// Lines, totals and status are private: lines change only through
/// [`Invoice::replace_lines`] or [`Invoice::update`], both of which recompute
/// totals, and status changes only through [`Invoice::transition`].
#[derive(Debug, Clone, Serialize)]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub invoice_number: String,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub subject: Option<String>,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub owner: Owner,
    lines: Vec<LineItem>,
    #[serde(flatten)]
    totals: InvoiceTotals,
    status: InvoiceStatus,
    pub notes: Option<String>,
    pub document_ref: Option<String>,
    sent_utc: Option<DateTime<Utc>>,
    paid_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for creating an invoice.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateInvoice {
    pub customer_id: Option<Uuid>,
    pub subject: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub owner: Owner,
    #[serde(default)]
    pub lines: Vec<LineItem>,
    pub notes: Option<String>,
}

/// Input for updating an invoice (concept only).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateInvoice {
    pub customer_id: Option<Uuid>,
    pub subject: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub owner: Option<Owner>,
    pub lines: Option<Vec<LineItem>>,
    pub notes: Option<String>,
}

/// Filter parameters for listing invoices.
#[derive(Debug, Clone, Default)]
pub struct ListInvoicesFilter {
    pub status: Option<InvoiceStatus>,
    pub customer_id: Option<Uuid>,
    pub owner: Option<Owner>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ListInvoicesFilter {
    pub fn matches(&self, invoice: &Invoice) -> bool {
        self.status.map_or(true, |s| invoice.status == s)
            && self.customer_id.map_or(true, |c| invoice.customer_id == c)
            && self.owner.map_or(true, |o| invoice.owner == o)
            && self.start_date.map_or(true, |d| invoice.invoice_date >= d)
            && self.end_date.map_or(true, |d| invoice.invoice_date <= d)
    }
}

fn require_substantive_line(lines: &[LineItem]) -> Result<(), DomainError> {
    if lines.iter().any(LineItem::is_substantive) {
        Ok(())
    } else {
        Err(DomainError::Validation(
            "At least one line item with a description is required".to_string(),
        ))
    }
}

fn check_dates(invoice_date: NaiveDate, due_date: NaiveDate) -> Result<(), DomainError> {
    if due_date < invoice_date {
        return Err(DomainError::Validation(format!(
            "Due date {} is before invoice date {}",
            due_date, invoice_date
        )));
    }
    Ok(())
}

impl Invoice {
    /// Create a concept invoice.
    ///
    /// `today` stands in for a missing invoice date; a missing due date is
    /// `payment_term_days` after the invoice date.
    pub fn create(
        input: CreateInvoice,
        invoice_number: String,
        customer_name: String,
        today: NaiveDate,
        payment_term_days: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let customer_id = input
            .customer_id
            .ok_or_else(|| DomainError::Validation("Customer is required".to_string()))?;
        require_substantive_line(&input.lines)?;
        let totals = InvoiceTotals::compute(&input.lines)?;

        let invoice_date = input.invoice_date.unwrap_or(today);
        let due_date = input
            .due_date
            .unwrap_or(invoice_date + Duration::days(i64::from(payment_term_days)));
        check_dates(invoice_date, due_date)?;

        Ok(Invoice {
            invoice_id: Uuid::new_v4(),
            invoice_number,
            customer_id,
            customer_name,
            subject: input.subject,
            invoice_date,
            due_date,
            owner: input.owner,
            lines: input.lines,
            totals,
            status: InvoiceStatus::Concept,
            notes: input.notes,
            document_ref: None,
            sent_utc: None,
            paid_utc: None,
            created_utc: now,
            updated_utc: now,
        })
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn totals(&self) -> &InvoiceTotals {
        &self.totals
    }

    pub fn subtotal(&self) -> Money {
        self.totals.subtotal
    }

    pub fn vat_total(&self) -> Money {
        self.totals.vat_total
    }

    pub fn total(&self) -> Money {
        self.totals.total
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn sent_utc(&self) -> Option<DateTime<Utc>> {
        self.sent_utc
    }

    pub fn paid_utc(&self) -> Option<DateTime<Utc>> {
        self.paid_utc
    }

    /// Sent, and the due date has passed.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == InvoiceStatus::Sent && self.due_date < today
    }

    /// Recompute derived totals from the current lines. Idempotent.
    pub fn recompute_totals(&mut self) -> Result<&InvoiceTotals, DomainError> {
        self.totals = InvoiceTotals::compute(&self.lines)?;
        Ok(&self.totals)
    }

    fn ensure_concept(&self, action: &str) -> Result<(), DomainError> {
        if self.status != InvoiceStatus::Concept {
            return Err(DomainError::InvalidStateTransition(format!(
                "Cannot {} invoice {}: only concept invoices can be edited (status is {})",
                action, self.invoice_number, self.status
            )));
        }
        Ok(())
    }

    /// Replace the whole line set and recompute totals.
    pub fn replace_lines(
        &mut self,
        lines: Vec<LineItem>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_concept("change lines of")?;
        require_substantive_line(&lines)?;
        let totals = InvoiceTotals::compute(&lines)?;
        self.lines = lines;
        self.totals = totals;
        self.updated_utc = now;
        Ok(())
    }

    /// Apply a field-wise patch. Either every change applies or none does.
    ///
    /// `customer_name` must accompany a changed `customer_id`.
    pub fn update(
        &mut self,
        changes: UpdateInvoice,
        customer_name: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_concept("update")?;

        let new_lines = match changes.lines {
            Some(lines) => {
                require_substantive_line(&lines)?;
                let totals = InvoiceTotals::compute(&lines)?;
                Some((lines, totals))
            }
            None => None,
        };
        let invoice_date = changes.invoice_date.unwrap_or(self.invoice_date);
        let due_date = changes.due_date.unwrap_or(self.due_date);
        check_dates(invoice_date, due_date)?;

        if let Some(customer_id) = changes.customer_id {
            self.customer_id = customer_id;
            if let Some(name) = customer_name {
                self.customer_name = name;
            }
        }
        if let Some((lines, totals)) = new_lines {
            self.lines = lines;
            self.totals = totals;
        }
        if changes.subject.is_some() {
            self.subject = changes.subject;
        }
        if let Some(owner) = changes.owner {
            self.owner = owner;
        }
        if changes.notes.is_some() {
            self.notes = changes.notes;
        }
        self.invoice_date = invoice_date;
        self.due_date = due_date;
        self.updated_utc = now;
        Ok(())
    }

    /// Move to `next`, stamping the sent or paid timestamp.
    pub fn transition(
        &mut self,
        next: InvoiceStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition(format!(
                "Invoice {} cannot move from {} to {}",
                self.invoice_number, self.status, next
            )));
        }
        match next {
            InvoiceStatus::Sent => self.sent_utc = Some(now),
            InvoiceStatus::Paid => self.paid_utc = Some(now),
            InvoiceStatus::Expired | InvoiceStatus::Concept => {}
        }
        self.status = next;
        self.updated_utc = now;
        Ok(())
    }
}
