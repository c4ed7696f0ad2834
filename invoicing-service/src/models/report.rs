//! Read-only period projections.

use super::expense::Expense;
use super::invoice::{Invoice, InvoiceStatus};
use super::money::Money;
use super::owner::Owner;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlySummary {
    /// `YYYY-MM`
    pub month: String,
    pub revenue: Money,
    pub expenses: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Money,
}

/// Quarterly VAT return figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VatReturn {
    pub year: i32,
    pub quarter: u32,
    pub output_base: Money,
    pub output_vat: Money,
    pub input_base: Money,
    pub input_vat: Money,
    /// Negative means a refund is due.
    pub net_payable: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProfitAndLoss {
    pub year: i32,
    pub revenue: Money,
    pub expenses: Money,
    pub profit: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OwnerTaxEstimate {
    pub owner: Owner,
    pub revenue_share: Money,
    pub expense_share: Money,
    pub profit_share: Money,
    pub estimated_tax: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncomeTaxEstimate {
    pub year: i32,
    pub owners: Vec<OwnerTaxEstimate>,
}

impl IncomeTaxEstimate {
    pub fn for_owner(&self, owner: Owner) -> Option<&OwnerTaxEstimate> {
        self.owners.iter().find(|o| o.owner == owner)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: InvoiceStatus,
    pub count: usize,
}

/// Dashboard KPIs for one year.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub year: i32,
    pub available_years: Vec<i32>,
    pub total_revenue: Money,
    pub total_paid: Money,
    pub outstanding: Money,
    pub expenses: Money,
    pub profit: Money,
    pub invoice_count: usize,
    pub customer_count: usize,
    pub monthly: Vec<MonthlySummary>,
    pub categories: Vec<CategoryTotal>,
    pub status_distribution: Vec<StatusCount>,
    pub recent_invoices: Vec<Invoice>,
    pub recent_expenses: Vec<Expense>,
}
