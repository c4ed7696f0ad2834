//! Period aggregation over loaded invoices and expenses.
//!
//! Everything here is a pure projection: no I/O, no caching. Invoices are
//! placed in a period by invoice date, expenses by expense date; undated
//! expenses are left out of every period query.

use crate::config::TaxBracket;
use crate::error::DomainError;
use crate::models::{
    CategoryTotal, DashboardSummary, Expense, IncomeTaxEstimate, Invoice, InvoiceStatus, Money,
    MonthlySummary, Owner, OwnerTaxEstimate, ProfitAndLoss, StatusCount, VatReturn,
};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap, HashSet};

const RECENT_LIMIT: usize = 5;

/// Split `amount` into (Daan, Wim) shares.
///
/// Single-owner records go entirely to that partner. For `Both`, Daan gets
/// `both_share` of the amount rounded to cents and Wim the remainder, so the
/// shares always add back up to the amount.
pub fn split_between_owners(amount: Money, owner: Owner, both_share: Decimal) -> (Money, Money) {
    match owner {
        Owner::Daan => (amount, Money::ZERO),
        Owner::Wim => (Money::ZERO, amount),
        Owner::Both => {
            let daan = amount.times(both_share);
            (daan, amount - daan)
        }
    }
}

/// Progressive tax over a non-negative profit. Losses carry no tax.
pub fn progressive_tax(profit: Money, brackets: &[TaxBracket]) -> Money {
    let taxable = profit.non_negative();
    let mut tax = Money::ZERO;
    let mut lower = Money::ZERO;
    for bracket in brackets {
        if taxable <= lower {
            break;
        }
        let upper = match bracket.upper_bound {
            Some(bound) if bound < taxable => bound,
            _ => taxable,
        };
        tax += (upper - lower).percent(bracket.rate);
        lower = upper;
    }
    tax
}

/// First and last day of a calendar quarter.
pub fn quarter_bounds(year: i32, quarter: u32) -> Result<(NaiveDate, NaiveDate), DomainError> {
    if !(1..=4).contains(&quarter) {
        return Err(DomainError::Validation(format!(
            "Quarter must be between 1 and 4, got {}",
            quarter
        )));
    }
    let first_month = (quarter - 1) * 3 + 1;
    let start = NaiveDate::from_ymd_opt(year, first_month, 1)
        .ok_or_else(|| DomainError::InvalidInput(format!("Year {} is out of range", year)))?;
    let end = if quarter == 4 {
        NaiveDate::from_ymd_opt(year, 12, 31)
    } else {
        NaiveDate::from_ymd_opt(year, first_month + 3, 1).and_then(|d| d.pred_opt())
    }
    .ok_or_else(|| DomainError::InvalidInput(format!("Year {} is out of range", year)))?;
    Ok((start, end))
}

fn sum_totals(invoices: &[&Invoice], include: impl Fn(InvoiceStatus) -> bool) -> Money {
    invoices
        .iter()
        .filter(|i| include(i.status()))
        .map(|i| i.total())
        .sum()
}

/// Read-only projection over a set of invoices and expenses.
pub struct PeriodAggregator<'a> {
    invoices: &'a [Invoice],
    expenses: &'a [Expense],
    default_category: &'a str,
}

impl<'a> PeriodAggregator<'a> {
    pub fn new(invoices: &'a [Invoice], expenses: &'a [Expense]) -> Self {
        Self {
            invoices,
            expenses,
            default_category: "Overig",
        }
    }

    /// Bucket for expenses with a blank category.
    pub fn with_default_category(mut self, category: &'a str) -> Self {
        self.default_category = category;
        self
    }

    fn invoices_in_year(&self, year: i32) -> impl Iterator<Item = &'a Invoice> + '_ {
        self.invoices
            .iter()
            .filter(move |i| i.invoice_date.year() == year)
    }

    fn expenses_in_year(&self, year: i32) -> impl Iterator<Item = &'a Expense> + '_ {
        self.expenses
            .iter()
            .filter(move |e| e.expense_date.is_some_and(|d| d.year() == year))
    }

    fn category_of(&self, expense: &Expense) -> String {
        let category = expense.category.trim();
        if category.is_empty() {
            self.default_category.to_string()
        } else {
            category.to_string()
        }
    }

    /// Twelve rows `YYYY-MM`: invoice totals (every status) and expense totals.
    pub fn monthly_summary(&self, year: i32) -> Vec<MonthlySummary> {
        let mut revenue = [Money::ZERO; 12];
        let mut expenses = [Money::ZERO; 12];
        for invoice in self.invoices_in_year(year) {
            revenue[invoice.invoice_date.month0() as usize] += invoice.total();
        }
        for expense in self.expenses_in_year(year) {
            if let Some(date) = expense.expense_date {
                expenses[date.month0() as usize] += expense.total();
            }
        }
        (0..12)
            .map(|m| MonthlySummary {
                month: format!("{:04}-{:02}", year, m + 1),
                revenue: revenue[m],
                expenses: expenses[m],
            })
            .collect()
    }

    /// Expense totals per category, largest first; ties by name.
    pub fn category_breakdown(&self, year: i32) -> Vec<CategoryTotal> {
        let mut totals: HashMap<String, Money> = HashMap::new();
        for expense in self.expenses_in_year(year) {
            *totals.entry(self.category_of(expense)).or_default() += expense.total();
        }
        let mut rows: Vec<CategoryTotal> = totals
            .into_iter()
            .map(|(category, total)| CategoryTotal { category, total })
            .collect();
        rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
        rows
    }

    /// Output VAT from invoices and input VAT from expenses dated in the quarter.
    pub fn vat_return(&self, year: i32, quarter: u32) -> Result<VatReturn, DomainError> {
        let (start, end) = quarter_bounds(year, quarter)?;
        let in_quarter = |date: NaiveDate| date >= start && date <= end;

        let mut output_base = Money::ZERO;
        let mut output_vat = Money::ZERO;
        for invoice in self.invoices.iter().filter(|i| in_quarter(i.invoice_date)) {
            output_base += invoice.subtotal();
            output_vat += invoice.vat_total();
        }

        let mut input_base = Money::ZERO;
        let mut input_vat = Money::ZERO;
        for expense in self
            .expenses
            .iter()
            .filter(|e| e.expense_date.is_some_and(in_quarter))
        {
            input_base += expense.subtotal();
            input_vat += expense.vat();
        }

        Ok(VatReturn {
            year,
            quarter,
            output_base,
            output_vat,
            input_base,
            input_vat,
            net_payable: output_vat - input_vat,
        })
    }

    /// Revenue and expenses exclusive of VAT.
    pub fn profit_and_loss(&self, year: i32) -> ProfitAndLoss {
        let revenue: Money = self.invoices_in_year(year).map(Invoice::subtotal).sum();
        let expenses: Money = self.expenses_in_year(year).map(Expense::subtotal).sum();
        ProfitAndLoss {
            year,
            revenue,
            expenses,
            profit: revenue - expenses,
        }
    }

    /// Per-partner profit share and estimated income tax.
    pub fn income_tax_estimate(
        &self,
        year: i32,
        both_share: Decimal,
        brackets: &[TaxBracket],
    ) -> IncomeTaxEstimate {
        let mut revenue = (Money::ZERO, Money::ZERO);
        let mut costs = (Money::ZERO, Money::ZERO);
        for invoice in self.invoices_in_year(year) {
            let (daan, wim) = split_between_owners(invoice.subtotal(), invoice.owner, both_share);
            revenue.0 += daan;
            revenue.1 += wim;
        }
        for expense in self.expenses_in_year(year) {
            let (daan, wim) = split_between_owners(expense.subtotal(), expense.owner, both_share);
            costs.0 += daan;
            costs.1 += wim;
        }

        let estimate = |owner: Owner, revenue_share: Money, expense_share: Money| {
            let profit_share = revenue_share - expense_share;
            OwnerTaxEstimate {
                owner,
                revenue_share,
                expense_share,
                profit_share,
                estimated_tax: progressive_tax(profit_share, brackets),
            }
        };

        IncomeTaxEstimate {
            year,
            owners: vec![
                estimate(Owner::Daan, revenue.0, costs.0),
                estimate(Owner::Wim, revenue.1, costs.1),
            ],
        }
    }

    /// Every year that has a dated invoice or expense, newest first.
    pub fn available_years(&self) -> Vec<i32> {
        let years: BTreeSet<i32> = self
            .invoices
            .iter()
            .map(|i| i.invoice_date.year())
            .chain(self.expenses.iter().filter_map(|e| e.expense_date.map(|d| d.year())))
            .collect();
        years.into_iter().rev().collect()
    }

    /// Dashboard KPIs. Revenue counts billed invoices (sent, paid, expired);
    /// profit is paid revenue minus expenses.
    pub fn dashboard(&self, year: i32) -> DashboardSummary {
        let invoices: Vec<&Invoice> = self.invoices_in_year(year).collect();
        let expenses: Vec<&Expense> = self.expenses_in_year(year).collect();

        let total_revenue = sum_totals(&invoices, |s| s.is_billed());
        let total_paid = sum_totals(&invoices, |s| s == InvoiceStatus::Paid);
        let outstanding = sum_totals(&invoices, |s| s.is_outstanding());
        let expense_total: Money = expenses.iter().map(|e| e.total()).sum();

        let customer_count = invoices
            .iter()
            .map(|i| i.customer_id)
            .collect::<HashSet<_>>()
            .len();

        let status_distribution = InvoiceStatus::ALL
            .iter()
            .map(|status| StatusCount {
                status: *status,
                count: invoices.iter().filter(|i| i.status() == *status).count(),
            })
            .collect();

        let mut recent_invoices: Vec<Invoice> = invoices.iter().map(|i| (*i).clone()).collect();
        recent_invoices.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        recent_invoices.truncate(RECENT_LIMIT);

        let mut recent_expenses: Vec<Expense> = expenses.iter().map(|e| (*e).clone()).collect();
        recent_expenses.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        recent_expenses.truncate(RECENT_LIMIT);

        let mut available_years = self.available_years();
        if !available_years.contains(&year) {
            available_years.push(year);
            available_years.sort_unstable_by(|a, b| b.cmp(a));
        }

        DashboardSummary {
            year,
            available_years,
            total_revenue,
            total_paid,
            outstanding,
            expenses: expense_total,
            profit: total_paid - expense_total,
            invoice_count: invoices.len(),
            customer_count,
            monthly: self.monthly_summary(year),
            categories: self.category_breakdown(year),
            status_distribution,
            recent_invoices,
            recent_expenses,
        }
    }
}
