//! Period reports.

use super::{reject, InvoicingApi};
use crate::models::{
    CategoryTotal, DashboardSummary, Expense, IncomeTaxEstimate, Invoice, ListExpensesFilter,
    ListInvoicesFilter, MonthlySummary, ProfitAndLoss, VatReturn,
};
use crate::services::PeriodAggregator;
use service_core::error::AppError;
use tracing::{info, instrument};

impl InvoicingApi {
    async fn load_period_records(&self) -> Result<(Vec<Invoice>, Vec<Expense>), AppError> {
        let invoices = self
            .repo
            .list_invoices(&ListInvoicesFilter::default())
            .await?;
        let expenses = self
            .repo
            .list_expenses(&ListExpensesFilter::default())
            .await?;
        Ok((invoices, expenses))
    }

    #[instrument(skip(self), fields(service = "invoicing-service", method = "MonthlySummary"))]
    pub async fn monthly_summary(&self, year: i32) -> Result<Vec<MonthlySummary>, AppError> {
        let (invoices, expenses) = self.load_period_records().await?;
        Ok(PeriodAggregator::new(&invoices, &expenses).monthly_summary(year))
    }

    #[instrument(skip(self), fields(service = "invoicing-service", method = "CategoryBreakdown"))]
    pub async fn category_breakdown(&self, year: i32) -> Result<Vec<CategoryTotal>, AppError> {
        let (invoices, expenses) = self.load_period_records().await?;
        Ok(PeriodAggregator::new(&invoices, &expenses)
            .with_default_category(&self.config.default_category)
            .category_breakdown(year))
    }

    #[instrument(skip(self), fields(service = "invoicing-service", method = "VatReturn"))]
    pub async fn vat_return(&self, year: i32, quarter: u32) -> Result<VatReturn, AppError> {
        let (invoices, expenses) = self.load_period_records().await?;
        let vat = PeriodAggregator::new(&invoices, &expenses)
            .vat_return(year, quarter)
            .map_err(reject)?;
        info!(net_payable = %vat.net_payable, "VAT return computed");
        Ok(vat)
    }

    #[instrument(skip(self), fields(service = "invoicing-service", method = "ProfitAndLoss"))]
    pub async fn profit_and_loss(&self, year: i32) -> Result<ProfitAndLoss, AppError> {
        let (invoices, expenses) = self.load_period_records().await?;
        Ok(PeriodAggregator::new(&invoices, &expenses).profit_and_loss(year))
    }

    /// Income tax per partner using the configured split and brackets.
    #[instrument(skip(self), fields(service = "invoicing-service", method = "IncomeTaxEstimate"))]
    pub async fn income_tax_estimate(&self, year: i32) -> Result<IncomeTaxEstimate, AppError> {
        let (invoices, expenses) = self.load_period_records().await?;
        Ok(PeriodAggregator::new(&invoices, &expenses).income_tax_estimate(
            year,
            self.config.both_share,
            &self.config.income_tax_brackets,
        ))
    }

    #[instrument(skip(self), fields(service = "invoicing-service", method = "Dashboard"))]
    pub async fn dashboard(&self, year: i32) -> Result<DashboardSummary, AppError> {
        let (invoices, expenses) = self.load_period_records().await?;
        Ok(PeriodAggregator::new(&invoices, &expenses)
            .with_default_category(&self.config.default_category)
            .dashboard(year))
    }
}
