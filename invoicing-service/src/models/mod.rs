//! Domain models for invoicing-service.

mod customer;
mod expense;
mod invoice;
mod line_item;
mod money;
mod owner;
mod report;
mod settings;
mod vat;

pub use customer::{CreateCustomer, Customer, UpdateCustomer};
pub use expense::{
    CreateExpense, Expense, ExpenseStatus, ExtractionMethod, ListExpensesFilter, RawExtraction,
    UpdateExpense, SUGGESTED_CATEGORIES,
};
pub use invoice::{
    CreateInvoice, Invoice, InvoiceStatus, InvoiceTotals, ListInvoicesFilter, TotalsPreview,
    UpdateInvoice,
};
pub use line_item::{LineAmounts, LineItem};
pub use money::{round_cents, Money};
pub use owner::Owner;
pub use report::{
    CategoryTotal, DashboardSummary, IncomeTaxEstimate, MonthlySummary, OwnerTaxEstimate,
    ProfitAndLoss, StatusCount, VatReturn,
};
pub use settings::{format_invoice_number, CompanySettings};
pub use vat::VatRate;
