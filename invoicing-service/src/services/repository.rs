//! Persistence for invoicing-service.

use crate::models::{
    CompanySettings, Customer, Expense, Invoice, ListExpensesFilter, ListInvoicesFilter,
};
use async_trait::async_trait;
use dashmap::DashMap;
use service_core::error::AppError;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Load/save/delete for customers, invoices, expenses and company settings.
///
/// Writes are last-write-wins per record.
#[async_trait]
pub trait InvoicingRepository: Send + Sync {
    async fn save_customer(&self, customer: &Customer) -> Result<(), AppError>;
    async fn get_customer(&self, customer_id: Uuid) -> Result<Option<Customer>, AppError>;
    async fn list_customers(&self) -> Result<Vec<Customer>, AppError>;
    async fn delete_customer(&self, customer_id: Uuid) -> Result<bool, AppError>;

    /// Fails with `Conflict` when another invoice already carries the number.
    async fn save_invoice(&self, invoice: &Invoice) -> Result<(), AppError>;
    async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError>;
    async fn list_invoices(&self, filter: &ListInvoicesFilter) -> Result<Vec<Invoice>, AppError>;
    async fn delete_invoice(&self, invoice_id: Uuid) -> Result<bool, AppError>;
    async fn delete_invoices_for_customer(&self, customer_id: Uuid) -> Result<usize, AppError>;

    async fn save_expense(&self, expense: &Expense) -> Result<(), AppError>;
    async fn get_expense(&self, expense_id: Uuid) -> Result<Option<Expense>, AppError>;
    async fn list_expenses(&self, filter: &ListExpensesFilter) -> Result<Vec<Expense>, AppError>;
    async fn delete_expense(&self, expense_id: Uuid) -> Result<bool, AppError>;

    async fn load_settings(&self) -> Result<Option<CompanySettings>, AppError>;
    async fn save_settings(&self, settings: &CompanySettings) -> Result<(), AppError>;
}

/// Process-local repository backed by concurrent maps.
#[derive(Default)]
pub struct InMemoryRepository {
    customers: DashMap<Uuid, Customer>,
    invoices: DashMap<Uuid, Invoice>,
    expenses: DashMap<Uuid, Expense>,
    settings: RwLock<Option<CompanySettings>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoicingRepository for InMemoryRepository {
    async fn save_customer(&self, customer: &Customer) -> Result<(), AppError> {
        self.customers.insert(customer.customer_id, customer.clone());
        Ok(())
    }

    async fn get_customer(&self, customer_id: Uuid) -> Result<Option<Customer>, AppError> {
        Ok(self.customers.get(&customer_id).map(|c| c.value().clone()))
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        let mut customers: Vec<Customer> =
            self.customers.iter().map(|c| c.value().clone()).collect();
        customers.sort_by(|a, b| {
            a.company_name
                .to_lowercase()
                .cmp(&b.company_name.to_lowercase())
        });
        Ok(customers)
    }

    async fn delete_customer(&self, customer_id: Uuid) -> Result<bool, AppError> {
        Ok(self.customers.remove(&customer_id).is_some())
    }

    #[instrument(skip(self, invoice), fields(invoice_id = %invoice.invoice_id))]
    async fn save_invoice(&self, invoice: &Invoice) -> Result<(), AppError> {
        let duplicate = self.invoices.iter().any(|entry| {
            entry.key() != &invoice.invoice_id
                && entry.value().invoice_number == invoice.invoice_number
        });
        if duplicate {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Invoice number {} is already in use",
                invoice.invoice_number
            )));
        }
        self.invoices.insert(invoice.invoice_id, invoice.clone());
        debug!(invoice_number = %invoice.invoice_number, "Invoice stored");
        Ok(())
    }

    async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        Ok(self.invoices.get(&invoice_id).map(|i| i.value().clone()))
    }

    async fn list_invoices(&self, filter: &ListInvoicesFilter) -> Result<Vec<Invoice>, AppError> {
        let mut invoices: Vec<Invoice> = self
            .invoices
            .iter()
            .filter(|i| filter.matches(i.value()))
            .map(|i| i.value().clone())
            .collect();
        invoices.sort_by(|a, b| {
            b.invoice_date
                .cmp(&a.invoice_date)
                .then_with(|| b.invoice_number.cmp(&a.invoice_number))
        });
        Ok(invoices)
    }

    async fn delete_invoice(&self, invoice_id: Uuid) -> Result<bool, AppError> {
        Ok(self.invoices.remove(&invoice_id).is_some())
    }

    async fn delete_invoices_for_customer(&self, customer_id: Uuid) -> Result<usize, AppError> {
        let before = self.invoices.len();
        self.invoices
            .retain(|_, invoice| invoice.customer_id != customer_id);
        Ok(before.saturating_sub(self.invoices.len()))
    }

    async fn save_expense(&self, expense: &Expense) -> Result<(), AppError> {
        self.expenses.insert(expense.expense_id, expense.clone());
        Ok(())
    }

    async fn get_expense(&self, expense_id: Uuid) -> Result<Option<Expense>, AppError> {
        Ok(self.expenses.get(&expense_id).map(|e| e.value().clone()))
    }

    async fn list_expenses(&self, filter: &ListExpensesFilter) -> Result<Vec<Expense>, AppError> {
        let mut expenses: Vec<Expense> = self
            .expenses
            .iter()
            .filter(|e| filter.matches(e.value()))
            .map(|e| e.value().clone())
            .collect();
        expenses.sort_by(|a, b| {
            b.expense_date
                .cmp(&a.expense_date)
                .then_with(|| b.created_utc.cmp(&a.created_utc))
        });
        Ok(expenses)
    }

    async fn delete_expense(&self, expense_id: Uuid) -> Result<bool, AppError> {
        Ok(self.expenses.remove(&expense_id).is_some())
    }

    async fn load_settings(&self) -> Result<Option<CompanySettings>, AppError> {
        Ok(self.settings.read().await.clone())
    }

    async fn save_settings(&self, settings: &CompanySettings) -> Result<(), AppError> {
        *self.settings.write().await = Some(settings.clone());
        Ok(())
    }
}
