//! Expense operations.

use super::{not_found, reject, InvoicingApi};
use crate::error::DomainError;
use crate::models::{CreateExpense, Expense, ListExpensesFilter, Owner, UpdateExpense};
use crate::services::metrics::{record_expense_operation, record_extraction};
use crate::services::providers::DocumentContext;
use service_core::error::AppError;
use tracing::{info, instrument, Span};
use uuid::Uuid;

impl InvoicingApi {
    async fn load_expense(&self, expense_id: Uuid) -> Result<Expense, AppError> {
        self.repo
            .get_expense(expense_id)
            .await?
            .ok_or_else(|| not_found("Expense", expense_id))
    }

    /// Record a hand-entered expense.
    #[instrument(
        skip(self, input),
        fields(service = "invoicing-service", method = "CreateExpense", expense_id)
    )]
    pub async fn create_expense(&self, input: CreateExpense) -> Result<Expense, AppError> {
        let expense = Expense::create(input, self.clock.now()).map_err(reject)?;
        self.repo.save_expense(&expense).await?;

        Span::current().record("expense_id", expense.expense_id.to_string());
        record_expense_operation("create");
        info!(supplier = %expense.supplier, total = %expense.total(), "Expense created");
        Ok(expense)
    }

    /// Turn an uploaded supplier invoice into a `new` expense awaiting review.
    #[instrument(
        skip(self, document),
        fields(service = "invoicing-service", method = "CaptureExpense", file_name = %document.file_name, expense_id)
    )]
    pub async fn capture_expense(
        &self,
        document: DocumentContext,
        owner: Owner,
    ) -> Result<Expense, AppError> {
        if !document.is_pdf() {
            return Err(reject(DomainError::Validation(format!(
                "Only PDF files are accepted, got {}",
                document.file_name
            ))));
        }

        let raw = self.extraction.extract(&document).await;
        record_extraction(raw.method.as_str());

        let expense = Expense::capture_from_document(raw, owner, document.url, self.clock.now());
        self.repo.save_expense(&expense).await?;

        Span::current().record("expense_id", expense.expense_id.to_string());
        record_expense_operation("capture");
        info!(
            supplier = %expense.supplier,
            total = %expense.total(),
            method = ?expense.extraction_method(),
            "Expense captured from document"
        );
        Ok(expense)
    }

    #[instrument(skip(self), fields(service = "invoicing-service", method = "GetExpense"))]
    pub async fn get_expense(&self, expense_id: Uuid) -> Result<Expense, AppError> {
        self.load_expense(expense_id).await
    }

    #[instrument(skip(self, filter), fields(service = "invoicing-service", method = "ListExpenses"))]
    pub async fn list_expenses(&self, filter: &ListExpensesFilter) -> Result<Vec<Expense>, AppError> {
        self.repo.list_expenses(filter).await
    }

    /// Correct an expense that is not yet paid.
    #[instrument(skip(self, changes), fields(service = "invoicing-service", method = "UpdateExpense"))]
    pub async fn update_expense(
        &self,
        expense_id: Uuid,
        changes: UpdateExpense,
    ) -> Result<Expense, AppError> {
        let mut expense = self.load_expense(expense_id).await?;
        expense.correct(changes, self.clock.now()).map_err(reject)?;
        self.repo.save_expense(&expense).await?;

        record_expense_operation("update");
        info!(%expense_id, total = %expense.total(), "Expense updated");
        Ok(expense)
    }

    #[instrument(skip(self), fields(service = "invoicing-service", method = "ApproveExpense"))]
    pub async fn approve_expense(&self, expense_id: Uuid) -> Result<Expense, AppError> {
        let mut expense = self.load_expense(expense_id).await?;
        expense.approve(self.clock.now()).map_err(reject)?;
        self.repo.save_expense(&expense).await?;

        record_expense_operation("approve");
        info!(%expense_id, "Expense approved");
        Ok(expense)
    }

    #[instrument(skip(self), fields(service = "invoicing-service", method = "MarkExpensePaid"))]
    pub async fn mark_expense_paid(&self, expense_id: Uuid) -> Result<Expense, AppError> {
        let mut expense = self.load_expense(expense_id).await?;
        expense.mark_paid(self.clock.now()).map_err(reject)?;
        self.repo.save_expense(&expense).await?;

        record_expense_operation("pay");
        info!(%expense_id, "Expense paid");
        Ok(expense)
    }

    #[instrument(skip(self), fields(service = "invoicing-service", method = "DeleteExpense"))]
    pub async fn delete_expense(&self, expense_id: Uuid) -> Result<(), AppError> {
        if !self.repo.delete_expense(expense_id).await? {
            return Err(not_found("Expense", expense_id));
        }
        record_expense_operation("delete");
        info!(%expense_id, "Expense deleted");
        Ok(())
    }
}
