//! Customer operations.

use super::{not_found, reject, InvoicingApi};
use crate::error::DomainError;
use crate::models::{CreateCustomer, Customer, UpdateCustomer};
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

impl InvoicingApi {
    #[instrument(skip(self, input), fields(service = "invoicing-service", method = "CreateCustomer"))]
    pub async fn create_customer(&self, input: CreateCustomer) -> Result<Customer, AppError> {
        input.validate().map_err(reject)?;
        require_company_name(Some(&input.company_name))?;
        let customer = Customer::new(input, self.clock.now());
        self.repo.save_customer(&customer).await?;
        info!(customer_id = %customer.customer_id, company = %customer.company_name, "Customer created");
        Ok(customer)
    }

    #[instrument(skip(self), fields(service = "invoicing-service", method = "GetCustomer"))]
    pub async fn get_customer(&self, customer_id: Uuid) -> Result<Customer, AppError> {
        self.repo
            .get_customer(customer_id)
            .await?
            .ok_or_else(|| not_found("Customer", customer_id))
    }

    /// All customers, ordered by company name.
    #[instrument(skip(self), fields(service = "invoicing-service", method = "ListCustomers"))]
    pub async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        self.repo.list_customers().await
    }

    /// Patch a customer. Invoices keep the name they were created with.
    #[instrument(skip(self, changes), fields(service = "invoicing-service", method = "UpdateCustomer"))]
    pub async fn update_customer(
        &self,
        customer_id: Uuid,
        changes: UpdateCustomer,
    ) -> Result<Customer, AppError> {
        changes.validate().map_err(reject)?;
        require_company_name(changes.company_name.as_deref())?;
        let mut customer = self.get_customer(customer_id).await?;
        customer.apply(changes, self.clock.now());
        self.repo.save_customer(&customer).await?;
        info!(%customer_id, "Customer updated");
        Ok(customer)
    }

    /// Delete a customer together with all of its invoices. Returns the
    /// number of invoices removed.
    #[instrument(skip(self), fields(service = "invoicing-service", method = "DeleteCustomer"))]
    pub async fn delete_customer(&self, customer_id: Uuid) -> Result<usize, AppError> {
        let _guard = self.numbering.lock().await;
        self.get_customer(customer_id).await?;
        let removed = self.repo.delete_invoices_for_customer(customer_id).await?;
        if !self.repo.delete_customer(customer_id).await? {
            return Err(not_found("Customer", customer_id));
        }
        info!(%customer_id, invoices_removed = removed, "Customer deleted");
        Ok(removed)
    }
}

/// `None` means the name is not being changed.
pub(crate) fn require_company_name(name: Option<&str>) -> Result<(), AppError> {
    match name {
        Some(name) if name.trim().is_empty() => Err(reject(DomainError::Validation(
            "Company name is required".to_string(),
        ))),
        _ => Ok(()),
    }
}
