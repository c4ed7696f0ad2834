//! Invoice operations.

use super::{gateway, not_found, reject, InvoicingApi};
use crate::error::DomainError;
use crate::models::{
    CompanySettings, CreateInvoice, Customer, Invoice, InvoiceStatus, LineItem,
    ListInvoicesFilter, TotalsPreview, UpdateInvoice,
};
use crate::services::metrics::{record_invoice_operation, record_invoiced_amount};
use crate::services::providers::{Attachment, DeliveryMessage, ProviderError, RenderedDocument};
use service_core::error::AppError;
use tracing::{info, instrument, warn, Span};
use uuid::Uuid;

/// Optional overrides for the invoice e-mail.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub subject: Option<String>,
    pub message: Option<String>,
}

fn compose_message(
    invoice: &Invoice,
    customer: &Customer,
    email: &str,
    settings: &CompanySettings,
    document: RenderedDocument,
    options: SendOptions,
) -> DeliveryMessage {
    let contact = customer.contact_name();
    let subject = options.subject.filter(|s| !s.trim().is_empty()).unwrap_or_else(|| {
        format!("Factuur {} - {}", invoice.invoice_number, settings.company_name)
    });

    let body_text = options
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            let signature: Vec<&str> = [
                Some(settings.company_name.as_str()),
                settings.email.as_deref(),
                settings.phone.as_deref(),
            ]
            .into_iter()
            .flatten()
            .collect();
            format!(
                "Beste {},\n\n\
                 Hierbij ontvangt u factuur {} van {}.\n\n\
                 Factuurbedrag: {}\n\
                 Vervaldatum: {}\n\n\
                 De factuur vindt u als bijlage bij deze e-mail.\n\n\
                 Met vriendelijke groet,\n{}\n",
                contact,
                invoice.invoice_number,
                settings.company_name,
                invoice.total().to_display_string(),
                invoice.due_date.format("%d-%m-%Y"),
                signature.join("\n"),
            )
        });

    DeliveryMessage {
        to: email.to_string(),
        to_name: Some(contact),
        subject,
        body_text,
        from_name: Some(settings.company_name.clone()),
        reply_to: settings.email.clone(),
        attachments: vec![Attachment {
            file_name: document.file_name,
            content_type: document.content_type,
            bytes: document.bytes,
        }],
    }
}

impl InvoicingApi {
    /// Line and invoice totals for an unsaved form, computed by the same
    /// rules as a stored invoice.
    pub fn preview_totals(&self, lines: &[LineItem]) -> Result<TotalsPreview, AppError> {
        TotalsPreview::compute(lines).map_err(reject)
    }

    async fn load_customer(&self, customer_id: Uuid) -> Result<Customer, AppError> {
        self.repo
            .get_customer(customer_id)
            .await?
            .ok_or_else(|| not_found("Customer", customer_id))
    }

    async fn load_invoice(&self, invoice_id: Uuid) -> Result<Invoice, AppError> {
        self.repo
            .get_invoice(invoice_id)
            .await?
            .ok_or_else(|| not_found("Invoice", invoice_id))
    }

    /// Create a concept invoice with the next invoice number.
    #[instrument(
        skip(self, input),
        fields(service = "invoicing-service", method = "CreateInvoice", customer_id, invoice_id)
    )]
    pub async fn create_invoice(&self, input: CreateInvoice) -> Result<Invoice, AppError> {
        let customer_id = input.customer_id.ok_or_else(|| {
            reject(DomainError::Validation("Customer is required".to_string()))
        })?;
        Span::current().record("customer_id", customer_id.to_string());

        // Held across the customer lookup so a concurrent delete cannot
        // orphan the new invoice.
        let _guard = self.numbering.lock().await;
        let customer = self.load_customer(customer_id).await?;
        let mut settings = self.get_settings().await?;
        let invoice = Invoice::create(
            input,
            settings.peek_invoice_number(),
            customer.company_name.clone(),
            self.clock.today(),
            self.config.payment_term_days,
            self.clock.now(),
        )
        .map_err(reject)?;

        self.repo.save_invoice(&invoice).await.map_err(reject)?;
        settings.take_invoice_number();
        self.repo.save_settings(&settings).await?;

        Span::current().record("invoice_id", invoice.invoice_id.to_string());
        record_invoice_operation("create");
        record_invoiced_amount(invoice.total());
        info!(
            invoice_number = %invoice.invoice_number,
            total = %invoice.total(),
            "Invoice created"
        );
        Ok(invoice)
    }

    #[instrument(skip(self), fields(service = "invoicing-service", method = "GetInvoice"))]
    pub async fn get_invoice(&self, invoice_id: Uuid) -> Result<Invoice, AppError> {
        self.load_invoice(invoice_id).await
    }

    #[instrument(skip(self, filter), fields(service = "invoicing-service", method = "ListInvoices"))]
    pub async fn list_invoices(&self, filter: &ListInvoicesFilter) -> Result<Vec<Invoice>, AppError> {
        self.repo.list_invoices(filter).await
    }

    /// Patch a concept invoice.
    #[instrument(skip(self, changes), fields(service = "invoicing-service", method = "UpdateInvoice"))]
    pub async fn update_invoice(
        &self,
        invoice_id: Uuid,
        changes: UpdateInvoice,
    ) -> Result<Invoice, AppError> {
        let mut invoice = self.load_invoice(invoice_id).await?;
        let customer_name = match changes.customer_id {
            Some(customer_id) if customer_id != invoice.customer_id => {
                Some(self.load_customer(customer_id).await?.company_name)
            }
            _ => None,
        };

        invoice
            .update(changes, customer_name, self.clock.now())
            .map_err(reject)?;
        self.repo.save_invoice(&invoice).await.map_err(reject)?;

        record_invoice_operation("update");
        info!(invoice_number = %invoice.invoice_number, total = %invoice.total(), "Invoice updated");
        Ok(invoice)
    }

    /// Move an invoice to `next` without side effects.
    #[instrument(skip(self), fields(service = "invoicing-service", method = "TransitionInvoice"))]
    pub async fn transition_invoice(
        &self,
        invoice_id: Uuid,
        next: InvoiceStatus,
    ) -> Result<Invoice, AppError> {
        let mut invoice = self.load_invoice(invoice_id).await?;
        let previous = invoice.status();
        invoice.transition(next, self.clock.now()).map_err(reject)?;
        self.repo.save_invoice(&invoice).await?;

        record_invoice_operation(next.as_str());
        info!(
            invoice_number = %invoice.invoice_number,
            from = %previous,
            to = %next,
            "Invoice status changed"
        );
        Ok(invoice)
    }

    /// Render, e-mail and mark a concept invoice as sent.
    ///
    /// The status only changes after the delivery provider accepted the
    /// message.
    #[instrument(skip(self, options), fields(service = "invoicing-service", method = "SendInvoice"))]
    pub async fn send_invoice(
        &self,
        invoice_id: Uuid,
        options: SendOptions,
    ) -> Result<Invoice, AppError> {
        let mut invoice = self.load_invoice(invoice_id).await?;
        if !invoice.status().can_transition_to(InvoiceStatus::Sent) {
            return Err(reject(DomainError::InvalidStateTransition(format!(
                "Invoice {} cannot be sent from status {}",
                invoice.invoice_number,
                invoice.status()
            ))));
        }

        let customer = self.load_customer(invoice.customer_id).await?;
        let email = customer
            .email
            .clone()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                reject(DomainError::Validation(format!(
                    "Customer {} has no e-mail address",
                    customer.company_name
                )))
            })?;
        if !self.delivery.is_enabled() {
            return Err(gateway(ProviderError::NotConfigured(
                "No delivery provider is enabled".to_string(),
            )));
        }
        let settings = self.get_settings().await?;

        let document = self
            .renderer
            .render(&invoice, &customer, &settings)
            .await
            .map_err(gateway)?;
        let location = document.location.clone();
        let message = compose_message(&invoice, &customer, &email, &settings, document, options);

        let response = self.delivery.send(&message).await.map_err(|e| {
            warn!(invoice_number = %invoice.invoice_number, error = %e, "Invoice delivery failed");
            gateway(e)
        })?;
        if !response.success {
            let reason = response.message.unwrap_or_else(|| "delivery refused".to_string());
            return Err(reject(AppError::BadGateway(reason)));
        }

        invoice
            .transition(InvoiceStatus::Sent, self.clock.now())
            .map_err(reject)?;
        invoice.document_ref = Some(location);
        self.repo.save_invoice(&invoice).await?;

        record_invoice_operation("send");
        info!(
            invoice_number = %invoice.invoice_number,
            to = %email,
            provider_id = ?response.provider_id,
            "Invoice sent"
        );
        Ok(invoice)
    }

    pub async fn mark_invoice_paid(&self, invoice_id: Uuid) -> Result<Invoice, AppError> {
        self.transition_invoice(invoice_id, InvoiceStatus::Paid).await
    }

    /// Render the invoice document and store its location on the invoice.
    #[instrument(skip(self), fields(service = "invoicing-service", method = "GenerateInvoiceDocument"))]
    pub async fn generate_invoice_document(
        &self,
        invoice_id: Uuid,
    ) -> Result<RenderedDocument, AppError> {
        let mut invoice = self.load_invoice(invoice_id).await?;
        let customer = self.load_customer(invoice.customer_id).await?;
        let settings = self.get_settings().await?;

        let document = self
            .renderer
            .render(&invoice, &customer, &settings)
            .await
            .map_err(gateway)?;
        invoice.document_ref = Some(document.location.clone());
        invoice.updated_utc = self.clock.now();
        self.repo.save_invoice(&invoice).await?;

        record_invoice_operation("render");
        info!(
            invoice_number = %invoice.invoice_number,
            location = %document.location,
            "Invoice document generated"
        );
        Ok(document)
    }

    /// Expire every sent invoice whose due date lies before today.
    #[instrument(skip(self), fields(service = "invoicing-service", method = "ExpireOverdueInvoices"))]
    pub async fn expire_overdue_invoices(&self) -> Result<Vec<Invoice>, AppError> {
        let today = self.clock.today();
        let now = self.clock.now();
        let filter = ListInvoicesFilter {
            status: Some(InvoiceStatus::Sent),
            ..Default::default()
        };

        let mut expired = Vec::new();
        for mut invoice in self.repo.list_invoices(&filter).await? {
            if !invoice.is_overdue(today) {
                continue;
            }
            invoice.transition(InvoiceStatus::Expired, now).map_err(reject)?;
            self.repo.save_invoice(&invoice).await?;
            record_invoice_operation("expire");
            expired.push(invoice);
        }

        info!(count = expired.len(), %today, "Overdue invoices expired");
        Ok(expired)
    }

    #[instrument(skip(self), fields(service = "invoicing-service", method = "DeleteInvoice"))]
    pub async fn delete_invoice(&self, invoice_id: Uuid) -> Result<(), AppError> {
        if !self.repo.delete_invoice(invoice_id).await? {
            return Err(not_found("Invoice", invoice_id));
        }
        record_invoice_operation("delete");
        info!(%invoice_id, "Invoice deleted");
        Ok(())
    }
}
