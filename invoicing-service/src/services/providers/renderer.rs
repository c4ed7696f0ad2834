//! Plain-text invoice renderer.

use super::{DocumentRenderer, ProviderError, RenderedDocument};
use crate::models::{CompanySettings, Customer, Invoice, VatRate};
use async_trait::async_trait;
use std::fmt::Write;

/// Renders an invoice as a fixed-width text document.
///
/// Stands in wherever no PDF service is wired up; the layout follows the
/// printed invoice: sender, addressee, lines, totals, payment instruction.
#[derive(Debug, Clone)]
pub struct TextInvoiceRenderer {
    location_prefix: String,
}

impl TextInvoiceRenderer {
    pub fn new(location_prefix: impl Into<String>) -> Self {
        Self {
            location_prefix: location_prefix.into(),
        }
    }

    pub fn render_text(
        &self,
        invoice: &Invoice,
        customer: &Customer,
        settings: &CompanySettings,
    ) -> Result<String, ProviderError> {
        let mut out = String::new();
        self.write_document(&mut out, invoice, customer, settings)
            .map_err(|e| ProviderError::ApiError(format!("Failed to render invoice: {}", e)))?;
        Ok(out)
    }

    fn write_document(
        &self,
        out: &mut String,
        invoice: &Invoice,
        customer: &Customer,
        settings: &CompanySettings,
    ) -> std::fmt::Result {
        writeln!(out, "{}", settings.company_name)?;
        for line in [settings.address.clone(), settings.locality()]
            .into_iter()
            .flatten()
        {
            writeln!(out, "{}", line)?;
        }
        if let Some(kvk) = &settings.kvk_number {
            writeln!(out, "KVK: {}", kvk)?;
        }
        if let Some(vat) = &settings.vat_number {
            writeln!(out, "BTW: {}", vat)?;
        }
        writeln!(out)?;

        writeln!(out, "FACTUUR {}", invoice.invoice_number)?;
        writeln!(out, "Factuurdatum: {}", invoice.invoice_date.format("%d-%m-%Y"))?;
        writeln!(out, "Vervaldatum:  {}", invoice.due_date.format("%d-%m-%Y"))?;
        writeln!(out)?;

        writeln!(out, "Factuur aan:")?;
        writeln!(out, "{}", customer.company_name)?;
        let contact = customer.contact_name();
        if contact != customer.company_name {
            writeln!(out, "t.a.v. {}", contact)?;
        }
        if let Some(address) = &customer.address {
            writeln!(out, "{}", address)?;
        }
        let locality: Vec<&str> = [customer.postcode.as_deref(), customer.city.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if !locality.is_empty() {
            writeln!(out, "{}", locality.join(" "))?;
        }
        if let Some(subject) = &invoice.subject {
            writeln!(out)?;
            writeln!(out, "Onderwerp: {}", subject)?;
        }
        writeln!(out)?;

        writeln!(
            out,
            "{:<40} {:>8} {:>12} {:>6} {:>14}",
            "Omschrijving", "Aantal", "Tarief", "BTW %", "Totaal"
        )?;
        for line in invoice.lines() {
            let total = line
                .line_total()
                .map(|m| m.to_display_string())
                .unwrap_or_default();
            writeln!(
                out,
                "{:<40} {:>8} {:>12} {:>5}% {:>14}",
                line.description,
                line.quantity.normalize(),
                format!("€ {:.2}", line.unit_rate),
                line.vat_rate.percentage(),
                total
            )?;
        }
        writeln!(out)?;

        writeln!(out, "{:<20} {:>14}", "Subtotaal", invoice.subtotal().to_display_string())?;
        for rate in VatRate::ALL {
            let vat: crate::models::Money = invoice
                .lines()
                .iter()
                .filter(|l| l.vat_rate == rate)
                .filter_map(|l| l.line_vat().ok())
                .sum();
            if !vat.is_zero() {
                let label = format!("BTW {}%", rate.percentage());
                writeln!(out, "{:<20} {:>14}", label, vat.to_display_string())?;
            }
        }
        writeln!(out, "{:<20} {:>14}", "Totaal", invoice.total().to_display_string())?;
        writeln!(out)?;

        if let Some(iban) = &settings.iban {
            writeln!(
                out,
                "Gelieve het bedrag voor {} over te maken op IBAN {} o.v.v. factuurnummer {}.",
                invoice.due_date.format("%d-%m-%Y"),
                iban,
                invoice.invoice_number
            )?;
        }
        if let Some(notes) = &invoice.notes {
            writeln!(out)?;
            writeln!(out, "Opmerkingen:")?;
            writeln!(out, "{}", notes)?;
        }
        Ok(())
    }
}

impl Default for TextInvoiceRenderer {
    fn default() -> Self {
        Self::new("invoices")
    }
}

#[async_trait]
impl DocumentRenderer for TextInvoiceRenderer {
    async fn render(
        &self,
        invoice: &Invoice,
        customer: &Customer,
        settings: &CompanySettings,
    ) -> Result<RenderedDocument, ProviderError> {
        let text = self.render_text(invoice, customer, settings)?;
        let file_name = format!("{}.txt", invoice.invoice_number);
        Ok(RenderedDocument {
            location: format!("{}/{}", self.location_prefix.trim_end_matches('/'), file_name),
            file_name,
            content_type: "text/plain; charset=utf-8".to_string(),
            bytes: text.into_bytes(),
        })
    }
}
