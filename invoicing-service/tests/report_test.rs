//! Period report integration tests for invoicing-service.

mod common;

use common::{date, line, TestApp};
use invoicing_service::models::{
    CreateExpense, CreateInvoice, Customer, InvoiceStatus, Money, Owner,
};
use service_core::error::AppError;

async fn invoice_on(
    app: &TestApp,
    customer: &Customer,
    invoice_date: &str,
    rate: &str,
    vat: &str,
    owner: Owner,
) -> uuid::Uuid {
    app.api
        .create_invoice(CreateInvoice {
            lines: vec![line("Werkzaamheden", "1", rate, vat)],
            owner,
            ..app.invoice_input(customer, invoice_date)
        })
        .await
        .expect("Failed to create invoice")
        .invoice_id
}

async fn expense_on(
    app: &TestApp,
    expense_date: Option<&str>,
    subtotal: i64,
    vat: i64,
    category: &str,
    owner: Owner,
) {
    app.api
        .create_expense(CreateExpense {
            supplier: "Leverancier".to_string(),
            expense_date: expense_date.map(date),
            category: category.to_string(),
            subtotal: Money::from_cents(subtotal),
            vat: Money::from_cents(vat),
            owner,
            ..Default::default()
        })
        .await
        .expect("Failed to create expense");
}

#[tokio::test]
async fn monthly_summary_covers_the_whole_year() {
    let app = TestApp::spawn().await;
    let customer = app.seed_customer("Acme B.V.", None).await;
    invoice_on(&app, &customer, "2024-01-15", "100", "21", Owner::Both).await;
    invoice_on(&app, &customer, "2024-02-10", "50", "0", Owner::Both).await;
    invoice_on(&app, &customer, "2023-12-31", "75", "0", Owner::Both).await;
    expense_on(&app, Some("2024-02-20"), 1000, 210, "", Owner::Both).await;
    expense_on(&app, None, 5000, 0, "", Owner::Both).await;

    let months = app
        .api
        .monthly_summary(2024)
        .await
        .expect("Failed to get monthly summary");

    assert_eq!(months.len(), 12);
    assert_eq!(months[0].month, "2024-01");
    assert_eq!(months[0].revenue, Money::from_cents(12100));
    assert_eq!(months[1].month, "2024-02");
    assert_eq!(months[1].revenue, Money::from_cents(5000));
    assert_eq!(months[1].expenses, Money::from_cents(1210));
    let rest: Money = months[2..].iter().map(|m| m.revenue + m.expenses).sum();
    assert!(rest.is_zero());
}

#[tokio::test]
async fn vat_return_nets_output_against_input() {
    let app = TestApp::spawn().await;
    let customer = app.seed_customer("Acme B.V.", None).await;
    invoice_on(&app, &customer, "2024-02-01", "100", "21", Owner::Both).await;
    invoice_on(&app, &customer, "2024-04-01", "1000", "21", Owner::Both).await;
    expense_on(&app, Some("2024-03-01"), 4000, 840, "", Owner::Both).await;
    expense_on(&app, None, 4000, 840, "", Owner::Both).await;

    let vat = app
        .api
        .vat_return(2024, 1)
        .await
        .expect("Failed to compute VAT return");

    assert_eq!(vat.output_base, Money::from_cents(10000));
    assert_eq!(vat.output_vat, Money::from_cents(2100));
    assert_eq!(vat.input_base, Money::from_cents(4000));
    assert_eq!(vat.input_vat, Money::from_cents(840));
    assert_eq!(vat.net_payable, Money::from_cents(1260));

    let invalid = app.api.vat_return(2024, 5).await;
    assert!(matches!(invalid, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn category_breakdown_uses_configured_fallback() {
    let app = TestApp::spawn().await;
    expense_on(&app, Some("2024-05-01"), 2000, 0, "Reiskosten", Owner::Daan).await;
    expense_on(&app, Some("2024-05-02"), 3000, 0, "", Owner::Wim).await;
    expense_on(&app, Some("2024-05-03"), 500, 0, "Reiskosten", Owner::Daan).await;

    let categories = app
        .api
        .category_breakdown(2024)
        .await
        .expect("Failed to get category breakdown");

    assert_eq!(categories.len(), 2);
    assert_eq!(categories[0].category, "Overig");
    assert_eq!(categories[0].total, Money::from_cents(3000));
    assert_eq!(categories[1].category, "Reiskosten");
    assert_eq!(categories[1].total, Money::from_cents(2500));
}

#[tokio::test]
async fn profit_and_loss_and_income_tax_use_amounts_excluding_vat() {
    let app = TestApp::spawn().await;
    let customer = app.seed_customer("Acme B.V.", None).await;
    invoice_on(&app, &customer, "2024-03-01", "10000", "21", Owner::Daan).await;
    invoice_on(&app, &customer, "2024-03-02", "4000", "21", Owner::Both).await;
    expense_on(&app, Some("2024-03-03"), 200000, 42000, "", Owner::Both).await;

    let pnl = app
        .api
        .profit_and_loss(2024)
        .await
        .expect("Failed to compute profit and loss");
    assert_eq!(pnl.revenue, Money::from_cents(1_400_000));
    assert_eq!(pnl.expenses, Money::from_cents(200_000));
    assert_eq!(pnl.profit, Money::from_cents(1_200_000));

    let estimate = app
        .api
        .income_tax_estimate(2024)
        .await
        .expect("Failed to estimate income tax");
    let daan = estimate.for_owner(Owner::Daan).expect("Missing Daan");
    let wim = estimate.for_owner(Owner::Wim).expect("Missing Wim");
    assert_eq!(daan.profit_share, Money::from_cents(1_100_000));
    assert_eq!(wim.profit_share, Money::from_cents(100_000));
    assert_eq!(daan.profit_share + wim.profit_share, pnl.profit);
    assert_eq!(daan.estimated_tax, Money::from_cents(406_670));
    assert_eq!(wim.estimated_tax, Money::from_cents(36_970));
}

#[tokio::test]
async fn loss_carries_no_income_tax() {
    let app = TestApp::spawn().await;
    expense_on(&app, Some("2024-06-01"), 50000, 10500, "", Owner::Wim).await;

    let estimate = app
        .api
        .income_tax_estimate(2024)
        .await
        .expect("Failed to estimate income tax");
    let wim = estimate.for_owner(Owner::Wim).expect("Missing Wim");

    assert_eq!(wim.profit_share, Money::from_cents(-50000));
    assert_eq!(wim.estimated_tax, Money::ZERO);
}

#[tokio::test]
async fn dashboard_summarises_the_year() {
    let app = TestApp::spawn().await;
    let acme = app.seed_customer("Acme B.V.", None).await;
    let globex = app.seed_customer("Globex", None).await;

    invoice_on(&app, &acme, "2024-01-10", "100", "0", Owner::Both).await;
    let sent = invoice_on(&app, &acme, "2024-02-10", "200", "0", Owner::Both).await;
    let paid = invoice_on(&app, &globex, "2024-02-20", "300", "0", Owner::Both).await;
    invoice_on(&app, &globex, "2023-06-01", "999", "0", Owner::Both).await;
    for invoice_id in [sent, paid] {
        app.api
            .transition_invoice(invoice_id, InvoiceStatus::Sent)
            .await
            .expect("Failed to mark invoice sent");
    }
    app.api
        .mark_invoice_paid(paid)
        .await
        .expect("Failed to mark invoice paid");
    expense_on(&app, Some("2024-01-05"), 5000, 0, "Marketing", Owner::Both).await;

    let dashboard = app.api.dashboard(2024).await.expect("Failed to get dashboard");

    assert_eq!(dashboard.total_revenue, Money::from_cents(50000));
    assert_eq!(dashboard.total_paid, Money::from_cents(30000));
    assert_eq!(dashboard.outstanding, Money::from_cents(20000));
    assert_eq!(dashboard.expenses, Money::from_cents(5000));
    assert_eq!(dashboard.profit, Money::from_cents(25000));
    assert_eq!(dashboard.invoice_count, 3);
    assert_eq!(dashboard.customer_count, 2);
    assert_eq!(dashboard.available_years, vec![2024, 2023]);
    assert_eq!(dashboard.monthly.len(), 12);
    assert_eq!(dashboard.categories[0].category, "Marketing");
    assert_eq!(dashboard.recent_invoices.len(), 3);
    assert_eq!(dashboard.recent_expenses.len(), 1);
    let concept = dashboard
        .status_distribution
        .iter()
        .find(|s| s.status == InvoiceStatus::Concept)
        .expect("Missing concept count");
    assert_eq!(concept.count, 1);
}

#[tokio::test]
async fn dashboard_for_empty_year_lists_that_year() {
    let app = TestApp::spawn().await;

    let dashboard = app.api.dashboard(2030).await.expect("Failed to get dashboard");

    assert_eq!(dashboard.available_years, vec![2030]);
    assert!(dashboard.total_revenue.is_zero());
    assert_eq!(dashboard.invoice_count, 0);
}
