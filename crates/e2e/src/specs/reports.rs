use anyhow::{Result, ensure};
use rust_decimal::Decimal;

use famledger_api::{Category, GenerateReportRequest, ListReportsResponse, Report};

use crate::client::{TestContext, json_with_status};
use crate::fixtures;

/// A category breakdown over a month with income and expenses.
pub async fn generate_breakdown_report(ctx: &TestContext) -> Result<()> {
    let family = ctx.register_family().await?;
    let token = &family.admin.access_token;

    let resp = ctx
        .post_json_authed("/categories", token, &fixtures::category("Rent", "expense"))
        .await?;
    let rent: Category = json_with_status(resp, 201).await?;
    let resp = ctx
        .post_json_authed("/categories", token, &fixtures::category("Salary", "income"))
        .await?;
    let salary: Category = json_with_status(resp, 201).await?;

    for req in [
        fixtures::expense(rent.id, "1200", "2024-05-01"),
        fixtures::income(salary.id, "4000", "2024-05-25"),
        fixtures::expense(rent.id, "1200", "2024-06-01"),
    ] {
        let resp = ctx.post_json_authed("/transactions", token, &req).await?;
        ensure!(resp.status() == 201, "expected 201, got {}", resp.status());
    }

    let resp = ctx
        .post_json_authed(
            "/reports",
            token,
            &GenerateReportRequest {
                name: "May".into(),
                report_type: "category_breakdown".into(),
                period: "monthly".into(),
                start_date: "2024-05-01".into(),
                end_date: "2024-05-31".into(),
            },
        )
        .await?;
    let report: Report = json_with_status(resp, 201).await?;
    ensure!(report.data.total_expenses == Decimal::from(1200));
    ensure!(report.data.total_income == Decimal::from(4000));
    ensure!(report.data.net_income == Decimal::from(2800));
    ensure!(report.data.category_breakdown.len() == 2);

    let resp = ctx.get_authed(&format!("/reports/{}", report.id), token).await?;
    let stored: Report = json_with_status(resp, 200).await?;
    ensure!(stored.data == report.data, "stored data differs");

    let resp = ctx.get_authed("/reports", token).await?;
    let listed: ListReportsResponse = json_with_status(resp, 200).await?;
    ensure!(listed.reports.len() == 1);

    let resp = ctx.delete_authed(&format!("/reports/{}", report.id), token).await?;
    ensure!(resp.status() == 200, "expected 200, got {}", resp.status());
    Ok(())
}
