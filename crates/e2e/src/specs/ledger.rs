use anyhow::{Result, ensure};
use rust_decimal::Decimal;

use famledger_api::{
    Budget, BudgetSummary, Category, CreateBudgetRequest, ListTransactionsResponse, Transaction,
};

use crate::client::{TestContext, json_with_status};
use crate::fixtures;

async fn create_category(ctx: &TestContext, token: &str, name: &str, kind: &str) -> Result<Category> {
    let resp = ctx
        .post_json_authed("/categories", token, &fixtures::category(name, kind))
        .await?;
    json_with_status(resp, 201).await
}

/// Food expense of 100.50 against a 500 monthly budget.
pub async fn record_and_summarize_budget(ctx: &TestContext) -> Result<()> {
    let family = ctx.register_family().await?;
    let token = &family.admin.access_token;
    let food = create_category(ctx, token, "Food", "expense").await?;

    let resp = ctx
        .post_json_authed(
            "/transactions",
            token,
            &fixtures::expense(food.id, "100.50", "2024-01-15"),
        )
        .await?;
    let tx: Transaction = json_with_status(resp, 201).await?;
    ensure!(tx.amount == Decimal::new(10050, 2), "amount was {}", tx.amount);

    let resp = ctx
        .post_json_authed(
            "/budgets",
            token,
            &CreateBudgetRequest {
                name: "Groceries".into(),
                category_id: Some(food.id.to_string()),
                amount: Decimal::from(500),
                period: "monthly".into(),
                start_date: "2024-01-01".into(),
                end_date: "2024-01-31".into(),
            },
        )
        .await?;
    let budget: Budget = json_with_status(resp, 201).await?;

    let resp = ctx
        .get_authed(&format!("/budgets/{}/summary", budget.id), token)
        .await?;
    let summary: BudgetSummary = json_with_status(resp, 200).await?;
    ensure!(summary.spent == Decimal::new(10050, 2), "spent was {}", summary.spent);
    ensure!(summary.remaining == Decimal::new(39950, 2));
    ensure!(!summary.is_over_budget);
    Ok(())
}

/// Type, date and amount filters narrow the listing.
pub async fn transaction_filters(ctx: &TestContext) -> Result<()> {
    let family = ctx.register_family().await?;
    let token = &family.admin.access_token;
    let food = create_category(ctx, token, "Food", "expense").await?;
    let salary = create_category(ctx, token, "Salary", "income").await?;

    for req in [
        fixtures::expense(food.id, "10", "2024-01-05"),
        fixtures::expense(food.id, "250", "2024-01-20"),
        fixtures::expense(food.id, "40", "2024-02-03"),
        fixtures::income(salary.id, "3000", "2024-01-31"),
    ] {
        let resp = ctx.post_json_authed("/transactions", token, &req).await?;
        ensure!(resp.status() == 201, "expected 201, got {}", resp.status());
    }

    let resp = ctx
        .get_authed(
            "/transactions?type=expense&start_date=2024-01-01&end_date=2024-01-31",
            token,
        )
        .await?;
    let january: ListTransactionsResponse = json_with_status(resp, 200).await?;
    ensure!(january.transactions.len() == 2, "got {}", january.transactions.len());
    ensure!(
        january.transactions[0].date > january.transactions[1].date,
        "expected newest first"
    );

    let resp = ctx
        .get_authed("/transactions?min_amount=100&max_amount=1000", token)
        .await?;
    let large: ListTransactionsResponse = json_with_status(resp, 200).await?;
    ensure!(large.transactions.len() == 1);
    ensure!(large.transactions[0].amount == Decimal::from(250));

    let resp = ctx.get_authed("/transactions?limit=1&offset=1", token).await?;
    let page: ListTransactionsResponse = json_with_status(resp, 200).await?;
    ensure!(page.transactions.len() == 1 && page.limit == 1 && page.offset == 1);

    let resp = ctx
        .get_authed("/transactions?start_date=2024-02-01&end_date=2024-01-01", token)
        .await?;
    ensure!(resp.status() == 400, "expected 400, got {}", resp.status());
    Ok(())
}

/// Booking income against an expense category → 400.
pub async fn category_type_mismatch_rejected(ctx: &TestContext) -> Result<()> {
    let family = ctx.register_family().await?;
    let token = &family.admin.access_token;
    let food = create_category(ctx, token, "Food", "expense").await?;
    let resp = ctx
        .post_json_authed(
            "/transactions",
            token,
            &fixtures::income(food.id, "5", "2024-01-01"),
        )
        .await?;
    ensure!(resp.status() == 400, "expected 400, got {}", resp.status());

    let resp = ctx
        .post_json_authed(
            "/transactions",
            token,
            &fixtures::expense(food.id, "-5", "2024-01-01"),
        )
        .await?;
    ensure!(resp.status() == 400, "expected 400, got {}", resp.status());
    Ok(())
}

/// Entities of another family look missing.
pub async fn other_family_not_found(ctx: &TestContext) -> Result<()> {
    let smith = ctx.register_family().await?;
    let jones = ctx.register_family().await?;
    let food = create_category(ctx, &smith.admin.access_token, "Food", "expense").await?;

    let resp = ctx
        .get_authed(&format!("/categories/{}", food.id), &jones.admin.access_token)
        .await?;
    ensure!(resp.status() == 404, "expected 404, got {}", resp.status());

    let resp = ctx
        .delete_authed(&format!("/categories/{}", food.id), &jones.admin.access_token)
        .await?;
    ensure!(resp.status() == 404, "expected 404, got {}", resp.status());

    let resp = ctx
        .get_authed(&format!("/users/{}", smith.admin.user_id), &jones.admin.access_token)
        .await?;
    ensure!(resp.status() == 404, "expected 404, got {}", resp.status());
    Ok(())
}
