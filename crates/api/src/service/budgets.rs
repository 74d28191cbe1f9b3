//! Budgets and their spending summaries.

use rust_decimal::Decimal;
use uuid::Uuid;

use famledger_core::{AmountQuery, Budget, CategoryType, TransactionType, clock};

use super::{Caller, Repositories, owned, parse_date, parse_enum, parse_id};
use crate::{BudgetSummary, CreateBudgetRequest, ServiceError, UpdateBudgetRequest};

/// Derive the summary figures for `budget` given what was spent against it.
pub fn summarize(budget: Budget, spent: Decimal) -> BudgetSummary {
    let remaining = budget.amount - spent;
    let percent_used = if budget.amount.is_zero() {
        Decimal::ZERO
    } else {
        (spent / budget.amount * Decimal::ONE_HUNDRED).round_dp(2)
    };
    BudgetSummary {
        is_over_budget: spent > budget.amount,
        budget,
        spent,
        remaining,
        percent_used,
    }
}

pub async fn list_budgets(
    repos: &Repositories,
    caller: &Caller,
    active_on: Option<&str>,
) -> Result<Vec<Budget>, ServiceError> {
    match active_on.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Ok(repos
            .budgets
            .get_active(caller.family_id, parse_date(raw)?)
            .await?),
        None => Ok(repos.budgets.get_by_family(caller.family_id).await?),
    }
}

pub async fn get_budget(repos: &Repositories, caller: &Caller, id: Uuid) -> Result<Budget, ServiceError> {
    let budget = repos.budgets.get_by_id(id).await?;
    owned(caller, budget.family_id, budget, "budget")
}

/// Budgets only track expense categories of the caller's family.
async fn check_category(
    repos: &Repositories,
    caller: &Caller,
    category_id: Uuid,
) -> Result<(), ServiceError> {
    match repos.categories.get_by_id(category_id).await {
        Ok(c) if c.family_id == caller.family_id => {
            if c.category_type == CategoryType::Expense {
                Ok(())
            } else {
                Err(ServiceError::BadRequest(
                    "budgets can only track expense categories".into(),
                ))
            }
        }
        Ok(_) => Err(ServiceError::BadRequest("unknown category".into())),
        Err(e) if e.is_not_found() => Err(ServiceError::BadRequest("unknown category".into())),
        Err(e) => Err(e.into()),
    }
}

pub async fn create_budget(
    repos: &Repositories,
    caller: &Caller,
    req: CreateBudgetRequest,
) -> Result<Budget, ServiceError> {
    caller.require_manager()?;
    let mut budget = Budget::new(
        caller.family_id,
        req.name,
        req.amount,
        parse_enum(&req.period)?,
        parse_date(&req.start_date)?,
        parse_date(&req.end_date)?,
    );
    if let Some(raw) = req.category_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let category_id = parse_id("category id", raw)?;
        check_category(repos, caller, category_id).await?;
        budget.category_id = Some(category_id);
    }
    repos.budgets.create(&mut budget).await?;
    Ok(budget)
}

/// An empty `category_id` widens the budget to every expense category.
pub async fn update_budget(
    repos: &Repositories,
    caller: &Caller,
    id: Uuid,
    req: UpdateBudgetRequest,
) -> Result<Budget, ServiceError> {
    caller.require_manager()?;
    let mut budget = get_budget(repos, caller, id).await?;
    if let Some(name) = req.name {
        budget.name = name;
    }
    match req.category_id.as_deref().map(str::trim) {
        None => {}
        Some("") => budget.category_id = None,
        Some(raw) => {
            let category_id = parse_id("category id", raw)?;
            check_category(repos, caller, category_id).await?;
            budget.category_id = Some(category_id);
        }
    }
    if let Some(amount) = req.amount {
        budget.amount = amount;
    }
    if let Some(period) = req.period {
        budget.period = parse_enum(&period)?;
    }
    if let Some(start) = req.start_date {
        budget.start_date = parse_date(&start)?;
    }
    if let Some(end) = req.end_date {
        budget.end_date = parse_date(&end)?;
    }
    if let Some(active) = req.is_active {
        budget.is_active = active;
    }
    budget.updated_at = clock::now();
    repos.budgets.update(&mut budget).await?;
    Ok(budget)
}

pub async fn delete_budget(repos: &Repositories, caller: &Caller, id: Uuid) -> Result<(), ServiceError> {
    caller.require_manager()?;
    get_budget(repos, caller, id).await?;
    repos.budgets.delete(id).await?;
    Ok(())
}

/// Expense spending inside the budget's date range, restricted to its
/// category when it has one.
pub async fn spent(repos: &Repositories, budget: &Budget) -> Result<Decimal, ServiceError> {
    let query = AmountQuery::of(TransactionType::Expense)
        .between(budget.start_date, budget.end_date)
        .in_category(budget.category_id);
    Ok(repos.transactions.sum(budget.family_id, &query).await?)
}

pub async fn budget_summary(
    repos: &Repositories,
    caller: &Caller,
    id: Uuid,
) -> Result<BudgetSummary, ServiceError> {
    let budget = get_budget(repos, caller, id).await?;
    let spent = spent(repos, &budget).await?;
    Ok(summarize(budget, spent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use famledger_core::testing::{self, dec};

    #[test]
    fn under_budget() {
        let family = testing::family();
        let summary = summarize(testing::monthly_budget(&family, None, "500"), dec("100.50"));
        assert_eq!(summary.remaining, dec("399.50"));
        assert_eq!(summary.percent_used, dec("20.10"));
        assert!(!summary.is_over_budget);
    }

    #[test]
    fn over_budget() {
        let family = testing::family();
        let summary = summarize(testing::monthly_budget(&family, None, "200"), dec("250"));
        assert_eq!(summary.remaining, dec("-50"));
        assert_eq!(summary.percent_used, dec("125"));
        assert!(summary.is_over_budget);
    }

    #[test]
    fn exactly_spent_is_not_over() {
        let family = testing::family();
        let summary = summarize(testing::monthly_budget(&family, None, "80"), dec("80"));
        assert!(summary.remaining.is_zero());
        assert!(!summary.is_over_budget);
    }
}
