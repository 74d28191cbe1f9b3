//! Report generation: aggregates a date range into [`ReportData`] and
//! stores the result.

use std::collections::HashMap;

use rust_decimal::Decimal;
use uuid::Uuid;

use famledger_core::{
    AmountQuery, BudgetComparisonItem, CategoryBreakdownItem, CategoryTotal, Report, ReportData,
    ReportPeriod, ReportType, TransactionType, clock, validate,
};

use super::{Caller, Repositories, owned, parse_date, parse_enum};
use crate::{GenerateReportRequest, ServiceError};

/// Share of `part` in `whole`, in percent with two decimals.
pub fn percentage(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        Decimal::ZERO
    } else {
        (part / whole * Decimal::ONE_HUNDRED).round_dp(2)
    }
}

/// Turn per-category totals into breakdown rows, largest first. Categories
/// missing from `names` are reported as "Unknown".
pub fn breakdown(
    totals: &[CategoryTotal],
    names: &HashMap<Uuid, String>,
) -> Vec<CategoryBreakdownItem> {
    let whole: Decimal = totals.iter().map(|t| t.total).sum();
    let mut items: Vec<_> = totals
        .iter()
        .map(|t| CategoryBreakdownItem {
            category_id: t.category_id,
            category_name: names
                .get(&t.category_id)
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string()),
            amount: t.total,
            count: t.count,
            percentage: percentage(t.total, whole),
        })
        .collect();
    items.sort_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then_with(|| a.category_name.cmp(&b.category_name))
    });
    items
}

pub async fn list_reports(repos: &Repositories, caller: &Caller) -> Result<Vec<Report>, ServiceError> {
    Ok(repos.reports.get_by_family(caller.family_id).await?)
}

pub async fn get_report(repos: &Repositories, caller: &Caller, id: Uuid) -> Result<Report, ServiceError> {
    let report = repos.reports.get_by_id(id).await?;
    owned(caller, report.family_id, report, "report")
}

pub async fn delete_report(repos: &Repositories, caller: &Caller, id: Uuid) -> Result<(), ServiceError> {
    caller.require_manager()?;
    get_report(repos, caller, id).await?;
    repos.reports.delete(id).await?;
    Ok(())
}

async fn category_names(
    repos: &Repositories,
    caller: &Caller,
    totals: &[&[CategoryTotal]],
) -> Result<HashMap<Uuid, String>, ServiceError> {
    let mut names: HashMap<Uuid, String> = repos
        .categories
        .get_by_family(caller.family_id, None)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();
    // Deactivated categories still carry history.
    for total in totals.iter().flat_map(|t| t.iter()) {
        if names.contains_key(&total.category_id) {
            continue;
        }
        match repos.categories.get_by_id(total.category_id).await {
            Ok(c) => {
                names.insert(c.id, c.name);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(names)
}

async fn budget_comparison(
    repos: &Repositories,
    caller: &Caller,
    report: &Report,
) -> Result<Vec<BudgetComparisonItem>, ServiceError> {
    let mut items = Vec::new();
    for budget in repos.budgets.get_by_family(caller.family_id).await? {
        if !budget.is_active
            || budget.end_date < report.start_date
            || budget.start_date > report.end_date
        {
            continue;
        }
        let query = AmountQuery::of(TransactionType::Expense)
            .between(
                budget.start_date.max(report.start_date),
                budget.end_date.min(report.end_date),
            )
            .in_category(budget.category_id);
        let actual = repos.transactions.sum(caller.family_id, &query).await?;
        items.push(BudgetComparisonItem {
            budget_id: budget.id,
            budget_name: budget.name,
            planned: budget.amount,
            actual,
            variance: budget.amount - actual,
        });
    }
    Ok(items)
}

/// Aggregate the requested range and persist the report.
pub async fn generate_report(
    repos: &Repositories,
    caller: &Caller,
    req: GenerateReportRequest,
) -> Result<Report, ServiceError> {
    caller.require_manager()?;
    let report_type: ReportType = parse_enum(&req.report_type)?;
    let period: ReportPeriod = parse_enum(&req.period)?;
    let start_date = parse_date(&req.start_date)?;
    let end_date = parse_date(&req.end_date)?;
    validate::validate_date_range(start_date, end_date)?;

    let income = AmountQuery::of(TransactionType::Income).between(start_date, end_date);
    let expenses = AmountQuery::of(TransactionType::Expense).between(start_date, end_date);
    let total_income = repos.transactions.sum(caller.family_id, &income).await?;
    let total_expenses = repos.transactions.sum(caller.family_id, &expenses).await?;

    let income_totals = match report_type {
        ReportType::Income | ReportType::CategoryBreakdown => {
            repos
                .transactions
                .totals_by_category(caller.family_id, &income)
                .await?
        }
        _ => Vec::new(),
    };
    let expense_totals = match report_type {
        ReportType::Expenses | ReportType::Budget | ReportType::CategoryBreakdown => {
            repos
                .transactions
                .totals_by_category(caller.family_id, &expenses)
                .await?
        }
        _ => Vec::new(),
    };
    let names = category_names(repos, caller, &[income_totals.as_slice(), expense_totals.as_slice()]).await?;
    let mut category_breakdown = breakdown(&expense_totals, &names);
    category_breakdown.extend(breakdown(&income_totals, &names));

    let mut report = Report {
        id: Uuid::new_v4(),
        family_id: caller.family_id,
        user_id: caller.user_id,
        name: req.name,
        report_type,
        period,
        start_date,
        end_date,
        data: ReportData {
            total_income,
            total_expenses,
            net_income: total_income - total_expenses,
            category_breakdown,
            budget_comparison: Vec::new(),
        },
        generated_at: clock::now(),
    };
    if matches!(report_type, ReportType::Budget | ReportType::CashFlow) {
        report.data.budget_comparison = budget_comparison(repos, caller, &report).await?;
    }

    repos.reports.create(&mut report).await?;
    tracing::info!(report_id = %report.id, report_type = %report_type, "report generated");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use famledger_core::testing::dec;

    fn total(id: Uuid, amount: &str, count: u64) -> CategoryTotal {
        CategoryTotal {
            category_id: id,
            total: dec(amount),
            count,
        }
    }

    #[test]
    fn percentages_round_to_cents() {
        assert_eq!(percentage(dec("1"), dec("3")), dec("33.33"));
        assert_eq!(percentage(dec("2"), dec("3")), dec("66.67"));
        assert_eq!(percentage(dec("5"), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn breakdown_names_and_orders_categories() {
        let food = Uuid::new_v4();
        let rent = Uuid::new_v4();
        let gone = Uuid::new_v4();
        let names = HashMap::from([(food, "Food".to_string()), (rent, "Rent".to_string())]);
        let items = breakdown(
            &[
                total(food, "250", 5),
                total(rent, "700", 1),
                total(gone, "50", 2),
            ],
            &names,
        );
        let summary: Vec<_> = items
            .iter()
            .map(|i| (i.category_name.as_str(), i.percentage))
            .collect();
        assert_eq!(
            summary,
            vec![("Rent", dec("70")), ("Food", dec("25")), ("Unknown", dec("5"))]
        );
        assert_eq!(items[1].count, 5);
    }

    #[test]
    fn empty_breakdown() {
        assert!(breakdown(&[], &HashMap::new()).is_empty());
    }
}
