//! Behaviour every backend must share. Each case seeds its own family, so
//! the suite can run against a shared database.

#![allow(dead_code)]

use std::time::Duration;

use chrono::Duration as Span;
use famledger_core::testing::{self, date, dec};
use famledger_core::{
    AmountQuery, CategoryType, Family, Invite, InviteStatus, Report, ReportData, ReportPeriod,
    ReportType, Repositories, Role, StoreError, TransactionFilter, TransactionType, User,
    ValidationError, clock,
};
use uuid::Uuid;

/// Expand to one `#[tokio::test]` per contract case. `$setup` yields
/// `Option<Repositories>`; `None` skips the case.
macro_rules! contract_tests {
    ($setup:expr; $($case:ident),+ $(,)?) => {
        $(
            #[tokio::test]
            async fn $case() {
                let Some(repos) = $setup.await else {
                    eprintln!("skipping {}: backend not configured", stringify!($case));
                    return;
                };
                common::$case(&repos).await;
            }
        )+
    };
}

macro_rules! all_contract_tests {
    ($setup:expr) => {
        contract_tests!($setup;
            families_round_trip,
            users_unique_active_email,
            users_soft_delete,
            invites_lifecycle,
            invites_expire_and_purge,
            categories_unique_active_name,
            transactions_filter_and_aggregate,
            transactions_update_and_delete,
            budgets_active_window,
            reports_keep_data,
            family_delete_cascades,
            inputs_validated_before_io,
        );
    };
}

fn unique_email(local: &str) -> String {
    format!("{local}-{}@example.com", Uuid::new_v4().simple())
}

/// Timestamps have microsecond precision; keep creation order observable.
async fn tick() {
    tokio::time::sleep(Duration::from_millis(3)).await;
}

pub async fn seed(repos: &Repositories) -> (Family, User) {
    let mut family = testing::family();
    repos.families.create(&mut family).await.unwrap();
    let mut admin = testing::user(&family, "admin", Role::Admin);
    repos.users.create(&mut admin).await.unwrap();
    (family, admin)
}

// ── Families ───────────────────────────────────────────────────────────────

pub async fn families_round_trip(repos: &Repositories) {
    let mut family = Family::new("  Smith  ", "usd");
    repos.families.create(&mut family).await.unwrap();
    assert_eq!(family.name, "Smith");
    assert_eq!(family.currency, "USD");

    let loaded = repos.families.get_by_id(family.id).await.unwrap();
    assert_eq!(loaded, family);

    family.name = "Smith-Jones".into();
    let before = family.updated_at;
    tick().await;
    repos.families.update(&mut family).await.unwrap();
    assert!(family.updated_at > before);
    assert_eq!(repos.families.get_by_id(family.id).await.unwrap().name, "Smith-Jones");

    assert!(repos.families.get_primary().await.unwrap().is_some());

    let stats = repos.families.get_statistics(family.id).await.unwrap();
    assert_eq!(stats.user_count, 0);
    assert_eq!(stats.balance, dec("0"));

    let mut ghost = testing::family();
    assert!(repos.families.update(&mut ghost).await.unwrap_err().is_not_found());
    assert!(repos.families.get_statistics(ghost.id).await.unwrap_err().is_not_found());
}

// ── Users ──────────────────────────────────────────────────────────────────

pub async fn users_unique_active_email(repos: &Repositories) {
    let (family, admin) = seed(repos).await;

    let mut twin = testing::user(&family, "twin", Role::Member);
    twin.email = admin.email.to_uppercase();
    let err = repos.users.create(&mut twin).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(ref m) if m == "email already in use"), "{err:?}");

    let found = repos.users.get_by_email(&format!(" {} ", admin.email.to_uppercase())).await.unwrap();
    assert_eq!(found.id, admin.id);

    tick().await;
    let mut member = testing::user(&family, "member", Role::Member);
    repos.users.create(&mut member).await.unwrap();
    let listed: Vec<Uuid> = repos
        .users
        .get_by_family(family.id)
        .await
        .unwrap()
        .iter()
        .map(|u| u.id)
        .collect();
    assert_eq!(listed, vec![admin.id, member.id]);

    member.email = admin.email.clone();
    assert!(repos.users.update(&mut member).await.unwrap_err().is_conflict());
}

pub async fn users_soft_delete(repos: &Repositories) {
    let (family, admin) = seed(repos).await;
    let mut child = testing::user(&family, "kid", Role::Child);
    repos.users.create(&mut child).await.unwrap();

    let at = clock::now();
    repos.users.update_last_login(child.id, at).await.unwrap();
    assert_eq!(repos.users.get_by_id(child.id).await.unwrap().last_login, Some(at));

    repos.users.delete(child.id).await.unwrap();
    assert!(repos.users.delete(child.id).await.unwrap_err().is_not_found());
    assert!(repos.users.get_by_email(&child.email).await.unwrap_err().is_not_found());
    let stored = repos.users.get_by_id(child.id).await.unwrap();
    assert!(!stored.is_active);

    let listed = repos.users.get_by_family(family.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, admin.id);

    // The address is free again once the holder is inactive.
    let mut again = testing::user(&family, "kid", Role::Member);
    again.email = child.email.clone();
    repos.users.create(&mut again).await.unwrap();
}

// ── Invites ────────────────────────────────────────────────────────────────

fn invite_for(family: &Family, admin: &User, expires_in: Span) -> Invite {
    Invite::new(
        family.id,
        admin.id,
        unique_email("guest"),
        Role::Member,
        famledger_api::crypto::generate_token().unwrap(),
        clock::now() + expires_in,
    )
}

pub async fn invites_lifecycle(repos: &Repositories) {
    let (family, admin) = seed(repos).await;

    let mut invite = invite_for(&family, &admin, Span::hours(72));
    repos.invites.create(&mut invite).await.unwrap();
    assert_eq!(invite.status, InviteStatus::Pending);

    let mut dup = invite_for(&family, &admin, Span::hours(72));
    dup.token = invite.token.clone();
    let err = repos.invites.create(&mut dup).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(ref m) if m == "invite token already exists"));

    let by_token = repos.invites.get_by_token(&invite.token).await.unwrap();
    assert_eq!(by_token.id, invite.id);
    let pending = repos.invites.get_pending_by_email(&invite.email).await.unwrap();
    assert_eq!(pending.len(), 1);

    let mut guest = testing::user(&family, "guest", Role::Member);
    repos.users.create(&mut guest).await.unwrap();
    let at = clock::now();
    repos.invites.accept(invite.id, guest.id, at).await.unwrap();

    let accepted = repos.invites.get_by_id(invite.id).await.unwrap();
    assert_eq!(accepted.status, InviteStatus::Accepted);
    assert_eq!(accepted.accepted_by, Some(guest.id));
    assert_eq!(accepted.accepted_at, Some(at));
    assert!(repos.invites.get_pending_by_email(&invite.email).await.unwrap().is_empty());

    let err = repos.invites.accept(invite.id, guest.id, at).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(ref m) if m == "invite is already accepted"));
    assert!(repos.invites.revoke(invite.id, at).await.unwrap_err().is_conflict());
    assert!(repos.invites.revoke(Uuid::new_v4(), at).await.unwrap_err().is_not_found());

    tick().await;
    let mut other = invite_for(&family, &admin, Span::hours(1));
    repos.invites.create(&mut other).await.unwrap();
    repos.invites.revoke(other.id, clock::now()).await.unwrap();
    assert_eq!(
        repos.invites.get_by_id(other.id).await.unwrap().status,
        InviteStatus::Revoked
    );

    let listed = repos.invites.get_by_family(family.id).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, other.id);

    repos.invites.delete(other.id).await.unwrap();
    assert!(repos.invites.delete(other.id).await.unwrap_err().is_not_found());
}

pub async fn invites_expire_and_purge(repos: &Repositories) {
    let (family, admin) = seed(repos).await;
    // Settle anything overdue left behind in a shared database.
    repos.invites.mark_expired_bulk(clock::now()).await.unwrap();

    let mut stale = invite_for(&family, &admin, Span::hours(-1));
    repos.invites.create(&mut stale).await.unwrap();
    let mut fresh = invite_for(&family, &admin, Span::hours(24));
    repos.invites.create(&mut fresh).await.unwrap();
    let mut revoked = invite_for(&family, &admin, Span::hours(-2));
    repos.invites.create(&mut revoked).await.unwrap();
    let revoked_at = clock::now();
    repos.invites.revoke(revoked.id, revoked_at).await.unwrap();

    let expired = repos.invites.mark_expired_bulk(clock::now()).await.unwrap();
    assert_eq!(expired, 1);
    assert_eq!(repos.invites.mark_expired_bulk(clock::now()).await.unwrap(), 0);
    assert_eq!(
        repos.invites.get_by_id(stale.id).await.unwrap().status,
        InviteStatus::Expired
    );
    assert_eq!(
        repos.invites.get_by_id(fresh.id).await.unwrap().status,
        InviteStatus::Pending
    );
    let still_revoked = repos.invites.get_by_id(revoked.id).await.unwrap();
    assert_eq!(still_revoked.status, InviteStatus::Revoked);
    assert_eq!(still_revoked.updated_at, revoked_at);

    let err = repos.invites.accept(stale.id, admin.id, clock::now()).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(ref m) if m == "invite is already expired"));

    let purged = repos
        .invites
        .purge_terminal(clock::now() + Span::minutes(1))
        .await
        .unwrap();
    assert!(purged >= 2);
    assert!(repos.invites.get_by_id(stale.id).await.unwrap_err().is_not_found());
    assert!(repos.invites.get_by_id(revoked.id).await.unwrap_err().is_not_found());
    assert!(repos.invites.get_by_id(fresh.id).await.is_ok());
}

// ── Categories ─────────────────────────────────────────────────────────────

pub async fn categories_unique_active_name(repos: &Repositories) {
    let (family, _) = seed(repos).await;

    let mut food = testing::category(&family, "Food", CategoryType::Expense);
    repos.categories.create(&mut food).await.unwrap();
    let mut dup = testing::category(&family, "Food", CategoryType::Expense);
    let err = repos.categories.create(&mut dup).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(ref m) if m == "category already exists"));

    let mut food_income = testing::category(&family, "Food", CategoryType::Income);
    repos.categories.create(&mut food_income).await.unwrap();
    let mut bills = testing::category(&family, "Bills", CategoryType::Expense);
    bills.parent_id = Some(food.id);
    repos.categories.create(&mut bills).await.unwrap();

    let expenses = repos
        .categories
        .get_by_family(family.id, Some(CategoryType::Expense))
        .await
        .unwrap();
    let names: Vec<&str> = expenses.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Bills", "Food"]);
    assert_eq!(expenses[0].parent_id, Some(food.id));
    assert_eq!(repos.categories.get_by_family(family.id, None).await.unwrap().len(), 3);

    repos.categories.delete(food.id).await.unwrap();
    assert!(!repos.categories.get_by_id(food.id).await.unwrap().is_active);
    assert!(repos.categories.delete(food.id).await.unwrap_err().is_not_found());

    // A deactivated name can be reused.
    repos.categories.create(&mut dup).await.unwrap();

    bills.name = "Utilities".into();
    bills.parent_id = None;
    repos.categories.update(&mut bills).await.unwrap();
    let stored = repos.categories.get_by_id(bills.id).await.unwrap();
    assert_eq!(stored.name, "Utilities");
    assert_eq!(stored.parent_id, None);
}

// ── Transactions ───────────────────────────────────────────────────────────

pub async fn transactions_filter_and_aggregate(repos: &Repositories) {
    let (family, admin) = seed(repos).await;
    let mut food = testing::category(&family, "Food", CategoryType::Expense);
    let mut fun = testing::category(&family, "Fun", CategoryType::Expense);
    let mut salary = testing::category(&family, "Salary", CategoryType::Income);
    for c in [&mut food, &mut fun, &mut salary] {
        repos.categories.create(c).await.unwrap();
    }

    let mut groceries = testing::expense(&admin, &food, "100.50", date(2024, 1, 15));
    let mut coffee = testing::expense(&admin, &food, "20.00", date(2024, 1, 20));
    coffee.tags = vec!["coffee".into(), "weekday".into()];
    let mut movie = testing::expense(&admin, &fun, "5.25", date(2024, 1, 10));
    let mut pay = testing::income(&admin, &salary, "1000", date(2024, 1, 1));
    for t in [&mut groceries, &mut coffee, &mut movie, &mut pay] {
        repos.transactions.create(t).await.unwrap();
    }

    let ids = |list: Vec<famledger_core::Transaction>| list.into_iter().map(|t| t.id).collect::<Vec<_>>();

    let all = repos
        .transactions
        .list(family.id, &TransactionFilter::default())
        .await
        .unwrap();
    assert_eq!(all[0].tags, vec!["coffee".to_string(), "weekday".to_string()]);
    assert_eq!(ids(all), vec![coffee.id, groceries.id, movie.id, pay.id]);

    let filter = TransactionFilter {
        transaction_type: Some(TransactionType::Expense),
        start_date: Some(date(2024, 1, 11)),
        end_date: Some(date(2024, 1, 31)),
        ..Default::default()
    };
    let page = repos.transactions.list(family.id, &filter).await.unwrap();
    assert_eq!(ids(page), vec![coffee.id, groceries.id]);

    let filter = TransactionFilter {
        min_amount: Some(dec("10")),
        max_amount: Some(dec("150")),
        ..Default::default()
    };
    let page = repos.transactions.list(family.id, &filter).await.unwrap();
    assert_eq!(ids(page), vec![coffee.id, groceries.id]);

    let filter = TransactionFilter {
        category_id: Some(food.id),
        limit: Some(1),
        offset: Some(1),
        ..Default::default()
    };
    let page = repos.transactions.list(family.id, &filter).await.unwrap();
    assert_eq!(ids(page), vec![groceries.id]);

    let january = AmountQuery::of(TransactionType::Expense).between(date(2024, 1, 1), date(2024, 1, 31));
    assert_eq!(repos.transactions.sum(family.id, &january).await.unwrap(), dec("125.75"));
    let food_only = january.clone().in_category(Some(food.id));
    assert_eq!(repos.transactions.sum(family.id, &food_only).await.unwrap(), dec("120.50"));
    let february = AmountQuery::of(TransactionType::Expense).between(date(2024, 2, 1), date(2024, 2, 29));
    assert_eq!(repos.transactions.sum(family.id, &february).await.unwrap(), dec("0"));

    let totals = repos.transactions.totals_by_category(family.id, &january).await.unwrap();
    assert_eq!(totals.len(), 2);
    assert_eq!((totals[0].category_id, totals[0].total, totals[0].count), (food.id, dec("120.50"), 2));
    assert_eq!((totals[1].category_id, totals[1].total, totals[1].count), (fun.id, dec("5.25"), 1));

    let stats = repos.families.get_statistics(family.id).await.unwrap();
    assert_eq!(stats.user_count, 1);
    assert_eq!(stats.category_count, 3);
    assert_eq!(stats.transaction_count, 4);
    assert_eq!(stats.budget_count, 0);
    assert_eq!(stats.total_income, dec("1000"));
    assert_eq!(stats.total_expenses, dec("125.75"));
    assert_eq!(stats.balance, dec("874.25"));
}

pub async fn transactions_update_and_delete(repos: &Repositories) {
    let (family, admin) = seed(repos).await;
    let mut food = testing::category(&family, "Food", CategoryType::Expense);
    repos.categories.create(&mut food).await.unwrap();

    let mut t = testing::expense(&admin, &food, "10.005", date(2024, 3, 1));
    repos.transactions.create(&mut t).await.unwrap();
    assert_eq!(t.amount, dec("10.01"));

    t.amount = dec("99.99");
    t.description = "  weekly shop ".into();
    repos.transactions.update(&mut t).await.unwrap();
    let stored = repos.transactions.get_by_id(t.id).await.unwrap();
    assert_eq!(stored.amount, dec("99.99"));
    assert_eq!(stored.description, "weekly shop");
    assert!(stored.updated_at >= stored.created_at);

    repos.transactions.delete(t.id).await.unwrap();
    assert!(repos.transactions.get_by_id(t.id).await.unwrap_err().is_not_found());
    assert!(repos.transactions.delete(t.id).await.unwrap_err().is_not_found());
    assert!(repos.transactions.update(&mut t).await.unwrap_err().is_not_found());
}

// ── Budgets ────────────────────────────────────────────────────────────────

pub async fn budgets_active_window(repos: &Repositories) {
    let (family, _) = seed(repos).await;
    let mut food = testing::category(&family, "Food", CategoryType::Expense);
    repos.categories.create(&mut food).await.unwrap();

    let mut monthly = testing::monthly_budget(&family, Some(&food), "500");
    repos.budgets.create(&mut monthly).await.unwrap();
    let mut yearly = testing::monthly_budget(&family, None, "6000");
    yearly.name = "Yearly".into();
    yearly.period = famledger_core::BudgetPeriod::Yearly;
    yearly.end_date = date(2024, 12, 31);
    repos.budgets.create(&mut yearly).await.unwrap();

    let names = |list: Vec<famledger_core::Budget>| list.into_iter().map(|b| b.name).collect::<Vec<_>>();
    assert_eq!(names(repos.budgets.get_active(family.id, date(2024, 1, 31)).await.unwrap()), vec!["Monthly", "Yearly"]);
    assert_eq!(names(repos.budgets.get_active(family.id, date(2024, 2, 1)).await.unwrap()), vec!["Yearly"]);
    assert_eq!(names(repos.budgets.get_by_family(family.id).await.unwrap()), vec!["Monthly", "Yearly"]);

    let stored = repos.budgets.get_by_id(monthly.id).await.unwrap();
    assert_eq!(stored.category_id, Some(food.id));
    assert_eq!(stored.amount, dec("500"));

    yearly.is_active = false;
    repos.budgets.update(&mut yearly).await.unwrap();
    assert!(repos.budgets.get_active(family.id, date(2024, 6, 1)).await.unwrap().is_empty());

    repos.budgets.delete(monthly.id).await.unwrap();
    assert!(repos.budgets.get_by_id(monthly.id).await.unwrap_err().is_not_found());
    assert_eq!(repos.families.get_statistics(family.id).await.unwrap().budget_count, 1);
}

// ── Reports ────────────────────────────────────────────────────────────────

fn report(family: &Family, user: &User, name: &str, data: ReportData) -> Report {
    Report {
        id: Uuid::new_v4(),
        family_id: family.id,
        user_id: user.id,
        name: name.into(),
        report_type: ReportType::CategoryBreakdown,
        period: ReportPeriod::Monthly,
        start_date: date(2024, 1, 1),
        end_date: date(2024, 1, 31),
        data,
        generated_at: clock::now(),
    }
}

pub async fn reports_keep_data(repos: &Repositories) {
    let (family, admin) = seed(repos).await;
    let data = ReportData {
        total_income: dec("1000.00"),
        total_expenses: dec("100.50"),
        net_income: dec("899.50"),
        category_breakdown: vec![famledger_core::CategoryBreakdownItem {
            category_id: Uuid::new_v4(),
            category_name: "Food".into(),
            amount: dec("100.50"),
            count: 1,
            percentage: dec("100.00"),
        }],
        budget_comparison: vec![famledger_core::BudgetComparisonItem {
            budget_id: Uuid::new_v4(),
            budget_name: "Monthly".into(),
            planned: dec("500.00"),
            actual: dec("100.50"),
            variance: dec("399.50"),
        }],
    };

    let mut first = report(&family, &admin, "January", data.clone());
    repos.reports.create(&mut first).await.unwrap();
    tick().await;
    let mut second = report(&family, &admin, "January again", ReportData::default());
    repos.reports.create(&mut second).await.unwrap();

    let stored = repos.reports.get_by_id(first.id).await.unwrap();
    assert_eq!(stored.data, data);
    assert_eq!(stored.report_type, ReportType::CategoryBreakdown);

    let listed: Vec<Uuid> = repos
        .reports
        .get_by_family(family.id)
        .await
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(listed, vec![second.id, first.id]);

    repos.reports.delete(first.id).await.unwrap();
    assert!(repos.reports.delete(first.id).await.unwrap_err().is_not_found());
}

// ── Cascades and validation ────────────────────────────────────────────────

pub async fn family_delete_cascades(repos: &Repositories) {
    let (family, admin) = seed(repos).await;
    let mut food = testing::category(&family, "Food", CategoryType::Expense);
    repos.categories.create(&mut food).await.unwrap();
    let mut t = testing::expense(&admin, &food, "12.00", date(2024, 1, 2));
    repos.transactions.create(&mut t).await.unwrap();
    let mut budget = testing::monthly_budget(&family, Some(&food), "100");
    repos.budgets.create(&mut budget).await.unwrap();
    let mut invite = invite_for(&family, &admin, Span::hours(24));
    repos.invites.create(&mut invite).await.unwrap();
    let mut summary = report(&family, &admin, "January", ReportData::default());
    repos.reports.create(&mut summary).await.unwrap();

    repos.families.delete(family.id).await.unwrap();
    assert!(repos.families.get_by_id(family.id).await.unwrap_err().is_not_found());
    assert!(repos.users.get_by_id(admin.id).await.unwrap_err().is_not_found());
    assert!(repos.categories.get_by_id(food.id).await.unwrap_err().is_not_found());
    assert!(repos.transactions.get_by_id(t.id).await.unwrap_err().is_not_found());
    assert!(repos.budgets.get_by_id(budget.id).await.unwrap_err().is_not_found());
    assert!(repos.invites.get_by_id(invite.id).await.unwrap_err().is_not_found());
    assert!(repos.invites.get_by_token(&invite.token).await.unwrap_err().is_not_found());
    assert!(repos.reports.get_by_id(summary.id).await.unwrap_err().is_not_found());
    assert!(repos.reports.get_by_family(family.id).await.unwrap().is_empty());
    assert!(repos.families.delete(family.id).await.unwrap_err().is_not_found());
}

pub async fn inputs_validated_before_io(repos: &Repositories) {
    let (family, admin) = seed(repos).await;
    let validation = |e: StoreError| matches!(e, StoreError::Validation(_));

    assert!(validation(repos.families.get_by_id(Uuid::nil()).await.unwrap_err()));
    assert!(validation(repos.users.get_by_email("not-an-email").await.unwrap_err()));
    assert!(validation(repos.invites.get_by_token("  ").await.unwrap_err()));

    let mut food = testing::category(&family, "Food", CategoryType::Expense);
    repos.categories.create(&mut food).await.unwrap();
    let mut t = testing::expense(&admin, &food, "0", date(2024, 1, 1));
    let err = repos.transactions.create(&mut t).await.unwrap_err();
    assert!(matches!(err, StoreError::Validation(ValidationError::OutOfRange { field: "amount", .. })));

    let inverted = TransactionFilter {
        start_date: Some(date(2024, 2, 1)),
        end_date: Some(date(2024, 1, 1)),
        ..Default::default()
    };
    assert!(validation(repos.transactions.list(family.id, &inverted).await.unwrap_err()));

    let mut bad = Family::new("Smith", "XXX");
    assert!(validation(repos.families.create(&mut bad).await.unwrap_err()));
}
