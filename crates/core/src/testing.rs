//! Fixtures shared by unit and backend contract tests.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use crate::model::{
    Budget, BudgetPeriod, Category, CategoryType, Family, Role, Transaction, TransactionType, User,
};

/// Parse a decimal literal.
pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).expect("valid decimal literal")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid calendar date")
}

/// The Smith family, keeping books in USD.
pub fn family() -> Family {
    Family::new("Smith", "USD")
}

/// A user of `family` with a unique email derived from `local`.
pub fn user(family: &Family, local: &str, role: Role) -> User {
    let suffix = &Uuid::new_v4().simple().to_string()[..8];
    User::new(
        family.id,
        format!("{local}-{suffix}@example.com"),
        "pbkdf2$test-hash",
        "Test",
        local,
        role,
    )
}

pub fn category(family: &Family, name: &str, category_type: CategoryType) -> Category {
    Category::new(family.id, name, category_type)
}

pub fn expense(user: &User, category: &Category, amount: &str, on: NaiveDate) -> Transaction {
    Transaction::new(
        user.family_id,
        user.id,
        category.id,
        dec(amount),
        TransactionType::Expense,
        on,
    )
}

pub fn income(user: &User, category: &Category, amount: &str, on: NaiveDate) -> Transaction {
    Transaction::new(
        user.family_id,
        user.id,
        category.id,
        dec(amount),
        TransactionType::Income,
        on,
    )
}

/// A January 2024 monthly budget.
pub fn monthly_budget(family: &Family, category: Option<&Category>, amount: &str) -> Budget {
    let mut budget = Budget::new(
        family.id,
        "Monthly",
        dec(amount),
        BudgetPeriod::Monthly,
        date(2024, 1, 1),
        date(2024, 1, 31),
    );
    budget.category_id = category.map(|c| c.id);
    budget
}
