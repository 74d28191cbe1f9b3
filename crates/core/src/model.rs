//! Entity types owned by a family.
//!
//! Each entity knows how to sanitize itself ([`Family::sanitize`] and
//! friends). Every backend calls these before a write so the three stores
//! accept and reject exactly the same input.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validate::{self, MAX_BUDGET_NAME_LEN, MAX_CATEGORY_NAME_LEN, MAX_FAMILY_NAME_LEN};
use crate::{ValidationError, clock};

// ─── Enumerations ───────────────────────────────────────────────────────────

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident as $field:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            /// Case-insensitive; surrounding whitespace is ignored.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let folded = s.trim().to_lowercase();
                match folded.as_str() {
                    $($text => Ok(Self::$variant),)+
                    "" => Err(ValidationError::Empty { field: $field }),
                    _ => Err(ValidationError::unsupported($field, s.trim())),
                }
            }
        }
    };
}

string_enum! {
    /// Role of a user within their family. Drives coarse access checks.
    Role as "role" {
        Admin => "admin",
        Member => "member",
        Child => "child",
    }
}

string_enum! {
    /// Lifecycle state of an invite. Everything but `Pending` is terminal.
    InviteStatus as "status" {
        Pending => "pending",
        Accepted => "accepted",
        Expired => "expired",
        Revoked => "revoked",
    }
}

string_enum! {
    CategoryType as "category type" {
        Income => "income",
        Expense => "expense",
    }
}

string_enum! {
    TransactionType as "transaction type" {
        Income => "income",
        Expense => "expense",
    }
}

string_enum! {
    BudgetPeriod as "budget period" {
        Weekly => "weekly",
        Monthly => "monthly",
        Yearly => "yearly",
        Custom => "custom",
    }
}

string_enum! {
    ReportType as "report type" {
        Expenses => "expenses",
        Income => "income",
        Budget => "budget",
        CashFlow => "cash_flow",
        CategoryBreakdown => "category_breakdown",
    }
}

string_enum! {
    ReportPeriod as "report period" {
        Daily => "daily",
        Weekly => "weekly",
        Monthly => "monthly",
        Yearly => "yearly",
        Custom => "custom",
    }
}

impl InviteStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl From<TransactionType> for CategoryType {
    fn from(t: TransactionType) -> Self {
        match t {
            TransactionType::Income => Self::Income,
            TransactionType::Expense => Self::Expense,
        }
    }
}

// ─── Family ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Family {
    pub id: Uuid,
    pub name: String,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Family {
    pub fn new(name: impl Into<String>, currency: impl Into<String>) -> Self {
        let now = clock::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            currency: currency.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn sanitize(&mut self) -> Result<(), ValidationError> {
        validate::validate_id("family id", self.id)?;
        self.name = validate::validate_name("family name", &self.name, MAX_FAMILY_NAME_LEN)?;
        self.currency = validate::validate_currency(&self.currency)?;
        Ok(())
    }
}

/// Aggregate counters over everything a family owns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FamilyStatistics {
    pub user_count: u64,
    pub category_count: u64,
    pub transaction_count: u64,
    pub budget_count: u64,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub balance: Decimal,
}

// ─── User ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub family_id: Uuid,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        family_id: Uuid,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        role: Role,
    ) -> Self {
        let now = clock::now();
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            password_hash: password_hash.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            role,
            family_id,
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn sanitize(&mut self) -> Result<(), ValidationError> {
        use validate::MAX_PERSON_NAME_LEN;

        validate::validate_id("user id", self.id)?;
        validate::validate_id("family id", self.family_id)?;
        self.email = validate::validate_email(&self.email)?;
        self.first_name = validate::validate_name("first name", &self.first_name, MAX_PERSON_NAME_LEN)?;
        self.last_name = validate::validate_name("last name", &self.last_name, MAX_PERSON_NAME_LEN)?;
        if self.password_hash.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "password hash",
            });
        }
        self.last_login = self.last_login.map(clock::normalize);
        Ok(())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// ─── Invite ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invite {
    pub id: Uuid,
    pub family_id: Uuid,
    pub created_by: Uuid,
    pub email: String,
    pub role: Role,
    pub token: String,
    pub status: InviteStatus,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub accepted_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invite {
    pub fn new(
        family_id: Uuid,
        created_by: Uuid,
        email: impl Into<String>,
        role: Role,
        token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let now = clock::now();
        Self {
            id: Uuid::new_v4(),
            family_id,
            created_by,
            email: email.into(),
            role,
            token: token.into(),
            status: InviteStatus::Pending,
            expires_at: clock::normalize(expires_at),
            accepted_at: None,
            accepted_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn sanitize(&mut self) -> Result<(), ValidationError> {
        validate::validate_id("invite id", self.id)?;
        validate::validate_id("family id", self.family_id)?;
        validate::validate_id("created by", self.created_by)?;
        self.email = validate::validate_email(&self.email)?;
        let token = self.token.trim();
        if token.is_empty() {
            return Err(ValidationError::Empty { field: "token" });
        }
        if token.len() > 128 || !token.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::malformed("token", "expected up to 128 alphanumerics"));
        }
        self.token = token.to_string();
        self.expires_at = clock::normalize(self.expires_at);
        Ok(())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

// ─── Category ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub family_id: Uuid,
    pub name: String,
    pub category_type: CategoryType,
    pub color: String,
    pub icon: String,
    pub parent_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new(family_id: Uuid, name: impl Into<String>, category_type: CategoryType) -> Self {
        let now = clock::now();
        Self {
            id: Uuid::new_v4(),
            family_id,
            name: name.into(),
            category_type,
            color: "#607D8B".to_string(),
            icon: "tag".to_string(),
            parent_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn sanitize(&mut self) -> Result<(), ValidationError> {
        validate::validate_id("category id", self.id)?;
        validate::validate_id("family id", self.family_id)?;
        self.name = validate::validate_name("category name", &self.name, MAX_CATEGORY_NAME_LEN)?;
        self.color = validate::validate_color(&self.color)?;
        self.icon = validate::validate_name("icon", &self.icon, validate::MAX_ICON_LEN)?;
        if let Some(parent) = self.parent_id {
            validate::validate_id("parent id", parent)?;
            if parent == self.id {
                return Err(ValidationError::malformed(
                    "parent id",
                    "a category cannot be its own parent",
                ));
            }
        }
        Ok(())
    }
}

// ─── Transaction ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub family_id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    pub description: String,
    pub date: NaiveDate,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        family_id: Uuid,
        user_id: Uuid,
        category_id: Uuid,
        amount: Decimal,
        transaction_type: TransactionType,
        date: NaiveDate,
    ) -> Self {
        let now = clock::now();
        Self {
            id: Uuid::new_v4(),
            family_id,
            user_id,
            category_id,
            amount,
            transaction_type,
            description: String::new(),
            date,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn sanitize(&mut self) -> Result<(), ValidationError> {
        validate::validate_id("transaction id", self.id)?;
        validate::validate_id("family id", self.family_id)?;
        validate::validate_id("user id", self.user_id)?;
        validate::validate_id("category id", self.category_id)?;
        self.amount = validate::validate_amount(self.amount)?;
        self.description = validate::validate_description(&self.description)?;
        self.tags = validate::validate_tags(&self.tags)?;
        Ok(())
    }
}

/// Listing filter for transactions. Every field narrows the result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub user_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub transaction_type: Option<TransactionType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl TransactionFilter {
    pub const DEFAULT_LIMIT: u32 = 50;
    pub const MAX_LIMIT: u32 = 500;

    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub fn effective_offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(id) = self.user_id {
            validate::validate_id("user id", id)?;
        }
        if let Some(id) = self.category_id {
            validate::validate_id("category id", id)?;
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            validate::validate_date_range(start, end)?;
        }
        for (field, bound) in [("min_amount", self.min_amount), ("max_amount", self.max_amount)] {
            if let Some(amount) = bound {
                if amount < Decimal::ZERO || amount > validate::MAX_AMOUNT {
                    return Err(ValidationError::out_of_range(
                        field,
                        format!("must be between 0 and {}", validate::MAX_AMOUNT),
                    ));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.min_amount, self.max_amount) {
            if max < min {
                return Err(ValidationError::out_of_range(
                    "max_amount",
                    "must not be below min_amount",
                ));
            }
        }
        Ok(())
    }
}

/// Selection for amount aggregates (`sum`, `totals_by_category`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountQuery {
    pub transaction_type: TransactionType,
    pub category_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl AmountQuery {
    pub fn of(transaction_type: TransactionType) -> Self {
        Self {
            transaction_type,
            category_id: None,
            start_date: None,
            end_date: None,
        }
    }

    pub fn between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn in_category(mut self, category_id: Option<Uuid>) -> Self {
        self.category_id = category_id;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category_id: Uuid,
    pub total: Decimal,
    pub count: u64,
}

// ─── Budget ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub family_id: Uuid,
    /// `None` budgets cover every expense category.
    pub category_id: Option<Uuid>,
    pub name: String,
    pub amount: Decimal,
    pub period: BudgetPeriod,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    pub fn new(
        family_id: Uuid,
        name: impl Into<String>,
        amount: Decimal,
        period: BudgetPeriod,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        let now = clock::now();
        Self {
            id: Uuid::new_v4(),
            family_id,
            category_id: None,
            name: name.into(),
            amount,
            period,
            start_date,
            end_date,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn sanitize(&mut self) -> Result<(), ValidationError> {
        validate::validate_id("budget id", self.id)?;
        validate::validate_id("family id", self.family_id)?;
        if let Some(category) = self.category_id {
            validate::validate_id("category id", category)?;
        }
        self.name = validate::validate_name("budget name", &self.name, MAX_BUDGET_NAME_LEN)?;
        self.amount = validate::validate_amount(self.amount)?;
        validate::validate_date_range(self.start_date, self.end_date)?;
        Ok(())
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

// ─── Report ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub family_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub report_type: ReportType,
    pub period: ReportPeriod,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub data: ReportData,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    pub fn sanitize(&mut self) -> Result<(), ValidationError> {
        validate::validate_id("report id", self.id)?;
        validate::validate_id("family id", self.family_id)?;
        validate::validate_id("user id", self.user_id)?;
        self.name = validate::validate_name("report name", &self.name, validate::MAX_REPORT_NAME_LEN)?;
        validate::validate_date_range(self.start_date, self.end_date)?;
        Ok(())
    }
}

/// Figures computed when a report is generated; stored verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub net_income: Decimal,
    #[serde(default)]
    pub category_breakdown: Vec<CategoryBreakdownItem>,
    #[serde(default)]
    pub budget_comparison: Vec<BudgetComparisonItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdownItem {
    pub category_id: Uuid,
    pub category_name: String,
    pub amount: Decimal,
    pub count: u64,
    /// Share of the report's total for the same transaction type, 0..=100.
    pub percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetComparisonItem {
    pub budget_id: Uuid,
    pub budget_name: String,
    pub planned: Decimal,
    pub actual: Decimal,
    pub variance: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!(Role::from_str(" ADMIN ").unwrap(), Role::Admin);
        assert_eq!(InviteStatus::from_str("Revoked").unwrap(), InviteStatus::Revoked);
        assert_eq!(ReportType::from_str("cash_flow").unwrap(), ReportType::CashFlow);
        assert!(matches!(
            Role::from_str("owner"),
            Err(ValidationError::Unsupported { field: "role", .. })
        ));
        assert!(matches!(
            BudgetPeriod::from_str(""),
            Err(ValidationError::Empty { .. })
        ));
        for role in Role::ALL {
            assert_eq!(Role::from_str(role.as_str()).unwrap(), *role);
        }
    }

    #[test]
    fn enums_serialize_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&ReportType::CategoryBreakdown).unwrap(),
            "\"category_breakdown\""
        );
        assert_eq!(serde_json::to_string(&Role::Child).unwrap(), "\"child\"");
    }

    #[test]
    fn invite_terminal_states() {
        assert!(!InviteStatus::Pending.is_terminal());
        assert!(InviteStatus::Accepted.is_terminal());
        assert!(InviteStatus::Expired.is_terminal());
        assert!(InviteStatus::Revoked.is_terminal());
    }

    #[test]
    fn family_sanitize_normalizes() {
        let mut family = Family::new("  Smith ", "usd");
        family.sanitize().unwrap();
        assert_eq!(family.name, "Smith");
        assert_eq!(family.currency, "USD");

        let mut bad = Family::new("Smith", "XXX");
        assert!(bad.sanitize().is_err());
    }

    #[test]
    fn user_sanitize_folds_email() {
        let mut user = User::new(Uuid::new_v4(), "A@B.com", "hash", "Ann", "Smith", Role::Admin);
        user.sanitize().unwrap();
        assert_eq!(user.email, "a@b.com");

        user.family_id = Uuid::nil();
        assert!(user.sanitize().is_err());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User::new(Uuid::new_v4(), "a@b.com", "secret-hash", "Ann", "Smith", Role::Member);
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "member");
    }

    #[test]
    fn budget_rejects_inverted_range() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut budget = Budget::new(
            Uuid::new_v4(),
            "Groceries",
            Decimal::from(500),
            BudgetPeriod::Monthly,
            start,
            end,
        );
        assert!(budget.sanitize().is_err());
        budget.end_date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        budget.sanitize().unwrap();
        assert!(budget.covers(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()));
        assert!(!budget.covers(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
    }

    #[test]
    fn category_cannot_parent_itself() {
        let mut category = Category::new(Uuid::new_v4(), "Food", CategoryType::Expense);
        category.parent_id = Some(category.id);
        assert!(category.sanitize().is_err());
    }

    #[test]
    fn filter_limits() {
        let filter = TransactionFilter::default();
        assert_eq!(filter.effective_limit(), 50);
        let filter = TransactionFilter {
            limit: Some(10_000),
            ..Default::default()
        };
        assert_eq!(filter.effective_limit(), 500);
        let filter = TransactionFilter {
            min_amount: Some(Decimal::from(10)),
            max_amount: Some(Decimal::from(5)),
            ..Default::default()
        };
        assert!(filter.validate().is_err());
    }

    #[test]
    fn filter_amounts_are_bounded() {
        let huge = TransactionFilter {
            min_amount: Some(Decimal::MAX),
            ..Default::default()
        };
        assert!(matches!(
            huge.validate(),
            Err(ValidationError::OutOfRange { field: "min_amount", .. })
        ));
        let negative = TransactionFilter {
            max_amount: Some(Decimal::from(-1)),
            ..Default::default()
        };
        assert!(negative.validate().is_err());
        let ceiling = TransactionFilter {
            min_amount: Some(Decimal::ZERO),
            max_amount: Some(validate::MAX_AMOUNT),
            ..Default::default()
        };
        assert!(ceiling.validate().is_ok());
    }
}
