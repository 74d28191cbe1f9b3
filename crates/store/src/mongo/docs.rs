//! BSON document shapes, one per collection.
//!
//! Ids are UUID strings in `_id`, timestamps and dates use the same text
//! encodings as the relational stores, amounts are `i64` cents.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use famledger_core::{
    Budget, BudgetComparisonItem, Category, CategoryBreakdownItem, Family, Invite, Report,
    ReportData, StoreError, StoreResult, Transaction, User, clock, money,
};

fn decode(field: &str, detail: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("decoding field {field}: {detail}"))
}

fn uuid(field: &str, s: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| decode(field, e))
}

fn opt_uuid(field: &str, s: Option<&str>) -> StoreResult<Option<Uuid>> {
    s.map(|s| uuid(field, s)).transpose()
}

fn timestamp(field: &str, s: &str) -> StoreResult<DateTime<Utc>> {
    clock::parse_timestamp(s).map_err(|e| decode(field, e))
}

fn opt_timestamp(field: &str, s: Option<&str>) -> StoreResult<Option<DateTime<Utc>>> {
    s.map(|s| timestamp(field, s)).transpose()
}

fn date(field: &str, s: &str) -> StoreResult<NaiveDate> {
    clock::parse_date(s).map_err(|e| decode(field, e))
}

fn parse<T>(field: &str, s: &str) -> StoreResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    s.parse().map_err(|e| decode(field, e))
}

fn cents(amount: Decimal) -> StoreResult<i64> {
    Ok(money::to_cents(amount)?)
}

fn count(field: &str, n: i64) -> StoreResult<u64> {
    u64::try_from(n).map_err(|_| decode(field, format!("negative count {n}")))
}

pub(crate) fn ts(v: &DateTime<Utc>) -> String {
    clock::format_timestamp(v)
}

pub(crate) fn day(v: &NaiveDate) -> String {
    clock::format_date(v)
}

// ── Families ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyDoc {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub currency: String,
    pub created_at: String,
    pub updated_at: String,
}

impl FamilyDoc {
    pub fn from_entity(f: &Family) -> Self {
        Self {
            id: f.id.to_string(),
            name: f.name.clone(),
            currency: f.currency.clone(),
            created_at: ts(&f.created_at),
            updated_at: ts(&f.updated_at),
        }
    }

    pub fn into_entity(self) -> StoreResult<Family> {
        Ok(Family {
            id: uuid("_id", &self.id)?,
            name: self.name,
            currency: self.currency,
            created_at: timestamp("created_at", &self.created_at)?,
            updated_at: timestamp("updated_at", &self.updated_at)?,
        })
    }
}

// ── Users ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDoc {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub family_id: String,
    pub is_active: bool,
    pub last_login: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl UserDoc {
    pub fn from_entity(u: &User) -> Self {
        Self {
            id: u.id.to_string(),
            email: u.email.clone(),
            password_hash: u.password_hash.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            role: u.role.as_str().to_string(),
            family_id: u.family_id.to_string(),
            is_active: u.is_active,
            last_login: u.last_login.as_ref().map(ts),
            created_at: ts(&u.created_at),
            updated_at: ts(&u.updated_at),
        }
    }

    pub fn into_entity(self) -> StoreResult<User> {
        Ok(User {
            id: uuid("_id", &self.id)?,
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            role: parse("role", &self.role)?,
            family_id: uuid("family_id", &self.family_id)?,
            is_active: self.is_active,
            last_login: opt_timestamp("last_login", self.last_login.as_deref())?,
            created_at: timestamp("created_at", &self.created_at)?,
            updated_at: timestamp("updated_at", &self.updated_at)?,
        })
    }
}

// ── Invites ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteDoc {
    #[serde(rename = "_id")]
    pub id: String,
    pub family_id: String,
    pub created_by: String,
    pub email: String,
    pub role: String,
    pub token: String,
    pub status: String,
    pub expires_at: String,
    pub accepted_at: Option<String>,
    pub accepted_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl InviteDoc {
    pub fn from_entity(i: &Invite) -> Self {
        Self {
            id: i.id.to_string(),
            family_id: i.family_id.to_string(),
            created_by: i.created_by.to_string(),
            email: i.email.clone(),
            role: i.role.as_str().to_string(),
            token: i.token.clone(),
            status: i.status.as_str().to_string(),
            expires_at: ts(&i.expires_at),
            accepted_at: i.accepted_at.as_ref().map(ts),
            accepted_by: i.accepted_by.map(|u| u.to_string()),
            created_at: ts(&i.created_at),
            updated_at: ts(&i.updated_at),
        }
    }

    pub fn into_entity(self) -> StoreResult<Invite> {
        Ok(Invite {
            id: uuid("_id", &self.id)?,
            family_id: uuid("family_id", &self.family_id)?,
            created_by: uuid("created_by", &self.created_by)?,
            email: self.email,
            role: parse("role", &self.role)?,
            token: self.token,
            status: parse("status", &self.status)?,
            expires_at: timestamp("expires_at", &self.expires_at)?,
            accepted_at: opt_timestamp("accepted_at", self.accepted_at.as_deref())?,
            accepted_by: opt_uuid("accepted_by", self.accepted_by.as_deref())?,
            created_at: timestamp("created_at", &self.created_at)?,
            updated_at: timestamp("updated_at", &self.updated_at)?,
        })
    }
}

// ── Categories ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDoc {
    #[serde(rename = "_id")]
    pub id: String,
    pub family_id: String,
    pub name: String,
    pub category_type: String,
    pub color: String,
    pub icon: String,
    pub parent_id: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl CategoryDoc {
    pub fn from_entity(c: &Category) -> Self {
        Self {
            id: c.id.to_string(),
            family_id: c.family_id.to_string(),
            name: c.name.clone(),
            category_type: c.category_type.as_str().to_string(),
            color: c.color.clone(),
            icon: c.icon.clone(),
            parent_id: c.parent_id.map(|u| u.to_string()),
            is_active: c.is_active,
            created_at: ts(&c.created_at),
            updated_at: ts(&c.updated_at),
        }
    }

    pub fn into_entity(self) -> StoreResult<Category> {
        Ok(Category {
            id: uuid("_id", &self.id)?,
            family_id: uuid("family_id", &self.family_id)?,
            name: self.name,
            category_type: parse("category_type", &self.category_type)?,
            color: self.color,
            icon: self.icon,
            parent_id: opt_uuid("parent_id", self.parent_id.as_deref())?,
            is_active: self.is_active,
            created_at: timestamp("created_at", &self.created_at)?,
            updated_at: timestamp("updated_at", &self.updated_at)?,
        })
    }
}

// ── Transactions ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDoc {
    #[serde(rename = "_id")]
    pub id: String,
    pub family_id: String,
    pub user_id: String,
    pub category_id: String,
    pub amount_cents: i64,
    pub transaction_type: String,
    pub description: String,
    pub date: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TransactionDoc {
    pub fn from_entity(t: &Transaction) -> StoreResult<Self> {
        Ok(Self {
            id: t.id.to_string(),
            family_id: t.family_id.to_string(),
            user_id: t.user_id.to_string(),
            category_id: t.category_id.to_string(),
            amount_cents: cents(t.amount)?,
            transaction_type: t.transaction_type.as_str().to_string(),
            description: t.description.clone(),
            date: day(&t.date),
            tags: t.tags.clone(),
            created_at: ts(&t.created_at),
            updated_at: ts(&t.updated_at),
        })
    }

    pub fn into_entity(self) -> StoreResult<Transaction> {
        Ok(Transaction {
            id: uuid("_id", &self.id)?,
            family_id: uuid("family_id", &self.family_id)?,
            user_id: uuid("user_id", &self.user_id)?,
            category_id: uuid("category_id", &self.category_id)?,
            amount: money::from_cents(self.amount_cents),
            transaction_type: parse("transaction_type", &self.transaction_type)?,
            description: self.description,
            date: date("date", &self.date)?,
            tags: self.tags,
            created_at: timestamp("created_at", &self.created_at)?,
            updated_at: timestamp("updated_at", &self.updated_at)?,
        })
    }
}

// ── Budgets ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetDoc {
    #[serde(rename = "_id")]
    pub id: String,
    pub family_id: String,
    pub category_id: Option<String>,
    pub name: String,
    pub amount_cents: i64,
    pub period: String,
    pub start_date: String,
    pub end_date: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl BudgetDoc {
    pub fn from_entity(b: &Budget) -> StoreResult<Self> {
        Ok(Self {
            id: b.id.to_string(),
            family_id: b.family_id.to_string(),
            category_id: b.category_id.map(|u| u.to_string()),
            name: b.name.clone(),
            amount_cents: cents(b.amount)?,
            period: b.period.as_str().to_string(),
            start_date: day(&b.start_date),
            end_date: day(&b.end_date),
            is_active: b.is_active,
            created_at: ts(&b.created_at),
            updated_at: ts(&b.updated_at),
        })
    }

    pub fn into_entity(self) -> StoreResult<Budget> {
        Ok(Budget {
            id: uuid("_id", &self.id)?,
            family_id: uuid("family_id", &self.family_id)?,
            category_id: opt_uuid("category_id", self.category_id.as_deref())?,
            name: self.name,
            amount: money::from_cents(self.amount_cents),
            period: parse("period", &self.period)?,
            start_date: date("start_date", &self.start_date)?,
            end_date: date("end_date", &self.end_date)?,
            is_active: self.is_active,
            created_at: timestamp("created_at", &self.created_at)?,
            updated_at: timestamp("updated_at", &self.updated_at)?,
        })
    }
}

// ── Reports ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDoc {
    #[serde(rename = "_id")]
    pub id: String,
    pub family_id: String,
    pub user_id: String,
    pub name: String,
    pub report_type: String,
    pub period: String,
    pub start_date: String,
    pub end_date: String,
    pub data: ReportDataDoc,
    pub generated_at: String,
}

/// Embedded figures. Percentages keep their decimal text form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDataDoc {
    pub total_income_cents: i64,
    pub total_expenses_cents: i64,
    pub net_income_cents: i64,
    #[serde(default)]
    pub category_breakdown: Vec<BreakdownDoc>,
    #[serde(default)]
    pub budget_comparison: Vec<ComparisonDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakdownDoc {
    pub category_id: String,
    pub category_name: String,
    pub amount_cents: i64,
    pub count: i64,
    pub percentage: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonDoc {
    pub budget_id: String,
    pub budget_name: String,
    pub planned_cents: i64,
    pub actual_cents: i64,
    pub variance_cents: i64,
}

impl ReportDataDoc {
    fn from_entity(d: &ReportData) -> StoreResult<Self> {
        Ok(Self {
            total_income_cents: cents(d.total_income)?,
            total_expenses_cents: cents(d.total_expenses)?,
            net_income_cents: cents(d.net_income)?,
            category_breakdown: d
                .category_breakdown
                .iter()
                .map(|b| {
                    Ok(BreakdownDoc {
                        category_id: b.category_id.to_string(),
                        category_name: b.category_name.clone(),
                        amount_cents: cents(b.amount)?,
                        count: i64::try_from(b.count).unwrap_or(i64::MAX),
                        percentage: b.percentage.to_string(),
                    })
                })
                .collect::<StoreResult<_>>()?,
            budget_comparison: d
                .budget_comparison
                .iter()
                .map(|c| {
                    Ok(ComparisonDoc {
                        budget_id: c.budget_id.to_string(),
                        budget_name: c.budget_name.clone(),
                        planned_cents: cents(c.planned)?,
                        actual_cents: cents(c.actual)?,
                        variance_cents: cents(c.variance)?,
                    })
                })
                .collect::<StoreResult<_>>()?,
        })
    }

    fn into_entity(self) -> StoreResult<ReportData> {
        Ok(ReportData {
            total_income: money::from_cents(self.total_income_cents),
            total_expenses: money::from_cents(self.total_expenses_cents),
            net_income: money::from_cents(self.net_income_cents),
            category_breakdown: self
                .category_breakdown
                .into_iter()
                .map(|b| {
                    Ok(CategoryBreakdownItem {
                        category_id: uuid("category_id", &b.category_id)?,
                        category_name: b.category_name,
                        amount: money::from_cents(b.amount_cents),
                        count: count("count", b.count)?,
                        percentage: parse("percentage", &b.percentage)?,
                    })
                })
                .collect::<StoreResult<_>>()?,
            budget_comparison: self
                .budget_comparison
                .into_iter()
                .map(|c| {
                    Ok(BudgetComparisonItem {
                        budget_id: uuid("budget_id", &c.budget_id)?,
                        budget_name: c.budget_name,
                        planned: money::from_cents(c.planned_cents),
                        actual: money::from_cents(c.actual_cents),
                        variance: money::from_cents(c.variance_cents),
                    })
                })
                .collect::<StoreResult<_>>()?,
        })
    }
}

impl ReportDoc {
    pub fn from_entity(r: &Report) -> StoreResult<Self> {
        Ok(Self {
            id: r.id.to_string(),
            family_id: r.family_id.to_string(),
            user_id: r.user_id.to_string(),
            name: r.name.clone(),
            report_type: r.report_type.as_str().to_string(),
            period: r.period.as_str().to_string(),
            start_date: day(&r.start_date),
            end_date: day(&r.end_date),
            data: ReportDataDoc::from_entity(&r.data)?,
            generated_at: ts(&r.generated_at),
        })
    }

    pub fn into_entity(self) -> StoreResult<Report> {
        Ok(Report {
            id: uuid("_id", &self.id)?,
            family_id: uuid("family_id", &self.family_id)?,
            user_id: uuid("user_id", &self.user_id)?,
            name: self.name,
            report_type: parse("report_type", &self.report_type)?,
            period: parse("period", &self.period)?,
            start_date: date("start_date", &self.start_date)?,
            end_date: date("end_date", &self.end_date)?,
            data: self.data.into_entity()?,
            generated_at: timestamp("generated_at", &self.generated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use famledger_core::testing::{self, dec};
    use famledger_core::{ReportPeriod, ReportType, Role};

    #[test]
    fn transaction_doc_keeps_cents_and_tags() {
        let family = testing::family();
        let user = testing::user(&family, "ann", Role::Admin);
        let food = testing::category(&family, "Food", famledger_core::CategoryType::Expense);
        let mut t = testing::expense(&user, &food, "100.50", testing::date(2024, 1, 15));
        t.tags = vec!["weekly".into()];

        let doc = TransactionDoc::from_entity(&t).unwrap();
        assert_eq!(doc.amount_cents, 10050);
        assert_eq!(doc.date, "2024-01-15");
        assert_eq!(doc.into_entity().unwrap(), t);
    }

    #[test]
    fn report_data_embeds_breakdown() {
        let family = testing::family();
        let data = ReportData {
            total_income: dec("1000.00"),
            total_expenses: dec("250.25"),
            net_income: dec("749.75"),
            category_breakdown: vec![CategoryBreakdownItem {
                category_id: Uuid::new_v4(),
                category_name: "Food".into(),
                amount: dec("250.25"),
                count: 3,
                percentage: dec("100.00"),
            }],
            budget_comparison: Vec::new(),
        };
        let report = Report {
            id: Uuid::new_v4(),
            family_id: family.id,
            user_id: Uuid::new_v4(),
            name: "January".into(),
            report_type: ReportType::Expenses,
            period: ReportPeriod::Monthly,
            start_date: testing::date(2024, 1, 1),
            end_date: testing::date(2024, 1, 31),
            data,
            generated_at: clock::now(),
        };
        let doc = ReportDoc::from_entity(&report).unwrap();
        assert_eq!(doc.data.total_expenses_cents, 25025);
        assert_eq!(doc.data.category_breakdown[0].percentage, "100.00");
        assert_eq!(doc.into_entity().unwrap(), report);
    }

    #[test]
    fn corrupt_ids_are_backend_errors() {
        let doc = FamilyDoc {
            id: "not-a-uuid".into(),
            name: "Smith".into(),
            currency: "USD".into(),
            created_at: ts(&clock::now()),
            updated_at: ts(&clock::now()),
        };
        assert!(matches!(doc.into_entity(), Err(StoreError::Backend(_))));
    }
}
