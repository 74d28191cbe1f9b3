use rust_decimal::Decimal;
use uuid::Uuid;

use famledger_api::{CreateCategoryRequest, CreateTransactionRequest};

pub fn category(name: &str, category_type: &str) -> CreateCategoryRequest {
    CreateCategoryRequest {
        name: name.into(),
        category_type: category_type.into(),
        color: None,
        icon: None,
        parent_id: None,
    }
}

/// An expense of `amount` (in major units, e.g. `"100.50"`) on `date`.
pub fn expense(category_id: Uuid, amount: &str, date: &str) -> CreateTransactionRequest {
    transaction(category_id, amount, "expense", date)
}

pub fn income(category_id: Uuid, amount: &str, date: &str) -> CreateTransactionRequest {
    transaction(category_id, amount, "income", date)
}

fn transaction(category_id: Uuid, amount: &str, kind: &str, date: &str) -> CreateTransactionRequest {
    CreateTransactionRequest {
        category_id: category_id.to_string(),
        user_id: None,
        amount: amount.parse::<Decimal>().unwrap_or_default(),
        transaction_type: kind.into(),
        description: String::new(),
        date: date.into(),
        tags: Vec::new(),
    }
}
