//! Income and expense records.
//!
//! The document store has no foreign keys, so every reference a transaction
//! makes is checked here: the category and the user must belong to the
//! caller's family, and the category type must match the transaction type.

use uuid::Uuid;

use famledger_core::{
    Category, CategoryType, Role, Transaction, TransactionFilter, TransactionType, clock,
};

use super::{Caller, Repositories, owned, parse_date, parse_enum, parse_id};
use crate::{
    CreateTransactionRequest, ListTransactionsResponse, ServiceError, TransactionListQuery,
    UpdateTransactionRequest,
};

/// Turn query-string input into a validated filter.
pub fn build_filter(query: TransactionListQuery) -> Result<TransactionFilter, ServiceError> {
    fn present(v: &Option<String>) -> Option<&str> {
        v.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    let filter = TransactionFilter {
        user_id: present(&query.user_id)
            .map(|s| parse_id("user id", s))
            .transpose()?,
        category_id: present(&query.category_id)
            .map(|s| parse_id("category id", s))
            .transpose()?,
        transaction_type: present(&query.transaction_type)
            .map(parse_enum::<TransactionType>)
            .transpose()?,
        start_date: present(&query.start_date).map(parse_date).transpose()?,
        end_date: present(&query.end_date).map(parse_date).transpose()?,
        min_amount: query.min_amount,
        max_amount: query.max_amount,
        limit: query.limit,
        offset: query.offset,
    };
    filter.validate()?;
    Ok(filter)
}

pub async fn list_transactions(
    repos: &Repositories,
    caller: &Caller,
    query: TransactionListQuery,
) -> Result<ListTransactionsResponse, ServiceError> {
    let filter = build_filter(query)?;
    let transactions = repos.transactions.list(caller.family_id, &filter).await?;
    Ok(ListTransactionsResponse {
        transactions,
        limit: filter.effective_limit(),
        offset: filter.effective_offset(),
    })
}

pub async fn get_transaction(
    repos: &Repositories,
    caller: &Caller,
    id: Uuid,
) -> Result<Transaction, ServiceError> {
    let transaction = repos.transactions.get_by_id(id).await?;
    owned(caller, transaction.family_id, transaction, "transaction")
}

/// The category must be an active category of the caller's family whose
/// type matches `transaction_type`.
async fn check_category(
    repos: &Repositories,
    caller: &Caller,
    category_id: Uuid,
    transaction_type: TransactionType,
) -> Result<Category, ServiceError> {
    let category = match repos.categories.get_by_id(category_id).await {
        Ok(c) if c.family_id == caller.family_id => c,
        Ok(_) => return Err(ServiceError::BadRequest("unknown category".into())),
        Err(e) if e.is_not_found() => {
            return Err(ServiceError::BadRequest("unknown category".into()));
        }
        Err(e) => return Err(e.into()),
    };
    if !category.is_active {
        return Err(ServiceError::BadRequest("category is inactive".into()));
    }
    if category.category_type != CategoryType::from(transaction_type) {
        return Err(ServiceError::BadRequest(format!(
            "category {} is not an {} category",
            category.name, transaction_type
        )));
    }
    Ok(category)
}

async fn check_user(repos: &Repositories, caller: &Caller, user_id: Uuid) -> Result<(), ServiceError> {
    match repos.users.get_by_id(user_id).await {
        Ok(u) if u.family_id == caller.family_id && u.is_active => Ok(()),
        Ok(_) => Err(ServiceError::BadRequest("unknown user".into())),
        Err(e) if e.is_not_found() => Err(ServiceError::BadRequest("unknown user".into())),
        Err(e) => Err(e.into()),
    }
}

/// Children may only touch transactions they recorded themselves.
fn check_write(caller: &Caller, transaction: &Transaction) -> Result<(), ServiceError> {
    if caller.role == Role::Child && transaction.user_id != caller.user_id {
        return Err(ServiceError::Forbidden(
            "children may only change their own transactions".into(),
        ));
    }
    Ok(())
}

pub async fn create_transaction(
    repos: &Repositories,
    caller: &Caller,
    req: CreateTransactionRequest,
) -> Result<Transaction, ServiceError> {
    let transaction_type = parse_enum(&req.transaction_type)?;
    let category_id = parse_id("category id", &req.category_id)?;
    let user_id = match req.user_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => parse_id("user id", raw)?,
        None => caller.user_id,
    };
    if user_id != caller.user_id {
        caller.require_admin()?;
        check_user(repos, caller, user_id).await?;
    }
    check_category(repos, caller, category_id, transaction_type).await?;

    let mut transaction = Transaction::new(
        caller.family_id,
        user_id,
        category_id,
        req.amount,
        transaction_type,
        parse_date(&req.date)?,
    );
    transaction.description = req.description;
    transaction.tags = req.tags;
    repos.transactions.create(&mut transaction).await?;
    tracing::debug!(transaction_id = %transaction.id, "transaction recorded");
    Ok(transaction)
}

pub async fn update_transaction(
    repos: &Repositories,
    caller: &Caller,
    id: Uuid,
    req: UpdateTransactionRequest,
) -> Result<Transaction, ServiceError> {
    let mut transaction = get_transaction(repos, caller, id).await?;
    check_write(caller, &transaction)?;

    let mut recheck = false;
    if let Some(t) = req.transaction_type {
        transaction.transaction_type = parse_enum(&t)?;
        recheck = true;
    }
    if let Some(c) = req.category_id {
        transaction.category_id = parse_id("category id", &c)?;
        recheck = true;
    }
    if recheck {
        check_category(repos, caller, transaction.category_id, transaction.transaction_type)
            .await?;
    }
    if let Some(amount) = req.amount {
        transaction.amount = amount;
    }
    if let Some(description) = req.description {
        transaction.description = description;
    }
    if let Some(date) = req.date {
        transaction.date = parse_date(&date)?;
    }
    if let Some(tags) = req.tags {
        transaction.tags = tags;
    }
    transaction.updated_at = clock::now();
    repos.transactions.update(&mut transaction).await?;
    Ok(transaction)
}

pub async fn delete_transaction(
    repos: &Repositories,
    caller: &Caller,
    id: Uuid,
) -> Result<(), ServiceError> {
    let transaction = get_transaction(repos, caller, id).await?;
    check_write(caller, &transaction)?;
    repos.transactions.delete(id).await?;
    Ok(())
}
