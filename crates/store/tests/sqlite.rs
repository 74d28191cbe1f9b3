#[macro_use]
mod common;

use famledger_core::testing::{self, date};
use famledger_core::{CategoryType, Repositories, Role, StoreError, ValidationError};
use famledger_runtime_config::{StorageBackend, StorageSettings};

async fn sqlite() -> Option<Repositories> {
    Some(famledger_store::in_memory().await.expect("in-memory store").repos)
}

all_contract_tests!(sqlite());

#[tokio::test]
async fn missing_references_are_validation_errors() {
    let repos = sqlite().await.unwrap();
    let (family, admin) = common::seed(&repos).await;
    let ghost = testing::category(&family, "Ghost", CategoryType::Expense);

    let mut t = testing::expense(&admin, &ghost, "5.00", date(2024, 1, 1));
    let err = repos.transactions.create(&mut t).await.unwrap_err();
    assert!(
        matches!(
            err,
            StoreError::Validation(ValidationError::Malformed { field: "category id", .. })
        ),
        "{err:?}"
    );

    let mut orphan = testing::user(&testing::family(), "orphan", Role::Member);
    let err = repos.users.create(&mut orphan).await.unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)), "{err:?}");
}

#[tokio::test]
async fn file_store_survives_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = StorageSettings {
        backend: StorageBackend::Sqlite,
        sqlite_path: dir.path().join("data").join("famledger.db"),
        ..Default::default()
    };

    let store = famledger_store::connect(&cfg).await.unwrap();
    let (family, admin) = common::seed(&store.repos).await;
    drop(store);

    famledger_store::migrate(&cfg).await.unwrap();
    let store = famledger_store::connect(&cfg).await.unwrap();
    assert_eq!(store.backend, StorageBackend::Sqlite);
    assert_eq!(store.repos.families.get_by_id(family.id).await.unwrap(), family);
    assert_eq!(store.repos.users.get_by_email(&admin.email).await.unwrap().id, admin.id);
}
