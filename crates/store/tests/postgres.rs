//! Runs when `FAMLEDGER_TEST_POSTGRES_URL` points at a scratch database.

#[macro_use]
mod common;

use std::sync::Once;

use famledger_core::Repositories;
use famledger_runtime_config::{StorageBackend, StorageSettings};

fn settings() -> Option<StorageSettings> {
    let url = std::env::var("FAMLEDGER_TEST_POSTGRES_URL").ok()?;
    Some(StorageSettings {
        backend: StorageBackend::Postgres,
        postgres_url: url,
        postgres_max_connections: 4,
        auto_migrate: false,
        ..Default::default()
    })
}

/// Migrate once, on a runtime of its own, before the first case connects.
fn migrate_once(cfg: &StorageSettings) {
    static MIGRATE: Once = Once::new();
    MIGRATE.call_once(|| {
        let cfg = cfg.clone();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().expect("runtime");
            rt.block_on(famledger_store::migrate(&cfg)).expect("migrate postgres");
        })
        .join()
        .expect("migration thread");
    });
}

async fn postgres() -> Option<Repositories> {
    let cfg = settings()?;
    migrate_once(&cfg);
    Some(famledger_store::connect(&cfg).await.expect("connect postgres").repos)
}

all_contract_tests!(postgres());
