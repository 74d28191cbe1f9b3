pub mod families;
pub mod health;
pub mod invites;
pub mod ledger;
pub mod reports;
