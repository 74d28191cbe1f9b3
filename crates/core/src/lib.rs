//! famledger core: the entities a family owns, the validators every input
//! passes through, and the repository contracts each storage backend
//! implements.

pub mod clock;
pub mod error;
pub mod model;
pub mod money;
pub mod repo;
pub mod validate;

pub use error::{StoreError, StoreResult, ValidationError};
pub use model::*;
pub use repo::*;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
