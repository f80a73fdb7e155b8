pub mod error;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod repository;

pub use error::*;
pub use handlers::*;
pub use ledger::*;
pub use models::*;
pub use repository::*;
