// Authentication module
// Identity is issued by an external service; this module only validates the
// bearer tokens it mints and exposes typed extractors for protected routes

pub mod error;
pub mod middleware;
pub mod models;
pub mod token;

pub use error::AuthError;
pub use middleware::{AuthenticatedCustomer, StaffUser};
pub use models::Role;
pub use token::{Claims, TokenService};
