pub mod auth;
pub mod manager;
pub mod state;

pub use auth::{Authorizer, CompanyAuthorizer, UserContext, UserRole};
pub use manager::ScanManager;
pub use state::{transition, ScanEvent};
