pub mod accounts;
pub mod database;
pub mod oauth;
pub mod requests;
pub mod roles;

pub use accounts::{AccessTokenAuth, AccountService, KeyPairAuth};
pub use database::Database;
pub use oauth::{provider_from_config, Provider};
pub use requests::{CreateRequestOutcome, RequestService};
pub use roles::RoleService;
