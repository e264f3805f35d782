pub mod helpers;
pub mod permissions;
pub mod requests;
pub mod roles;
pub mod service_accounts;
pub mod sso;
