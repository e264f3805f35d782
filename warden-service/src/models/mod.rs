pub mod list_options;
pub mod permission;
pub mod permission_request;
pub mod role;
pub mod service_account;
pub mod token;

pub use list_options::ListOptions;
pub use permission::{
    MalformedPermissionError, OwnershipLevel, Permission, PermissionRow, ResourceHierarchy,
    WARDEN_SERVICE, WILDCARD,
};
pub use permission_request::{PermissionRequest, PermissionRequestRow, PermissionRequestState};
pub use role::{Role, RoleBinding, RoleWithPermissions};
pub use service_account::{
    AuthenticationType, KeyPairCredentials, ServiceAccount, ServiceAccountResponse,
};
pub use token::{AuthResult, Token};
