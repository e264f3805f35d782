//! Service account model - the identity record behind every caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// How a service account authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthenticationType {
    #[serde(rename = "keypair")]
    KeyPair,
    #[serde(rename = "oauth2")]
    OAuth2,
}

/// Service account entity. Key-pair identities carry `key_id`/`key_secret`;
/// OAuth2 identities carry `email`. `base_role_id` points at the role created
/// and exclusively bound at account creation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServiceAccount {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub key_id: Option<String>,
    pub key_secret: Option<String>,
    pub picture: Option<String>,
    pub base_role_id: Uuid,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl ServiceAccount {
    pub fn authentication_type(&self) -> AuthenticationType {
        if self.key_id.is_some() {
            AuthenticationType::KeyPair
        } else {
            AuthenticationType::OAuth2
        }
    }
}

/// Service account as exposed over the API: never leaks the key secret.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceAccountResponse {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub picture: Option<String>,
    pub base_role_id: Uuid,
    pub authentication_type: AuthenticationType,
}

impl From<ServiceAccount> for ServiceAccountResponse {
    fn from(sa: ServiceAccount) -> Self {
        let authentication_type = sa.authentication_type();
        Self {
            id: sa.id,
            name: sa.name,
            email: sa.email,
            picture: sa.picture,
            base_role_id: sa.base_role_id,
            authentication_type,
        }
    }
}

/// Creation response for key-pair accounts; the secret is shown exactly once.
#[derive(Debug, Clone, Serialize)]
pub struct KeyPairCredentials {
    pub key_id: String,
    pub key_secret: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(key_id: Option<&str>, email: Option<&str>) -> ServiceAccount {
        ServiceAccount {
            id: Uuid::new_v4(),
            name: "sa".to_string(),
            email: email.map(String::from),
            key_id: key_id.map(String::from),
            key_secret: key_id.map(|_| "secret".to_string()),
            picture: None,
            base_role_id: Uuid::new_v4(),
            created_utc: Utc::now(),
            updated_utc: Utc::now(),
        }
    }

    #[test]
    fn test_authentication_type_from_credentials() {
        assert_eq!(
            account(Some("key"), None).authentication_type(),
            AuthenticationType::KeyPair
        );
        assert_eq!(
            account(None, Some("a@b.com")).authentication_type(),
            AuthenticationType::OAuth2
        );
    }

    #[test]
    fn test_response_never_exposes_secret() {
        let sa = account(Some("key"), None);
        let response = ServiceAccountResponse::from(sa);
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("key_secret").is_none());
    }
}
