//! OAuth2 token cache rows backing bearer authentication.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Token received from an OAuth2 provider, persisted so bearer calls can be
/// resolved (and refreshed) without a provider round trip per request.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expiry: DateTime<Utc>,
    pub email: String,
}

impl Token {
    pub fn expired(&self) -> bool {
        self.expiry <= Utc::now()
    }
}

/// Identity information a provider yields for a valid credential. The
/// access token may differ from the presented one after a refresh.
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub access_token: String,
    pub email: String,
    pub picture: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token(expiry: DateTime<Utc>) -> Token {
        Token {
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            token_type: "Bearer".to_string(),
            expiry,
            email: "any@example.org".to_string(),
        }
    }

    #[test]
    fn test_expired() {
        assert!(token(Utc::now() - Duration::minutes(1)).expired());
        assert!(!token(Utc::now() + Duration::hours(1)).expired());
    }
}
