//! Session of the acting console user
//!
//! Tokens are issued by the console's identity layer; this server only
//! verifies them and passes the resulting [`Session`] explicitly to the
//! operations that record who did what.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Console roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Presenters and guests
    Member,
    /// Technical and editorial staff
    Staff,
    Manager,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Staff => "staff",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }

    /// Staff, managers and admins form the station team
    pub fn is_team(&self) -> bool {
        matches!(self, Role::Staff | Role::Manager | Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JWT claims carried by console requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// User id in the console's user directory
    pub sub: String,
    pub name: String,
    pub role: Role,
    /// Company the user belongs to, if any
    pub company_id: Option<i32>,
    pub exp: i64,
    pub iat: i64,
}

impl Session {
    /// Create a signed token (used by tooling and tests)
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse and verify a token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn user_id(&self) -> &str {
        &self.sub
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
pub(crate) fn test_session(role: Role, company_id: Option<i32>) -> Session {
    Session {
        sub: "u-1".to_string(),
        name: "Test User".to_string(),
        role,
        company_id,
        exp: chrono::Utc::now().timestamp() + 3600,
        iat: chrono::Utc::now().timestamp(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let session = test_session(Role::Manager, Some(3));
        let token = session.create_token("secret").unwrap();
        let parsed = Session::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.sub, "u-1");
        assert_eq!(parsed.role, Role::Manager);
        assert_eq!(parsed.company_id, Some(3));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = test_session(Role::Staff, None).create_token("secret").unwrap();
        assert!(Session::from_token(&token, "other").is_err());
    }

    #[test]
    fn test_team_roles() {
        assert!(!Role::Member.is_team());
        assert!(Role::Staff.is_team());
        assert!(Role::Admin.is_team());
    }
}
