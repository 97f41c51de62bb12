//! The caller of a service operation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use tally_core::error::AppError;
use tally_core::result::AppResult;
use tally_core::types::id::PrincipalId;
use tally_entity::audit::Actor;

/// Coarse role asserted by the upstream gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May use the administrative console.
    Admin,
    /// May only touch their own records.
    User,
}

impl Role {
    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => Err(AppError::unauthorized(format!("Unknown role: {other}"))),
        }
    }
}

/// Authenticated principal making a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    /// The principal's identifier.
    pub id: PrincipalId,
    /// The principal's role.
    pub role: Role,
}

impl Principal {
    /// Create a principal.
    pub fn new(id: PrincipalId, role: Role) -> Self {
        Self { id, role }
    }

    /// A regular user.
    pub fn user(id: PrincipalId) -> Self {
        Self::new(id, Role::User)
    }

    /// An administrator.
    pub fn admin(id: PrincipalId) -> Self {
        Self::new(id, Role::Admin)
    }

    /// Check if the principal is an admin.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail with `Forbidden` unless the principal is an admin.
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("Administrator role required"))
        }
    }

    /// The principal as an audit actor.
    pub fn actor(&self) -> Actor {
        Actor::Principal(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::error::ErrorKind;

    #[test]
    fn test_role_parsing() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" user ".parse::<Role>().unwrap(), Role::User);
        assert_eq!(
            "root".parse::<Role>().unwrap_err().kind,
            ErrorKind::Unauthorized
        );
    }

    #[test]
    fn test_require_admin() {
        let id = PrincipalId::new();
        assert!(Principal::admin(id).require_admin().is_ok());
        let err = Principal::user(id).require_admin().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
    }
}
