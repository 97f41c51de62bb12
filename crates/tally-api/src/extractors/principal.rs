//! `CurrentPrincipal` extractor: trusts the identity asserted by the
//! upstream gateway.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use tally_core::error::AppError;
use tally_core::types::id::PrincipalId;
use tally_service::{Principal, Role};

use crate::error::ApiError;

/// Header carrying the caller's principal id (a UUID).
pub const PRINCIPAL_ID_HEADER: &str = "x-principal-id";
/// Header carrying the caller's role (`admin` or `user`).
pub const PRINCIPAL_ROLE_HEADER: &str = "x-principal-role";

/// Extracted principal available in handlers.
#[derive(Debug, Clone, Copy)]
pub struct CurrentPrincipal(pub Principal);

impl std::ops::Deref for CurrentPrincipal {
    type Target = Principal;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(PRINCIPAL_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing principal header"))?
            .trim()
            .parse::<PrincipalId>()
            .map_err(|_| AppError::unauthorized("Invalid principal id"))?;

        // A missing role header means a regular user.
        let role = match parts.headers.get(PRINCIPAL_ROLE_HEADER) {
            None => Role::User,
            Some(value) => value
                .to_str()
                .map_err(|_| AppError::unauthorized("Invalid principal role"))?
                .parse::<Role>()?,
        };

        Ok(Self(Principal::new(id, role)))
    }
}
