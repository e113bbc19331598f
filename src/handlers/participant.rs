use axum::{extract::FromRequestParts, http::request::Parts};

use super::ApiError;

/// Header the upstream auth layer fills with the caller's account id.
pub const PARTICIPANT_HEADER: &str = "x-account-id";

/// Header the upstream auth layer fills with the caller's account role.
pub const ROLE_HEADER: &str = "x-account-role";

pub const ADMIN_ROLE: &str = "admin";

/// The authenticated participant making the request.
#[derive(Debug, Clone)]
pub struct Participant(pub String);

/// An authenticated participant holding the admin role.
#[derive(Debug, Clone)]
pub struct Admin(pub String);

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

impl<S> FromRequestParts<S> for Participant
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header(parts, PARTICIPANT_HEADER)
            .map(|id| Participant(id.to_string()))
            .ok_or(ApiError::AccessDenied)
    }
}

impl<S> FromRequestParts<S> for Admin
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, PARTICIPANT_HEADER).ok_or(ApiError::AccessDenied)?;

        // Role names are matched exactly
        match header(parts, ROLE_HEADER) {
            Some(ADMIN_ROLE) => Ok(Admin(id.to_string())),
            _ => Err(ApiError::AccessDenied),
        }
    }
}
