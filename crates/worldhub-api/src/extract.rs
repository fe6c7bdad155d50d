//! Request extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;
use worldhub_core::error::DomainError;

use crate::error::ApiError;

/// Header carrying the authenticated user id, set by the gateway in front of
/// this service.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the caller's request id, echoed into emitted events.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The authenticated user performing the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingUser(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for ActingUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| DomainError::Permission(format!("missing {USER_ID_HEADER} header")))?;
        raw.to_str()
            .ok()
            .and_then(|value| value.trim().parse().ok())
            .map(Self)
            .ok_or_else(|| {
                ApiError(DomainError::Validation(format!(
                    "{USER_ID_HEADER} header is not a valid user id"
                )))
            })
    }
}

/// The caller's optional request id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestId(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for RequestId {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .headers
                .get(REQUEST_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned),
        ))
    }
}
