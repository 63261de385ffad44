//! Boundary with the session layer.
//!
//! Session handling lives upstream; by the time a request reaches this service
//! the authenticated user id, if any, travels in the `x-user-id` header.

use crate::error::{ForumError, ForumResult};
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;

pub const USER_HEADER: &str = "x-user-id";

/// `currentUserId()` for one request. Absent or malformed headers resolve to
/// an anonymous caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CurrentUser(pub Option<i64>);

impl CurrentUser {
    pub fn id(&self) -> Option<i64> {
        self.0
    }

    pub fn require(&self) -> ForumResult<i64> {
        self.0.ok_or(ForumError::AuthenticationRequired)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|id| *id > 0);
        Ok(CurrentUser(user_id))
    }
}
