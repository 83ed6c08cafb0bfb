use crate::core::error::{Error, Result};
use crate::models::SessionUser;
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};

/// Authenticated request context, inserted by the session middleware.
#[derive(Clone, Debug)]
pub struct Ctx {
    token: String,
    user: SessionUser,
}

impl Ctx {
    pub fn new(token: String, user: SessionUser) -> Self {
        Self { token, user }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user(&self) -> &SessionUser {
        &self.user
    }

    pub fn user_id(&self) -> i64 {
        self.user.id
    }

    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }

    /// `None` for admins (who see every sale), the user's id otherwise.
    pub fn sales_scope(&self) -> Option<i64> {
        if self.is_admin() {
            None
        } else {
            Some(self.user.id)
        }
    }
}

impl<S> FromRequestParts<S> for Ctx
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<Ctx>()
            .cloned()
            .ok_or(Error::AuthFailCtxNotInRequestExt)
    }
}

impl<S> OptionalFromRequestParts<S> for Ctx
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Option<Self>> {
        Ok(parts.extensions.get::<Ctx>().cloned())
    }
}
