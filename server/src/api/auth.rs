//! Caller identity
//!
//! The identity provider in front of the service authenticates the caller
//! and forwards an opaque user id header. Requests without it are refused
//! before any handler runs.

use crate::config;
use crate::error::AppError;
use crate::models::UserId;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use std::ops::Deref;

/// Request guard resolving the authenticated caller
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(UserId);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = AppError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match UserId::from_identity(req.headers().get_one(config::USER_ID_HEADER)) {
            Ok(user) => Outcome::Success(AuthenticatedUser(user)),
            Err(e) => {
                tracing::debug!("Rejected unauthenticated request to {}", req.uri());
                Outcome::Error((Status::Unauthorized, e))
            }
        }
    }
}

impl Deref for AuthenticatedUser {
    type Target = UserId;

    fn deref(&self) -> &UserId {
        &self.0
    }
}
