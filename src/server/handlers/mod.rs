pub mod auth;
pub mod bookings;
pub mod channel;
pub mod drivers;

use axum::http::HeaderMap;

use crate::api::DynAPI;
use crate::auth::{bearer_token, User};
use crate::error::Error;

/// Resolves the request's bearer token to a user session.
pub async fn authenticate(api: &DynAPI, headers: &HeaderMap) -> Result<User, Error> {
    let token = bearer_token(headers)?;
    api.authenticate(&token).await
}
