use axum::extract::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::DynAPI;
use crate::auth::{Role, User};
use crate::error::Error;

#[derive(Serialize, Deserialize)]
pub struct TokenParams {
    pub user_id: Option<Uuid>,
    pub role: Role,
}

#[derive(Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub user_id: Uuid,
}

/// Thin stand-in for the external identity collaborator: mints a session
/// token carrying the actor id and role used by REST and the channel alike.
pub async fn issue(
    Extension(api): Extension<DynAPI>,
    Json(params): Json<TokenParams>,
) -> Result<Json<TokenResponse>, Error> {
    let user = User {
        id: params.user_id.unwrap_or_else(Uuid::new_v4),
        role: params.role,
    };

    let token = api.issue_token(user.clone()).await?;

    Ok(Json(TokenResponse {
        token,
        user_id: user.id,
    }))
}
