use async_trait::async_trait;
use uuid::Uuid;

use super::Engine;

use crate::{
    api::SessionAPI,
    auth::User,
    error::{unauthorized_error, Error},
};

#[async_trait]
impl SessionAPI for Engine {
    /// Stand-in for the external identity service: mints an opaque bearer
    /// token for an already-authenticated user. The same token authorizes
    /// both REST calls and the channel handshake.
    #[tracing::instrument(skip(self))]
    async fn issue_token(&self, user: User) -> Result<String, Error> {
        let token = Uuid::new_v4().to_string();

        let mut tokens = self.tokens.write().await;
        tokens.insert(token.clone(), user);

        Ok(token)
    }

    #[tracing::instrument(skip(self, token))]
    async fn authenticate(&self, token: &str) -> Result<User, Error> {
        let tokens = self.tokens.read().await;

        tokens.get(token).cloned().ok_or_else(unauthorized_error)
    }
}
