//! Authentication, session and profile endpoints.

use tracing::info;

use super::{AUTH_PREFIX, USERS_PREFIX};
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::RequestBody;
use crate::token::TokenStore;
use crate::transport::Transport;
use crate::types::{AuthSession, LoginRequest, OAuthUrl, RegisterRequest, UserProfile};

/// Clears the credential when dropped, so logout cleans up on every exit
/// path, including a cancelled future.
struct ClearOnDrop<'a>(&'a TokenStore);

impl Drop for ClearOnDrop<'_> {
    fn drop(&mut self) {
        self.0.clear();
    }
}

impl<T: Transport> ApiClient<T> {
    /// `POST /auth/login`; stores the returned `access_token`.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthSession, ApiError> {
        let body = RequestBody::json(credentials)?;
        let session: AuthSession = self
            .post(&format!("{AUTH_PREFIX}/login"), Some(body))
            .await?
            .into_typed()?;
        self.store_session(&session);
        Ok(session)
    }

    /// `POST /auth/register`; stores the returned `access_token`.
    pub async fn register(&self, account: &RegisterRequest) -> Result<AuthSession, ApiError> {
        let body = RequestBody::json(account)?;
        let session: AuthSession = self
            .post(&format!("{AUTH_PREFIX}/register"), Some(body))
            .await?
            .into_typed()?;
        self.store_session(&session);
        Ok(session)
    }

    /// `POST /auth/logout`. The local credential is cleared whatever the
    /// server answers.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let _clear = ClearOnDrop(self.tokens());
        self.post(&format!("{AUTH_PREFIX}/logout"), None).await?;
        info!("logged out");
        Ok(())
    }

    /// `GET /auth/google/url`: where to send the browser for Google consent.
    pub async fn google_auth_url(&self, state: Option<&str>) -> Result<String, ApiError> {
        let params: Vec<(&str, &str)> = state.map(|s| ("state", s)).into_iter().collect();
        let url: OAuthUrl = self
            .get(&format!("{AUTH_PREFIX}/google/url"), params)
            .await?
            .into_typed()?;
        Ok(url.auth_url)
    }

    /// `GET /users/me`.
    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        self.get(&format!("{USERS_PREFIX}/me"), Vec::<(&str, &str)>::new())
            .await?
            .into_typed()
    }

    fn store_session(&self, session: &AuthSession) {
        if session.access_token.is_empty() {
            return;
        }
        self.tokens().set_token(&session.access_token);
        info!(user_id = session.user_id, "session established");
    }
}
