use crate::client::{ApiClient, ApiError};

use super::models::{TokenResponse, User, UserCreate, UserLogin, UserStats, UserUpdate};

impl ApiClient {
    async fn authenticate<B: serde::Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<TokenResponse, ApiError> {
        let tokens: TokenResponse = self.post_anonymous(endpoint, body).await?;
        self.store_tokens(&tokens);
        Ok(tokens)
    }

    pub async fn register(&self, data: &UserCreate) -> Result<TokenResponse, ApiError> {
        self.authenticate("/auth/register", data).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, ApiError> {
        let body = UserLogin {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.authenticate("/auth/login", &body).await
    }

    /// Drop the local credentials. The server is told first when we
    /// still hold a token but its answer doesn't matter.
    pub async fn logout(&self) {
        if self.has_token()
            && let Err(e) = self
                .post::<_, serde_json::Value>("/auth/logout", &serde_json::json!({}))
                .await
        {
            tracing::debug!("Server logout failed, clearing tokens anyway: {}", e);
        }
        self.clear_tokens();
    }

    pub async fn get_me(&self) -> Result<User, ApiError> {
        self.get("/auth/me").await
    }

    pub async fn update_me(&self, data: &UserUpdate) -> Result<User, ApiError> {
        self.patch("/auth/me", data).await
    }

    pub async fn get_my_stats(&self) -> Result<UserStats, ApiError> {
        self.get("/auth/me/stats").await
    }
}
