use async_trait::async_trait;
use mailauth_common::AuthService;
use mailauth_domain::AuthResult;

/// Source of bearer tokens for mail requests.
///
/// Implementations refresh as needed; callers ask again per request.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> AuthResult<String>;
}

#[async_trait]
impl AccessTokenProvider for AuthService {
    async fn access_token(&self) -> AuthResult<String> {
        self.get_valid_access_token().await
    }
}

/// Fixed token, for scripts that already hold one.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl AccessTokenProvider for StaticToken {
    async fn access_token(&self) -> AuthResult<String> {
        Ok(self.0.clone())
    }
}
