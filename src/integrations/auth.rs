//! Access-token refresh for capability providers.
//!
//! Every refresher turns a long-lived credential into a short-lived access
//! token. Executors call [`TokenRefresher::refresh`] once per step.

use crate::types::{AppError, Result};
use crate::utils::toml_config::{AuthConfig, ClientAuthPlacement};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_GOOGLE_TOKEN_URL: &str = "https://api.llynx.ai/google/accessToken";

#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// A fixed bearer token.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenRefresher for StaticToken {
    async fn refresh(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Exchanges a Google refresh token through an API-key protected proxy.
pub struct GoogleProxyRefresher {
    client: reqwest::Client,
    token_url: String,
    api_key: String,
    refresh_token: String,
}

impl GoogleProxyRefresher {
    pub fn new(
        client: reqwest::Client,
        token_url: impl Into<String>,
        api_key: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            api_key: api_key.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

#[async_trait]
impl TokenRefresher for GoogleProxyRefresher {
    async fn refresh(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.token_url)
            .header("x-api-key", &self.api_key)
            .query(&[("app", "google"), ("refreshToken", self.refresh_token.as_str())])
            .send()
            .await
            .map_err(|e| AppError::Auth(format!("Google token request failed: {}", e)))?;

        read_token(response, "Google").await
    }
}

/// Where OAuth client credentials are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAuth {
    /// HTTP basic authentication header.
    Basic,
    /// `client_id`/`client_secret` form fields.
    Body,
}

impl From<ClientAuthPlacement> for ClientAuth {
    fn from(placement: ClientAuthPlacement) -> Self {
        match placement {
            ClientAuthPlacement::Basic => ClientAuth::Basic,
            ClientAuthPlacement::Body => ClientAuth::Body,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub placement: ClientAuth,
}

/// OAuth2 `refresh_token` grant against a token endpoint.
pub struct OAuthRefresher {
    client: reqwest::Client,
    token_url: String,
    refresh_token: String,
    credentials: Option<ClientCredentials>,
}

impl OAuthRefresher {
    pub fn new(
        client: reqwest::Client,
        token_url: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            refresh_token: refresh_token.into(),
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, credentials: ClientCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

#[async_trait]
impl TokenRefresher for OAuthRefresher {
    async fn refresh(&self) -> Result<String> {
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", self.refresh_token.as_str()),
        ];

        let mut request = self.client.post(&self.token_url);
        if let Some(credentials) = &self.credentials {
            match credentials.placement {
                ClientAuth::Basic => {
                    request = request
                        .basic_auth(&credentials.client_id, Some(&credentials.client_secret));
                }
                ClientAuth::Body => {
                    form.push(("client_id", credentials.client_id.as_str()));
                    form.push(("client_secret", credentials.client_secret.as_str()));
                }
            }
        }

        let response = request
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Auth(format!("Token request to {} failed: {}", self.token_url, e)))?;

        read_token(response, &self.token_url).await
    }
}

async fn read_token(response: reqwest::Response, source: &str) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Auth(format!(
            "Token refresh via {} returned {}: {}",
            source, status, body
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| AppError::Auth(format!("Malformed token response from {}: {}", source, e)))?;
    Ok(token.access_token)
}

/// Build the refresher described by a capability's `[auth]` table.
///
/// Secrets are read from the environment variables the config names.
pub fn refresher_from_config(
    auth: &AuthConfig,
    timeout: Duration,
) -> Result<Arc<dyn TokenRefresher>> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

    match auth {
        AuthConfig::Bearer { token_env } => Ok(Arc::new(StaticToken::new(env_secret(token_env)?))),
        AuthConfig::GoogleProxy {
            token_url,
            api_key_env,
            refresh_token_env,
        } => Ok(Arc::new(GoogleProxyRefresher::new(
            client,
            token_url.clone(),
            env_secret(api_key_env)?,
            env_secret(refresh_token_env)?,
        ))),
        AuthConfig::OauthRefresh {
            token_url,
            refresh_token_env,
            client_id_env,
            client_secret_env,
            client_auth,
        } => {
            let mut refresher =
                OAuthRefresher::new(client, token_url.clone(), env_secret(refresh_token_env)?);
            if let (Some(id_env), Some(secret_env)) = (client_id_env, client_secret_env) {
                refresher = refresher.with_credentials(ClientCredentials {
                    client_id: env_secret(id_env)?,
                    client_secret: env_secret(secret_env)?,
                    placement: (*client_auth).into(),
                });
            }
            Ok(Arc::new(refresher))
        }
    }
}

fn env_secret(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| {
        AppError::Configuration(format!("Environment variable '{}' is not set", name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token() {
        let token = StaticToken::new("abc");
        assert_eq!(token.refresh().await.unwrap(), "abc");
    }

    #[test]
    fn test_missing_secret_is_configuration_error() {
        let auth = AuthConfig::Bearer {
            token_env: "PLAN_DELEGATOR_TEST_UNSET_TOKEN".to_string(),
        };
        let err = match refresher_from_config(&auth, Duration::from_secs(5)) {
            Ok(_) => panic!("Expected error"),
            Err(e) => e,
        };
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn test_client_auth_from_placement() {
        assert_eq!(ClientAuth::from(ClientAuthPlacement::Basic), ClientAuth::Basic);
        assert_eq!(ClientAuth::from(ClientAuthPlacement::Body), ClientAuth::Body);
    }
}
