use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time;

use crate::config::GoogleSheetsSettings;
use crate::errors::error_chain_fmt;

pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const GOOGLE_TOKEN_AUDIENCE: &str = "https://oauth2.googleapis.com/token";
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Lifetime Google grants to the access token minted from an assertion.
pub const ASSERTION_LIFETIME_SECS: i64 = 3600;

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);

#[derive(thiserror::Error)]
pub enum GoogleAuthError {
    #[error("Google Sheets credentials are not configured.")]
    ConfigurationError,
    #[error("The service account private key is not a valid RSA key.")]
    InvalidPrivateKey(#[source] jsonwebtoken::errors::Error),
    #[error("Failed to sign the service account assertion.")]
    SigningError(#[source] jsonwebtoken::errors::Error),
    #[error("Unable to fetch Google access token.")]
    TokenExchangeError(#[source] reqwest::Error),
}

impl std::fmt::Debug for GoogleAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Claims Google expects in a JWT-bearer grant assertion.
#[derive(Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Service account identity, loaded from configuration for a single request.
pub struct ServiceAccount {
    client_email: String,
    private_key: Secret<String>,
}

impl ServiceAccount {
    pub fn new(
        client_email: Option<&str>,
        private_key: Option<&Secret<String>>,
    ) -> Result<ServiceAccount, GoogleAuthError> {
        let client_email = client_email
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .ok_or(GoogleAuthError::ConfigurationError)?;
        let private_key = private_key
            .map(|key| key.expose_secret())
            .filter(|key| !key.trim().is_empty())
            .ok_or(GoogleAuthError::ConfigurationError)?;

        Ok(ServiceAccount {
            client_email: String::from(client_email),
            // Keys pasted into env files usually carry escaped newlines
            private_key: Secret::new(private_key.replace("\\n", "\n")),
        })
    }

    pub fn from_settings(
        settings: &GoogleSheetsSettings,
    ) -> Result<ServiceAccount, GoogleAuthError> {
        Self::new(
            settings.client_email.as_deref(),
            settings.private_key.as_ref(),
        )
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    pub fn claims(&self, now: DateTime<Utc>) -> AssertionClaims {
        AssertionClaims {
            iss: self.client_email.clone(),
            scope: String::from(SPREADSHEETS_SCOPE),
            aud: String::from(GOOGLE_TOKEN_AUDIENCE),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
        }
    }

    /// Builds the RS256 signed assertion `header.claims.signature`.
    pub fn sign_assertion(&self, now: DateTime<Utc>) -> Result<String, GoogleAuthError> {
        let key = EncodingKey::from_rsa_pem(self.private_key.expose_secret().as_bytes())
            .map_err(GoogleAuthError::InvalidPrivateKey)?;

        encode(&Header::new(Algorithm::RS256), &self.claims(now), &key)
            .map_err(GoogleAuthError::SigningError)
    }
}

/// Bearer token for the Sheets API. It is moved into the call that uses it.
#[derive(Debug)]
pub struct AccessToken(Secret<String>);

impl AccessToken {
    pub fn new(token: Secret<String>) -> AccessToken {
        AccessToken(token)
    }
}

impl ExposeSecret<String> for AccessToken {
    fn expose_secret(&self) -> &String {
        self.0.expose_secret()
    }
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: Secret<String>,
}

pub struct GoogleAuthClient {
    http_client: Client,
    token_url: String,
}

impl GoogleAuthClient {
    pub fn new(
        token_url: String,
        timeout: Option<time::Duration>,
    ) -> Result<GoogleAuthClient, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()?;

        Ok(GoogleAuthClient {
            http_client,
            token_url,
        })
    }

    #[tracing::instrument(
        name = "Fetch a Google access token",
        skip(self, service_account),
        fields(client_email = %service_account.client_email())
    )]
    pub async fn fetch_access_token(
        &self,
        service_account: &ServiceAccount,
        now: DateTime<Utc>,
    ) -> Result<AccessToken, GoogleAuthError> {
        let assertion = service_account.sign_assertion(now)?;

        self.exchange_assertion(&assertion).await
    }

    pub async fn exchange_assertion(
        &self,
        assertion: &str,
    ) -> Result<AccessToken, GoogleAuthError> {
        let form = [("grant_type", JWT_BEARER_GRANT_TYPE), ("assertion", assertion)];

        let response: TokenResponse = self
            .http_client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(GoogleAuthError::TokenExchangeError)?
            .json()
            .await
            .map_err(GoogleAuthError::TokenExchangeError)?;

        Ok(AccessToken::new(response.access_token))
    }
}
