//! Provides the credentials used to access the shared drive folder.
//!
//! The token obtained through the OAuth consent flow is persisted to disk and reused across runs.
//! When it expires, it's refreshed with the stored refresh token and written back, so the consent
//! flow only has to be completed once.

use anyhow::{anyhow, Context};
use chrono::{DateTime, Duration, Utc};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::AuthError;

/// The scopes requested during the consent flow.
pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/drive.metadata.readonly",
    "https://www.googleapis.com/auth/drive.readonly",
];

/// The endpoint used to refresh tokens when the client secret file does not name one.
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens that expire within this many seconds are refreshed ahead of time.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// A source of bearer tokens for authenticated requests.
pub trait CredentialProvider {
    /// Returns a valid access token, refreshing it if needed.
    fn bearer_token(&mut self) -> Result<String, AuthError>;
}

/// The token persisted between runs.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct StoredToken {
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: Option<String>,

    /// When the access token stops being valid. Tokens without an expiry are assumed valid.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// Returns whether the token has expired or is about to at the given time.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            None => false,
            Some(expires_at) => expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) <= now,
        }
    }
}

/// The client secret file of an installed OAuth application.
#[derive(Debug, Deserialize)]
struct ClientSecrets {
    installed: ClientInfo,
}

#[derive(Debug, Deserialize)]
struct ClientInfo {
    client_id: String,
    client_secret: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The response of the token endpoint to a refresh request.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Credentials backed by a token file and a client secret file.
pub struct StoredCredentials {
    token_path: PathBuf,
    secrets_path: PathBuf,
    http: Client,
    token: Option<StoredToken>,
}

impl StoredCredentials {
    /// Creates a provider that reads the token at `token_path` and refreshes it using the client
    /// secret at `secrets_path`. Nothing is read until the first token is requested.
    pub fn new(token_path: &Path, secrets_path: &Path, http: Client) -> Self {
        Self {
            token_path: token_path.to_path_buf(),
            secrets_path: secrets_path.to_path_buf(),
            http,
            token: None,
        }
    }

    /// Loads the persisted token.
    pub fn load(&mut self) -> Result<(), AuthError> {
        let path = self.token_path.display().to_string();
        if !self.token_path.exists() {
            return Err(AuthError::MissingToken(path));
        }
        let token = fs::read_to_string(&self.token_path)
            .map_err(anyhow::Error::from)
            .and_then(|contents| Ok(serde_json::from_str::<StoredToken>(&contents)?))
            .map_err(|e| AuthError::ReadCredentials(path, e))?;
        self.token = Some(token);
        Ok(())
    }

    /// Reads the client secret file.
    fn client_info(&self) -> Result<ClientInfo, AuthError> {
        let path = self.secrets_path.display().to_string();
        fs::read_to_string(&self.secrets_path)
            .map_err(anyhow::Error::from)
            .and_then(|contents| Ok(serde_json::from_str::<ClientSecrets>(&contents)?.installed))
            .map_err(|e| AuthError::ReadCredentials(path, e))
    }

    /// Exchanges the refresh token for a new access token.
    pub fn refresh(&mut self) -> Result<(), AuthError> {
        let refresh_token = self
            .token
            .as_ref()
            .and_then(|token| token.refresh_token.clone())
            .ok_or_else(|| AuthError::Refresh(anyhow!("the stored token has no refresh token")))?;
        let client = self.client_info()?;

        tracing::info!("Refreshing the drive access token");
        let response = self
            .http
            .post(&client.token_uri)
            .form(&[
                ("client_id", client.client_id.as_str()),
                ("client_secret", client.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json::<RefreshResponse>())
            .map_err(|e| AuthError::Refresh(e.into()))?;

        self.token = Some(StoredToken {
            access_token: response.access_token,
            // The endpoint only returns a new refresh token when it rotates the old one.
            refresh_token: response.refresh_token.or(Some(refresh_token)),
            expires_at: Some(Utc::now() + Duration::seconds(response.expires_in)),
        });
        Ok(())
    }

    /// Writes the current token back to disk.
    pub fn persist(&self) -> Result<(), AuthError> {
        let path = self.token_path.display().to_string();
        let Some(token) = self.token.as_ref() else {
            return Err(AuthError::MissingToken(path));
        };
        let write = || -> anyhow::Result<()> {
            if let Some(parent) = self.token_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(token)?;
            fs::write(&self.token_path, contents).context("cannot write token file")?;
            Ok(())
        };
        write().map_err(|e| AuthError::Persist(path, e))
    }
}

impl CredentialProvider for StoredCredentials {
    fn bearer_token(&mut self) -> Result<String, AuthError> {
        if self.token.is_none() {
            self.load()?;
        }
        let expired = self
            .token
            .as_ref()
            .is_some_and(|token| token.is_expired(Utc::now()));
        if expired {
            self.refresh()?;
            self.persist()?;
        }
        self.token
            .as_ref()
            .map(|token| token.access_token.clone())
            .ok_or_else(|| AuthError::MissingToken(self.token_path.display().to_string()))
    }
}
