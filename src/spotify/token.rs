//! Bearer tokens for the Spotify Web API.
//!
//! The token cache file uses the same JSON layout spotipy writes, so an
//! existing `.cache` file from a previous authorization keeps working.

use chrono::Utc;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Tokens expiring within this many seconds are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to read token cache {path:?}: {source}")]
    CacheRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed token cache {path:?}: {source}")]
    CacheFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write token cache {path:?}: {source}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Token cache has no refresh token, run `authorize` again")]
    NoRefreshToken,

    #[error("Token endpoint request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Token endpoint rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid redirect URL: {0}")]
    InvalidRedirect(String),

    #[error("Authorization state mismatch")]
    StateMismatch,

    #[error("Authorization was denied: {0}")]
    Denied(String),
}

/// Registered Spotify application credentials.
#[derive(Debug, Clone)]
pub struct OAuthApp {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scope: String,
}

/// Source of bearer tokens for API calls.
///
/// `access_token` must return a token that is valid at the time of the call,
/// refreshing it first when needed. `refresh` always obtains a new token.
pub trait TokenProvider {
    fn access_token(&self) -> Result<String, AuthError>;
    fn refresh(&self) -> Result<String, AuthError>;
}

impl<T: TokenProvider + ?Sized> TokenProvider for &T {
    fn access_token(&self) -> Result<String, AuthError> {
        (**self).access_token()
    }

    fn refresh(&self) -> Result<String, AuthError> {
        (**self).refresh()
    }
}

/// A fixed token, never refreshed.
pub struct StaticTokenProvider(pub String);

impl TokenProvider for StaticTokenProvider {
    fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.0.clone())
    }

    fn refresh(&self) -> Result<String, AuthError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
    /// Unix seconds.
    pub expires_at: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl CachedToken {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at - now < EXPIRY_MARGIN_SECS
    }

    fn from_response(
        response: TokenResponse,
        now: i64,
        previous_refresh_token: Option<String>,
    ) -> Self {
        Self {
            access_token: response.access_token,
            token_type: response.token_type,
            expires_in: response.expires_in,
            scope: response.scope,
            expires_at: now + response.expires_in,
            refresh_token: response.refresh_token.or(previous_refresh_token),
        }
    }

    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let content = fs::read_to_string(path).map_err(|source| AuthError::CacheRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| AuthError::CacheFormat {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), AuthError> {
        let write_err = |source| AuthError::CacheWrite {
            path: path.to_path_buf(),
            source,
        };
        let json = serde_json::to_string_pretty(self).map_err(|e| write_err(e.into()))?;
        fs::write(path, json).map_err(write_err)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    expires_in: i64,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Token provider backed by an on-disk cache file.
///
/// The cache is read lazily on first use, refreshed through the accounts
/// service when expired and written back after every refresh.
pub struct CachedTokenProvider {
    cache_path: PathBuf,
    app: OAuthApp,
    client: Client,
    token: RefCell<Option<CachedToken>>,
}

impl CachedTokenProvider {
    pub fn new(cache_path: impl Into<PathBuf>, app: OAuthApp) -> Result<Self, AuthError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            cache_path: cache_path.into(),
            app,
            client,
            token: RefCell::new(None),
        })
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    pub fn app(&self) -> &OAuthApp {
        &self.app
    }

    fn current(&self) -> Result<CachedToken, AuthError> {
        if let Some(token) = self.token.borrow().as_ref() {
            return Ok(token.clone());
        }
        let token = CachedToken::load(&self.cache_path)?;
        debug!("Loaded cached token from {:?}", self.cache_path);
        *self.token.borrow_mut() = Some(token.clone());
        Ok(token)
    }

    fn store(&self, token: CachedToken) -> Result<String, AuthError> {
        token.save(&self.cache_path)?;
        let access_token = token.access_token.clone();
        *self.token.borrow_mut() = Some(token);
        Ok(access_token)
    }

    fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let response = self
            .client
            .post(SPOTIFY_TOKEN_URL)
            .basic_auth(&self.app.client_id, Some(&self.app.client_secret))
            .form(form)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json()?)
    }

    /// Exchanges an authorization code for a token and writes the cache.
    pub fn exchange_code(&self, code: &str) -> Result<CachedToken, AuthError> {
        let response = self.request_token(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.app.redirect_uri),
        ])?;
        let token = CachedToken::from_response(response, Utc::now().timestamp(), None);
        self.store(token.clone())?;
        info!("Stored new token in {:?}", self.cache_path);
        Ok(token)
    }
}

impl TokenProvider for CachedTokenProvider {
    fn access_token(&self) -> Result<String, AuthError> {
        let token = self.current()?;
        if token.is_expired(Utc::now().timestamp()) {
            debug!("Cached token expired at {}, refreshing", token.expires_at);
            return self.refresh();
        }
        Ok(token.access_token)
    }

    fn refresh(&self) -> Result<String, AuthError> {
        let refresh_token = self
            .current()?
            .refresh_token
            .ok_or(AuthError::NoRefreshToken)?;

        let response = self.request_token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", &refresh_token),
        ])?;
        let token =
            CachedToken::from_response(response, Utc::now().timestamp(), Some(refresh_token));
        info!("Refreshed access token, valid until {}", token.expires_at);
        self.store(token)
    }
}
