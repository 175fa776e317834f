//! Bearer token handling
//!
//! The token is issued by the backend and only read here. The client cannot
//! verify the signature, so only the `exp` claim is inspected to catch a dead
//! session before a request is sent.

use std::path::Path;

use chrono::Utc;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;

use crate::config::ApiConfig;
use crate::error::{AppError, AppResult};

/// Claims the client cares about
#[derive(Debug, Deserialize)]
struct SessionClaims {
    #[serde(default)]
    exp: Option<i64>,
    #[serde(default)]
    sub: Option<String>,
}

/// An authenticated session
#[derive(Clone)]
pub struct Session {
    token: String,
    subject: Option<String>,
    expires_at: Option<i64>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("subject", &self.subject)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Parse a bearer token, rejecting it if already expired
    pub fn from_token(token: impl Into<String>) -> AppResult<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(AppError::MissingToken);
        }

        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<SessionClaims>(&token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|e| AppError::InvalidToken(e.to_string()))?;

        let session = Self {
            token,
            subject: data.claims.sub,
            expires_at: data.claims.exp,
        };
        if session.is_expired() {
            return Err(AppError::TokenExpired);
        }
        Ok(session)
    }

    /// Load the token from configuration or the token file
    pub fn from_config(api: &ApiConfig) -> AppResult<Self> {
        if let Some(token) = api.token.as_deref().filter(|t| !t.trim().is_empty()) {
            return Self::from_token(token);
        }
        match &api.token_file {
            Some(path) => Self::from_file(path),
            None => Err(AppError::MissingToken),
        }
    }

    pub fn from_file(path: &Path) -> AppResult<Self> {
        let token = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::MissingToken
            } else {
                AppError::Storage(e)
            }
        })?;
        Self::from_token(token)
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|exp| exp <= Utc::now().timestamp())
            .unwrap_or(false)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }
}
