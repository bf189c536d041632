//! Wire types exchanged with the backend.
//!
//! Field names follow the backend's JSON exactly.

use serde::{Deserialize, Serialize};

use erpdesk_auth::Credentials;

/// Body of `POST /login/`.
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Response of `POST /login/`.
#[derive(Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl From<TokenPair> for Credentials {
    fn from(pair: TokenPair) -> Self {
        Credentials::new(pair.access, pair.refresh)
    }
}

/// Body of `POST /token/refresh/` and `POST /logout/`.
#[derive(Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// Response of `POST /token/refresh/`.
#[derive(Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}

/// DRF error body (`{"detail": "..."}`).
#[derive(Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: String,
}
