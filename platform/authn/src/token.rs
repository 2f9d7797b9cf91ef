use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AuthnError;

#[derive(Clone)]
pub struct TokenConfig {
    secret: Vec<u8>,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

impl TokenConfig {
    pub fn new(
        secret: impl Into<Vec<u8>>,
        access_ttl_minutes: i64,
        refresh_ttl_minutes: i64,
    ) -> Self {
        Self {
            secret: secret.into(),
            access_ttl_minutes,
            refresh_ttl_minutes,
        }
    }

    fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(&self.secret)
    }

    fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(&self.secret)
    }

    fn ttl_minutes(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_ttl_minutes,
            TokenKind::Refresh => self.refresh_ttl_minutes,
        }
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("access_ttl_minutes", &self.access_ttl_minutes)
            .field("refresh_ttl_minutes", &self.refresh_ttl_minutes)
            .finish()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub token_type: TokenKind,
    pub jti: Uuid,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

fn issue(subject: Uuid, kind: TokenKind, config: &TokenConfig) -> Result<String, AuthnError> {
    let now = Utc::now();
    let exp = Duration::try_minutes(config.ttl_minutes(kind))
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or(AuthnError::TtlOutOfRange)?
        .timestamp()
        .max(0) as usize;
    let claims = Claims {
        sub: subject,
        token_type: kind,
        jti: Uuid::new_v4(),
        exp,
        iat: now.timestamp().max(0) as usize,
    };
    jsonwebtoken::encode(&Header::default(), &claims, &config.encoding_key())
        .map_err(AuthnError::Signing)
}

pub fn issue_pair(subject: Uuid, config: &TokenConfig) -> Result<TokenPair, AuthnError> {
    Ok(TokenPair {
        access: issue(subject, TokenKind::Access, config)?,
        refresh: issue(subject, TokenKind::Refresh, config)?,
    })
}

pub fn issue_access(subject: Uuid, config: &TokenConfig) -> Result<String, AuthnError> {
    issue(subject, TokenKind::Access, config)
}

/// Validate signature and expiry, then require the expected token type.
pub fn decode_token(
    token: &str,
    expected: TokenKind,
    config: &TokenConfig,
) -> Result<Claims, AuthnError> {
    let claims = jsonwebtoken::decode::<Claims>(token, &config.decoding_key(), &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| AuthnError::InvalidToken)?;
    if claims.token_type != expected {
        return Err(AuthnError::WrongTokenType);
    }
    Ok(claims)
}
