//! Platform authentication helpers.
//!
//! Credential storage (argon2 hashes plus locked markers) and the bearer
//! token pair handed out by the credential-exchange endpoint.

mod password;
mod token;

use thiserror::Error;

pub use password::{hash_password, is_usable, unusable_password, verify_password};
pub use token::{Claims, TokenConfig, TokenKind, TokenPair, decode_token, issue_access, issue_pair};

#[derive(Debug, Error)]
pub enum AuthnError {
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),
    #[error("token is invalid or expired")]
    InvalidToken,
    #[error("token has the wrong type")]
    WrongTokenType,
    #[error("token lifetime is out of range")]
    TtlOutOfRange,
}
