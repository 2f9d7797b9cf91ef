use platform_api::ApiError;
use platform_authn::AuthnError;
use platform_authz::AuthzError;
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use tracing::info;

pub type HrResult<T> = Result<T, HrError>;

#[derive(Debug, Error)]
pub enum HrError {
    #[error("{0}")]
    Unauthenticated(String),
    #[error(transparent)]
    Forbidden(#[from] AuthzError),
    #[error("Not found.")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error(transparent)]
    Credentials(#[from] AuthnError),
    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),
}

impl HrError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }
}

/// Maps a unique-constraint violation to a field error, passing anything else through.
pub(crate) fn unique_violation(err: DbErr, message: &str) -> HrError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => HrError::validation(message),
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
            HrError::validation("Referenced record does not exist.")
        }
        _ => HrError::Database(err),
    }
}

impl From<HrError> for ApiError {
    fn from(err: HrError) -> Self {
        match err {
            HrError::Unauthenticated(message) => ApiError::Unauthorized(message),
            HrError::Forbidden(denied) => {
                let AuthzError::Denied {
                    action, resource, ..
                } = &denied;
                info!(%action, %resource, "request denied by policy");
                ApiError::Forbidden(denied.to_string())
            }
            HrError::NotFound => ApiError::NotFound,
            HrError::Validation(message) => ApiError::InvalidInput(message),
            HrError::Credentials(AuthnError::InvalidToken | AuthnError::WrongTokenType) => {
                ApiError::unauthorized("Token is invalid or expired")
            }
            other => ApiError::internal(anyhow::Error::new(other)),
        }
    }
}
