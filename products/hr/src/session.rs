use entity::employee;
use platform_authn::{
    TokenConfig, TokenKind, TokenPair, decode_token, issue_access, issue_pair, verify_password,
};
use platform_authz::Identity;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    employee::identity_of,
    error::{HrError, HrResult},
};

const NO_ACTIVE_ACCOUNT: &str = "No active account found with the given credentials";
const USER_INACTIVE: &str = "User is inactive or no longer exists";

#[derive(Clone, Debug, Serialize)]
pub struct AccessToken {
    pub access: String,
}

/// Exchanges credentials for bearer tokens and resolves tokens back to identities.
pub struct SessionService<'a> {
    db: &'a DatabaseConnection,
    tokens: &'a TokenConfig,
}

impl<'a> SessionService<'a> {
    pub fn new(db: &'a DatabaseConnection, tokens: &'a TokenConfig) -> Self {
        Self { db, tokens }
    }

    pub async fn obtain_pair(&self, username: &str, password: &str) -> HrResult<TokenPair> {
        let record = employee::Entity::find()
            .filter(employee::Column::Username.eq(username.trim()))
            .one(self.db)
            .await?;
        let Some(record) = record else {
            warn!(username = %username, "login for unknown username");
            return Err(HrError::unauthenticated(NO_ACTIVE_ACCOUNT));
        };
        if !record.is_active || !verify_password(password, &record.password_hash) {
            warn!(employee_id = %record.id, "login rejected");
            return Err(HrError::unauthenticated(NO_ACTIVE_ACCOUNT));
        }
        info!(employee_id = %record.id, "token pair issued");
        Ok(issue_pair(record.id, self.tokens)?)
    }

    pub async fn refresh(&self, refresh_token: &str) -> HrResult<AccessToken> {
        let claims = decode_token(refresh_token, TokenKind::Refresh, self.tokens)?;
        load_identity(self.db, claims.sub).await?;
        Ok(AccessToken {
            access: issue_access(claims.sub, self.tokens)?,
        })
    }

    /// Resolves a bearer access token to the identity of a current, active employee.
    pub async fn authenticate(&self, access_token: &str) -> HrResult<Identity> {
        let claims = decode_token(access_token, TokenKind::Access, self.tokens)?;
        load_identity(self.db, claims.sub).await
    }
}

pub async fn load_identity(db: &DatabaseConnection, employee_id: Uuid) -> HrResult<Identity> {
    let record = employee::Entity::find_by_id(employee_id)
        .one(db)
        .await?
        .filter(|record| record.is_active)
        .ok_or_else(|| HrError::unauthenticated(USER_INACTIVE))?;
    Ok(identity_of(&record))
}
