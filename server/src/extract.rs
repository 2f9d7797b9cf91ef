use axum::{
    extract::{FromRequest, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use platform_api::ApiError;
use platform_authz::Identity;

use crate::http::AppState;

/// JSON body whose rejections render as `400 INVALID_INPUT`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string whose rejections render as `400 INVALID_INPUT`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Path parameters; malformed ids answer `404`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// The employee behind the bearer token, re-loaded from the store on every request.
pub struct CurrentIdentity(pub Identity);

impl FromRequestParts<AppState> for CurrentIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers).ok_or_else(|| {
            ApiError::unauthorized("Authentication credentials were not provided.")
        })?;
        let identity = state
            .hr
            .sessions(&state.config.tokens)
            .authenticate(&token)
            .await?;
        Ok(Self(identity))
    }
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
