//! Extract the caller from an `Authorization: Bearer <token>` header.

use crate::auth::Caller;
use crate::error::{AppError, AuthError};
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

/// Required authentication; 401 when the header is missing or the token is invalid.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub Caller);

/// Optional authentication; an absent header yields `None`, a bad token is still 401.
#[derive(Clone, Debug)]
pub struct MaybeUser(pub Option<Caller>);

/// Admin role required; 401 without a token, 403 for other roles.
#[derive(Clone, Debug)]
pub struct AdminUser(pub Caller);

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AuthError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidToken("authorization header is not valid ASCII".into()))?;
    let mut split = value.splitn(2, ' ');
    let scheme = split.next().unwrap_or("");
    let token = split.next().map(str::trim).unwrap_or("");
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::InvalidToken("expected 'Bearer <token>'".into()));
    }
    Ok(Some(token))
}

fn caller_from_parts(parts: &Parts, state: &AppState) -> Result<Option<Caller>, AppError> {
    let Some(token) = bearer_token(parts)? else {
        return Ok(None);
    };
    let claims = state.keys.verify(token).map_err(|e| {
        tracing::warn!(error = %e, "rejected bearer token");
        e
    })?;
    Ok(Some(Caller::from_claims(claims)?))
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(caller_from_parts(parts, state)?))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        caller_from_parts(parts, state)?
            .map(CurrentUser)
            .ok_or(AppError::Auth(AuthError::MissingCredentials))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(caller) = CurrentUser::from_request_parts(parts, state).await?;
        if !caller.is_admin() {
            return Err(AppError::Forbidden("admin role required".into()));
        }
        Ok(AdminUser(caller))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(auth: Option<&str>) -> Parts {
        let mut b = Request::builder().uri("/");
        if let Some(v) = auth {
            b = b.header(AUTHORIZATION, v);
        }
        b.body(()).unwrap().into_parts().0
    }

    #[test]
    fn no_header_is_anonymous() {
        assert_eq!(bearer_token(&parts(None)).unwrap(), None);
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token(&parts(Some("bearer abc.def.ghi"))).unwrap(), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&parts(Some("Bearer  abc"))).unwrap(), Some("abc"));
    }

    #[test]
    fn other_schemes_are_rejected() {
        assert!(bearer_token(&parts(Some("Basic dXNlcjpwYXNz"))).is_err());
        assert!(bearer_token(&parts(Some("Bearer"))).is_err());
    }
}
