//! Bearer-token extractors.
//!
//! Session tokens are stateless: a token is accepted when its signature and
//! expiry check out, without a store lookup.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use salon_core::Role;

use crate::error::{AppError, set_sentry_user};
use crate::services::SessionClaims;
use crate::state::AppState;

/// Extractor that requires a valid session token of any role.
///
/// # Example
///
/// ```rust,ignore
/// async fn whoami(RequireSession(claims): RequireSession) -> String {
///     claims.id
/// }
/// ```
pub struct RequireSession(pub SessionClaims);

/// Extractor that requires a valid session token with the Admin role.
///
/// Rejects with 401 when the token is missing or invalid and 403 when the
/// token belongs to another role.
pub struct RequireAdmin(pub SessionClaims);

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized("You are not logged in! Please log in to get access.".to_string())
        })?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Malformed authorization header".to_string()))
}

impl FromRequestParts<AppState> for RequireSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.tokens().validate(token)?;

        tracing::Span::current().record("user", claims.id.as_str());
        set_sentry_user(&claims.id, claims.role.as_str());

        Ok(Self(claims))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let RequireSession(claims) = RequireSession::from_request_parts(parts, state).await?;

        if claims.role != Role::Admin {
            tracing::warn!(user = %claims.id, role = %claims.role, "Non-admin token on admin route");
            return Err(AppError::Forbidden(
                "You do not have permission to perform this action".to_string(),
            ));
        }

        Ok(Self(claims))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/admin/approvals");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_extracted() {
        let parts = parts(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&parts).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_missing_header_is_unauthorized() {
        assert!(matches!(bearer_token(&parts(None)), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_other_scheme_is_unauthorized() {
        assert!(matches!(
            bearer_token(&parts(Some("Basic Ym9iOnB3"))),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            bearer_token(&parts(Some("Bearer "))),
            Err(AppError::Unauthorized(_))
        ));
    }
}
