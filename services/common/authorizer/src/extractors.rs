use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;

use crate::claims::Claims;
use crate::error::{AuthError, AuthResult};
use crate::gate::AuthorizationGate;

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn extract_bearer(header: Option<&str>) -> AuthResult<String> {
    let raw = header
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(AuthError::MissingHeader)?;

    let mut parts = raw.split_whitespace();
    let scheme = parts.next().ok_or(AuthError::MissingHeader)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedHeader(
            "Authorization header must start with Bearer",
        ));
    }

    let token = parts.next().ok_or(AuthError::MalformedHeader(
        "No JWT token found in the Authorization header",
    ))?;
    if parts.next().is_some() {
        return Err(AuthError::MalformedHeader(
            "Authorization header must be Bearer {token}",
        ));
    }

    Ok(token.to_owned())
}

/// Verified claims for the current request.
///
/// Reuses the claims left by [`require_bearer`](crate::gate::require_bearer)
/// when that middleware ran, otherwise verifies the request itself.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claims: Claims,
}

impl AuthContext {
    pub fn subject(&self) -> Option<&str> {
        self.claims.subject()
    }

    pub fn into_claims(self) -> Claims {
        self.claims
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    Arc<AuthorizationGate>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(claims) = parts.extensions.get::<Claims>() {
            return Ok(Self {
                claims: claims.clone(),
            });
        }

        let gate = Arc::<AuthorizationGate>::from_ref(state);
        let claims = gate.authenticate(&parts.headers).await?;
        Ok(Self { claims })
    }
}
