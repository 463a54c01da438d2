use std::future::Future;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use crate::claims::Claims;
use crate::config::AuthorizerConfig;
use crate::error::{AuthError, AuthResult};
use crate::extractors::extract_bearer;
use crate::verifier::TokenVerifier;

/// Entry point that guards protected operations behind bearer token checks.
#[derive(Clone)]
pub struct AuthorizationGate {
    verifier: TokenVerifier,
}

impl AuthorizationGate {
    /// Gate backed by the issuer's published JWKS.
    pub fn new(config: AuthorizerConfig) -> Self {
        Self::with_verifier(TokenVerifier::new(config))
    }

    pub fn with_verifier(verifier: TokenVerifier) -> Self {
        Self { verifier }
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Extract and verify the bearer token carried by `headers`.
    pub async fn authenticate(&self, headers: &HeaderMap) -> AuthResult<Claims> {
        let header = match headers.get(AUTHORIZATION) {
            Some(value) => Some(value.to_str().map_err(|_| {
                AuthError::MalformedHeader("Authorization header must be Bearer {token}")
            })?),
            None => None,
        };

        let token = extract_bearer(header)?;
        let result = self.verifier.verify(&token).await;
        if let Err(err) = &result {
            warn!(error = %err, code = err.reason_code(), "JWT verification failed");
        }
        result
    }

    /// Run `operation` with verified claims, or return the rejection without running it.
    pub async fn authorize<F, Fut, T>(&self, headers: &HeaderMap, operation: F) -> AuthResult<T>
    where
        F: FnOnce(Claims) -> Fut,
        Fut: Future<Output = T>,
    {
        let claims = self.authenticate(headers).await?;
        Ok(operation(claims).await)
    }
}

/// Axum middleware for `middleware::from_fn_with_state`.
///
/// Inserts the verified [`Claims`] into the request extensions before running
/// the inner handler. Rejected requests never reach the handler.
pub async fn require_bearer(
    State(gate): State<Arc<AuthorizationGate>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let claims = gate.authenticate(request.headers()).await?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwks::KeyDocument;
    use axum::http::HeaderValue;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn gate() -> AuthorizationGate {
        let config = AuthorizerConfig::new("tenant.example-idp.com", "api://orders");
        AuthorizationGate::with_verifier(TokenVerifier::with_key_source(
            config,
            KeyDocument::default(),
        ))
    }

    #[tokio::test]
    async fn operation_not_invoked_without_header() {
        let calls = AtomicUsize::new(0);
        let result = gate()
            .authorize(&HeaderMap::new(), |_claims| async {
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert!(matches!(result, Err(AuthError::MissingHeader)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn operation_not_invoked_for_unknown_key() {
        let calls = AtomicUsize::new(0);
        let mut headers = HeaderMap::new();
        // {"alg":"RS256","kid":"unknown"}.{}.signature
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_static(
                "Bearer eyJhbGciOiJSUzI1NiIsImtpZCI6InVua25vd24ifQ.e30.c2lnbmF0dXJl",
            ),
        );

        let result = gate()
            .authorize(&headers, |_claims| async {
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert!(matches!(result, Err(AuthError::KeyNotFound(kid)) if kid == "unknown"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_ascii_header_is_malformed() {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xfftoken").expect("opaque header value"),
        );

        let err = gate().authenticate(&headers).await.expect_err("not visible ASCII");
        assert!(matches!(err, AuthError::MalformedHeader(_)));
    }
}
