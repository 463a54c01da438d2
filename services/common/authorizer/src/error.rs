use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use jsonwebtoken::errors::ErrorKind;
use serde::Serialize;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Reasons a request is refused by the authorization gate.
///
/// The `Display` text carries internal detail for logs. Callers only ever see
/// [`AuthError::public_message`].
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization header missing")]
    MissingHeader,
    #[error("authorization header malformed: {0}")]
    MalformedHeader(&'static str),
    #[error("token malformed: {0}")]
    MalformedToken(String),
    #[error("failed to fetch JWKS: {0}")]
    KeyFetch(String),
    #[error("no signing key published for kid '{0}'")]
    KeyNotFound(String),
    #[error("token signature rejected: {0}")]
    SignatureInvalid(String),
    #[error("token expired")]
    TokenExpired,
    #[error("invalid claims: {0}")]
    InvalidClaims(String),
}

impl AuthError {
    /// Stable machine-readable code, also sent as `X-Error-Code`.
    pub fn reason_code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "missing_header",
            AuthError::MalformedHeader(_) => "malformed_header",
            AuthError::MalformedToken(_) => "malformed_token",
            AuthError::KeyFetch(_) => "key_fetch_error",
            AuthError::KeyNotFound(_) => "key_not_found",
            AuthError::SignatureInvalid(_) => "signature_invalid",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidClaims(_) => "invalid_claims",
        }
    }

    /// Human-readable reason safe to return to the caller.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "Authorization header is missing",
            AuthError::MalformedHeader(reason) => *reason,
            AuthError::MalformedToken(_) => "Invalid header, unable to parse JWT token",
            AuthError::KeyFetch(_) | AuthError::KeyNotFound(_) => {
                "Could not verify token due to missing public keys"
            }
            AuthError::SignatureInvalid(_) => "Token signature is invalid",
            AuthError::TokenExpired => "Token is expired",
            AuthError::InvalidClaims(_) => "Invalid claims",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        match value.kind() {
            ErrorKind::ExpiredSignature => Self::TokenExpired,
            ErrorKind::InvalidAudience
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidSubject
            | ErrorKind::ImmatureSignature
            | ErrorKind::MissingRequiredClaim(_) => Self::InvalidClaims(value.to_string()),
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::MissingAlgorithm
            | ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidKeyFormat => Self::SignatureInvalid(value.to_string()),
            _ => Self::MalformedToken(value.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let code = self.reason_code();
        let challenge = match self {
            AuthError::MissingHeader => "Bearer",
            _ => "Bearer error=\"invalid_token\"",
        };

        let body = ErrorBody {
            code,
            message: self.public_message(),
        };
        let mut response = (StatusCode::UNAUTHORIZED, Json(body)).into_response();
        let headers = response.headers_mut();
        headers.insert(WWW_AUTHENTICATE, HeaderValue::from_static(challenge));
        headers.insert("X-Error-Code", HeaderValue::from_static(code));
        response
    }
}

/// Problems building an [`AuthorizerConfig`](crate::AuthorizerConfig) from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value '{value}' for {name}")]
    Invalid { name: &'static str, value: String },
}
