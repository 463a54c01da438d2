pub mod claims;
pub mod config;
pub mod error;
pub mod extractors;
pub mod gate;
pub mod jwks;
pub mod verifier;

pub use claims::Claims;
pub use config::AuthorizerConfig;
pub use error::{AuthError, AuthResult, ConfigError};
pub use extractors::{extract_bearer, AuthContext};
pub use gate::{require_bearer, AuthorizationGate};
pub use jwks::{JwksFetcher, KeyDocument, KeySource, SigningKey};
pub use verifier::{TokenVerifier, UnverifiedHeader};
