use std::collections::HashSet;
use std::sync::Arc;

use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde_json::{Map, Value};
use tracing::debug;

use crate::claims::Claims;
use crate::config::AuthorizerConfig;
use crate::error::{AuthError, AuthResult};
use crate::jwks::{JwksFetcher, KeySource, SigningKey};

/// Token header fields read before the signature is checked.
///
/// Used to pick a key and for log context only. Never consulted when choosing
/// which algorithms to accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnverifiedHeader {
    pub key_id: String,
    pub algorithm: Algorithm,
}

impl UnverifiedHeader {
    pub fn peek(token: &str) -> AuthResult<Self> {
        if token.split('.').count() != 3 {
            return Err(AuthError::MalformedToken(
                "expected three dot-separated segments".to_string(),
            ));
        }

        let header =
            decode_header(token).map_err(|err| AuthError::MalformedToken(err.to_string()))?;
        let key_id = header
            .kid
            .filter(|kid| !kid.is_empty())
            .ok_or_else(|| AuthError::MalformedToken("token missing kid header".to_string()))?;

        Ok(Self {
            key_id,
            algorithm: header.alg,
        })
    }
}

#[derive(Clone)]
pub struct TokenVerifier {
    config: Arc<AuthorizerConfig>,
    keys: Arc<dyn KeySource>,
}

impl TokenVerifier {
    /// Verifier that fetches the issuer's JWKS on every call.
    pub fn new(config: AuthorizerConfig) -> Self {
        let fetcher = JwksFetcher::for_config(&config);
        Self::with_key_source(config, fetcher)
    }

    pub fn with_key_source<K>(config: AuthorizerConfig, keys: K) -> Self
    where
        K: KeySource + 'static,
    {
        Self {
            config: Arc::new(config),
            keys: Arc::new(keys),
        }
    }

    pub fn config(&self) -> &AuthorizerConfig {
        &self.config
    }

    pub async fn verify(&self, token: &str) -> AuthResult<Claims> {
        let header = UnverifiedHeader::peek(token)?;
        let document = self.keys.key_document().await?;
        let key = document.find(&header.key_id)?;

        let validation = self.validation_for(key)?;
        let decoding_key = key.decoding_key()?;
        let token_data = decode::<Map<String, Value>>(token, &decoding_key, &validation)?;

        debug!(kid = %header.key_id, alg = ?header.algorithm, "verified JWT successfully");
        Ok(Claims::from_verified(token_data.claims))
    }

    fn validation_for(&self, key: &SigningKey) -> AuthResult<Validation> {
        let algorithms = key.verification_algorithms(&self.config.algorithms);
        let Some(first) = algorithms.first().copied() else {
            return Err(AuthError::SignatureInvalid(format!(
                "no allowed algorithm for JWKS key '{}' of type '{}'",
                key.key_id, key.key_type
            )));
        };

        let mut validation = Validation::new(first);
        validation.algorithms = algorithms;
        validation.set_issuer(&[self.config.issuer()]);
        validation.set_audience(&[self.config.audience.as_str()]);
        validation.required_spec_claims = ["exp", "aud", "iss"]
            .into_iter()
            .map(String::from)
            .collect::<HashSet<_>>();
        validation.validate_exp = true;
        validation.leeway = self.config.leeway_seconds.into();
        Ok(validation)
    }
}
