use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::AuthorizerConfig;
use crate::error::{AuthError, AuthResult};

const RSA_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];

/// One published public key as it appears in a JWKS document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SigningKey {
    #[serde(rename = "kty")]
    pub key_type: String,
    #[serde(rename = "kid")]
    pub key_id: String,
    #[serde(rename = "use", default)]
    pub usage: Option<String>,
    #[serde(rename = "alg", default)]
    pub algorithm: Option<String>,
    #[serde(rename = "n", default)]
    pub modulus: Option<String>,
    #[serde(rename = "e", default)]
    pub exponent: Option<String>,
}

impl SigningKey {
    /// RSA signing key from base64url-encoded modulus and exponent.
    pub fn rsa(
        key_id: impl Into<String>,
        modulus: impl Into<String>,
        exponent: impl Into<String>,
    ) -> Self {
        Self {
            key_type: "RSA".to_string(),
            key_id: key_id.into(),
            usage: Some("sig".to_string()),
            algorithm: None,
            modulus: Some(modulus.into()),
            exponent: Some(exponent.into()),
        }
    }

    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = Some(algorithm.into());
        self
    }

    fn is_rsa(&self) -> bool {
        self.key_type == "RSA"
    }

    /// The subset of `allowed` this key can verify.
    ///
    /// Depends only on configuration and the published key, never on the token.
    pub fn verification_algorithms(&self, allowed: &[Algorithm]) -> Vec<Algorithm> {
        if !self.is_rsa() {
            return Vec::new();
        }
        if self.usage.as_deref().is_some_and(|usage| usage != "sig") {
            return Vec::new();
        }

        let pinned = match self.algorithm.as_deref() {
            Some(name) => match name.parse::<Algorithm>() {
                Ok(algorithm) => Some(algorithm),
                Err(_) => return Vec::new(),
            },
            None => None,
        };

        allowed
            .iter()
            .copied()
            .filter(|algorithm| RSA_ALGORITHMS.contains(algorithm))
            .filter(|algorithm| pinned.map_or(true, |pinned| pinned == *algorithm))
            .collect()
    }

    pub fn decoding_key(&self) -> AuthResult<DecodingKey> {
        let (Some(modulus), Some(exponent)) = (&self.modulus, &self.exponent) else {
            return Err(AuthError::KeyFetch(format!(
                "JWKS key '{}' missing RSA components",
                self.key_id
            )));
        };
        DecodingKey::from_rsa_components(modulus, exponent).map_err(|err| {
            AuthError::KeyFetch(format!("JWKS key '{}' unusable: {err}", self.key_id))
        })
    }

    fn validate(&self) -> AuthResult<()> {
        if self.key_id.trim().is_empty() {
            return Err(AuthError::KeyFetch("JWKS entry has empty kid".to_string()));
        }
        if self.is_rsa() && (self.modulus.is_none() || self.exponent.is_none()) {
            return Err(AuthError::KeyFetch(format!(
                "JWKS key '{}' missing RSA components",
                self.key_id
            )));
        }
        Ok(())
    }
}

/// A provider's published key set, fetched fresh for every verification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct KeyDocument {
    keys: Vec<SigningKey>,
}

impl KeyDocument {
    pub fn new(keys: Vec<SigningKey>) -> Self {
        Self { keys }
    }

    /// Structural checks on every entry; one bad entry rejects the document.
    pub(crate) fn validate(&self) -> AuthResult<()> {
        self.keys.iter().try_for_each(SigningKey::validate)
    }

    pub fn keys(&self) -> &[SigningKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// First key whose `kid` equals `key_id`.
    pub fn find(&self, key_id: &str) -> AuthResult<&SigningKey> {
        self.keys
            .iter()
            .find(|key| key.key_id == key_id)
            .ok_or_else(|| AuthError::KeyNotFound(key_id.to_string()))
    }
}

/// Where the verifier obtains the key document for each verification.
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn key_document(&self) -> AuthResult<KeyDocument>;
}

/// A fixed document, for tests and local development.
#[async_trait]
impl KeySource for KeyDocument {
    async fn key_document(&self) -> AuthResult<KeyDocument> {
        Ok(self.clone())
    }
}

#[derive(Debug, Clone)]
pub struct JwksFetcher {
    client: Client,
    url: String,
    timeout: Duration,
}

impl JwksFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), url)
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            timeout: Duration::from_secs(5),
        }
    }

    /// Fetcher for `https://{issuer_domain}/.well-known/jwks.json`.
    pub fn for_config(config: &AuthorizerConfig) -> Self {
        Self::new(config.jwks_url()).with_timeout(config.fetch_timeout)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self) -> AuthResult<KeyDocument> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| AuthError::KeyFetch(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::KeyFetch(format!(
                "HTTP {} from {}",
                response.status(),
                self.url
            )));
        }

        let document = response
            .json::<KeyDocument>()
            .await
            .map_err(|err| AuthError::KeyFetch(format!("invalid JWKS body: {err}")))?;
        document.validate()?;
        debug!(jwks_url = %self.url, keys = document.len(), "fetched JWKS");
        Ok(document)
    }
}

#[async_trait]
impl KeySource for JwksFetcher {
    async fn key_document(&self) -> AuthResult<KeyDocument> {
        self.fetch().await
    }
}
