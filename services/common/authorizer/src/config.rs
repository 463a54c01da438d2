use std::env;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;

use crate::error::ConfigError;

const DEFAULT_LEEWAY_SECONDS: u32 = 0;
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime configuration for bearer token verification.
///
/// Built once at startup and shared read-only by every request.
#[derive(Debug, Clone)]
pub struct AuthorizerConfig {
    /// Identity provider domain, e.g. `tenant.example-idp.com`.
    pub issuer_domain: String,
    /// Audience every accepted token must carry.
    pub audience: String,
    /// Signature algorithms the verifier may accept.
    pub algorithms: Vec<Algorithm>,
    /// Allowable clock skew in seconds when validating exp/nbf.
    pub leeway_seconds: u32,
    /// Upper bound on a single JWKS request.
    pub fetch_timeout: Duration,
}

impl AuthorizerConfig {
    /// Construct config with RS256 only and no clock skew allowance.
    pub fn new(issuer_domain: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer_domain: issuer_domain.into(),
            audience: audience.into(),
            algorithms: vec![Algorithm::RS256],
            leeway_seconds: DEFAULT_LEEWAY_SECONDS,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Replace the allowed algorithm set. Duplicates are dropped, order kept.
    pub fn with_algorithms<I>(mut self, algorithms: I) -> Self
    where
        I: IntoIterator<Item = Algorithm>,
    {
        let mut unique = Vec::new();
        for algorithm in algorithms {
            if !unique.contains(&algorithm) {
                unique.push(algorithm);
            }
        }
        self.algorithms = unique;
        self
    }

    /// Allow `seconds` of clock skew on exp/nbf. Tokens past `exp` are rejected by default.
    pub fn with_leeway(mut self, seconds: u32) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Expected `iss` claim value.
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.issuer_domain)
    }

    /// Location of the provider's published signing keys.
    pub fn jwks_url(&self) -> String {
        format!("https://{}/.well-known/jwks.json", self.issuer_domain)
    }

    /// Load configuration from `AUTH_*` environment variables.
    ///
    /// `AUTH_ISSUER_DOMAIN` and `AUTH_AUDIENCE` are required. `AUTH_ALGORITHMS`
    /// (comma separated), `AUTH_LEEWAY_SECONDS` and `AUTH_JWKS_TIMEOUT_MS` are
    /// optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        let issuer_domain = required("AUTH_ISSUER_DOMAIN")?;
        let audience = required("AUTH_AUDIENCE")?;
        let mut config = Self::new(issuer_domain, audience);

        if let Ok(value) = env::var("AUTH_ALGORITHMS") {
            let algorithms = parse_algorithms(&value)?;
            config = config.with_algorithms(algorithms);
        }

        if let Ok(value) = env::var("AUTH_LEEWAY_SECONDS") {
            let leeway = value.trim().parse::<u32>().map_err(|_| ConfigError::Invalid {
                name: "AUTH_LEEWAY_SECONDS",
                value: value.clone(),
            })?;
            config = config.with_leeway(leeway);
        }

        if let Ok(value) = env::var("AUTH_JWKS_TIMEOUT_MS") {
            let millis = value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|millis| *millis > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    name: "AUTH_JWKS_TIMEOUT_MS",
                    value: value.clone(),
                })?;
            config = config.with_fetch_timeout(Duration::from_millis(millis));
        }

        Ok(config)
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parse_algorithms(raw: &str) -> Result<Vec<Algorithm>, ConfigError> {
    let algorithms = raw
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            Algorithm::from_str(item).map_err(|_| ConfigError::Invalid {
                name: "AUTH_ALGORITHMS",
                value: item.to_owned(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if algorithms.is_empty() {
        return Err(ConfigError::Invalid {
            name: "AUTH_ALGORITHMS",
            value: raw.to_owned(),
        });
    }
    Ok(algorithms)
}
