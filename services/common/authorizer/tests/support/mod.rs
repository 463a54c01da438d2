#![allow(dead_code)]

use std::sync::OnceLock;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use common_authorizer::{AuthorizerConfig, KeyDocument, SigningKey};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde_json::{json, Value};

pub const ISSUER_DOMAIN: &str = "tenant.example-idp.com";
pub const ISSUER: &str = "https://tenant.example-idp.com/";
pub const AUDIENCE: &str = "api://orders";
pub const KID: &str = "signing-key-1";
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

pub struct KeyMaterial {
    pub private_pem: String,
    pub modulus: String,
    pub exponent: String,
}

/// One RSA key pair per test binary; generation dominates test time otherwise.
pub fn key_material() -> &'static KeyMaterial {
    static MATERIAL: OnceLock<KeyMaterial> = OnceLock::new();
    MATERIAL.get_or_init(|| {
        let mut rng = OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation");
        let public_key = private_key.to_public_key();
        let private_pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .expect("private pem")
            .to_string();

        KeyMaterial {
            private_pem,
            modulus: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
            exponent: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
        }
    })
}

pub fn config() -> AuthorizerConfig {
    AuthorizerConfig::new(ISSUER_DOMAIN, AUDIENCE)
}

pub fn signing_key() -> SigningKey {
    let material = key_material();
    SigningKey::rsa(KID, material.modulus.clone(), material.exponent.clone())
}

pub fn key_document() -> KeyDocument {
    KeyDocument::new(vec![signing_key()])
}

pub fn jwks_body() -> Value {
    let material = key_material();
    json!({
        "keys": [
            {
                "kty": "RSA",
                "kid": KID,
                "use": "sig",
                "n": material.modulus,
                "e": material.exponent
            }
        ]
    })
}

pub fn now() -> i64 {
    Utc::now().timestamp()
}

pub fn valid_claims() -> Value {
    let issued_at = now();
    json!({
        "sub": "user-123",
        "aud": AUDIENCE,
        "iss": ISSUER,
        "iat": issued_at,
        "exp": issued_at + 600
    })
}

pub fn sign(claims: &Value) -> String {
    sign_with_kid(claims, KID)
}

pub fn sign_with_kid(claims: &Value, kid: &str) -> String {
    let encoding = EncodingKey::from_rsa_pem(key_material().private_pem.as_bytes())
        .expect("encoding key");
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    encode(&header, claims, &encoding).expect("sign token")
}

/// Base64url segment for hand-built tokens.
pub fn segment(value: &Value) -> String {
    URL_SAFE_NO_PAD.encode(value.to_string())
}
