use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::fs;
use uuid::Uuid;

use crate::config::JwtConfig;

/// Verifies RS256 access tokens issued by the identity service.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

/// Claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user key)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// JWT ID
    pub jti: String,
}

impl AccessTokenClaims {
    /// The subject as a user key.
    pub fn user_key(&self) -> Result<Uuid, uuid::Error> {
        Uuid::parse_str(&self.sub)
    }
}

impl JwtVerifier {
    /// Load the public key from the configured path.
    pub fn new(config: &JwtConfig) -> Result<Self, anyhow::Error> {
        let public_key_pem = fs::read_to_string(&config.public_key_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read public key from {}: {}",
                config.public_key_path,
                e
            )
        })?;

        let verifier = Self::from_rsa_pem(public_key_pem.as_bytes())?;
        tracing::info!("JWT verifier initialized with RS256 public key");
        Ok(verifier)
    }

    pub fn from_rsa_pem(public_key_pem: &[u8]) -> Result<Self, anyhow::Error> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem)
            .map_err(|e| anyhow::anyhow!("Failed to parse public key: {}", e))?;

        Ok(Self {
            decoding_key,
            validation: Validation::new(Algorithm::RS256),
        })
    }

    /// Validate signature and expiry and return the claims.
    pub fn validate_access_token(
        &self,
        token: &str,
    ) -> Result<AccessTokenClaims, jsonwebtoken::errors::Error> {
        decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TEST_PRIVATE_KEY: &str = include_str!("../../tests/fixtures/test_private_key.pem");
    const TEST_PUBLIC_KEY: &str = include_str!("../../tests/fixtures/test_public_key.pem");

    fn sign(sub: &str, expires_in: Duration) -> String {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: sub.to_string(),
            exp: (now + expires_in).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let key = EncodingKey::from_rsa_pem(TEST_PRIVATE_KEY.as_bytes()).unwrap();
        encode(&Header::new(Algorithm::RS256), &claims, &key).unwrap()
    }

    #[test]
    fn test_verifier_loads_key_from_file() -> Result<(), anyhow::Error> {
        let mut public_file = NamedTempFile::new()?;
        public_file.write_all(TEST_PUBLIC_KEY.as_bytes())?;

        let config = JwtConfig {
            public_key_path: public_file.path().to_str().unwrap().to_string(),
        };

        let verifier = JwtVerifier::new(&config)?;
        let user_key = Uuid::new_v4();
        let claims = verifier.validate_access_token(&sign(&user_key.to_string(), Duration::minutes(5)))?;
        assert_eq!(claims.user_key()?, user_key);

        Ok(())
    }

    #[test]
    fn test_missing_key_file_is_an_error() {
        let config = JwtConfig {
            public_key_path: "/nonexistent/public.pem".to_string(),
        };
        assert!(JwtVerifier::new(&config).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let verifier = JwtVerifier::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).unwrap();
        let token = sign(&Uuid::new_v4().to_string(), Duration::minutes(-10));
        assert!(verifier.validate_access_token(&token).is_err());
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let verifier = JwtVerifier::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).unwrap();
        let mut token = sign(&Uuid::new_v4().to_string(), Duration::minutes(5));
        token.push('x');
        assert!(verifier.validate_access_token(&token).is_err());
    }
}
