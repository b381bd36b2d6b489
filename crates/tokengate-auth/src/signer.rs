//! Token signing and signature verification.
//!
//! The signer is chosen once from configuration: [`Signer::Symmetric`] uses one
//! shared secret for both directions, [`Signer::Asymmetric`] signs with an RSA
//! private key and verifies with the public key. Request-time code never
//! branches on the algorithm name.
//!
//! Verification pins the configured algorithm exactly and checks the signature
//! only. Temporal validation (`exp`, refresh window) is left to the pipeline so
//! that it runs against the injected clock and can tell "expired" apart from
//! "invalid".

use std::fmt;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode};
use serde::Serialize;
use serde_json::{Map, Value};
use tokengate_config::{JwtConfig, KeyMaterial, SigningAlgorithm};
use tokengate_core::{AuthError, ConfigError};
use tracing::{debug, error};

#[derive(Clone)]
pub enum Signer {
    Symmetric {
        algorithm: Algorithm,
        encoding: EncodingKey,
        decoding: DecodingKey,
    },
    Asymmetric {
        algorithm: Algorithm,
        private_key: EncodingKey,
        public_key: DecodingKey,
    },
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symmetric { algorithm, .. } => f
                .debug_struct("Symmetric")
                .field("algorithm", algorithm)
                .finish_non_exhaustive(),
            Self::Asymmetric { algorithm, .. } => f
                .debug_struct("Asymmetric")
                .field("algorithm", algorithm)
                .finish_non_exhaustive(),
        }
    }
}

fn jwt_algorithm(algorithm: SigningAlgorithm) -> Algorithm {
    match algorithm {
        SigningAlgorithm::HS256 => Algorithm::HS256,
        SigningAlgorithm::HS384 => Algorithm::HS384,
        SigningAlgorithm::HS512 => Algorithm::HS512,
        SigningAlgorithm::RS256 => Algorithm::RS256,
        SigningAlgorithm::RS384 => Algorithm::RS384,
        SigningAlgorithm::RS512 => Algorithm::RS512,
    }
}

impl Signer {
    /// Builds the signer for the configured algorithm and key material.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidPrivateKey`] / [`ConfigError::InvalidPublicKey`] if the
    ///   PEM data cannot be parsed
    /// - [`ConfigError::MissingSecretKey`] / [`ConfigError::MissingKeyFiles`] if the key
    ///   material does not match the algorithm family
    pub fn from_config(config: &JwtConfig) -> Result<Self, ConfigError> {
        let algorithm = jwt_algorithm(config.algorithm);

        match (&config.key, config.algorithm.is_asymmetric()) {
            (KeyMaterial::Secret(secret), false) => Ok(Self::symmetric(algorithm, secret)),
            (
                KeyMaterial::RsaPem {
                    private_pem,
                    public_pem,
                },
                true,
            ) => Self::asymmetric(algorithm, private_pem, public_pem),
            (KeyMaterial::Secret(_), true) => {
                Err(ConfigError::MissingKeyFiles(config.algorithm.to_string()))
            }
            (KeyMaterial::RsaPem { .. }, false) => Err(ConfigError::MissingSecretKey),
        }
    }

    pub fn symmetric(algorithm: Algorithm, secret: &[u8]) -> Self {
        Self::Symmetric {
            algorithm,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn asymmetric(
        algorithm: Algorithm,
        private_pem: &[u8],
        public_pem: &[u8],
    ) -> Result<Self, ConfigError> {
        let private_key = EncodingKey::from_rsa_pem(private_pem)
            .map_err(|e| ConfigError::InvalidPrivateKey(e.to_string()))?;
        let public_key = DecodingKey::from_rsa_pem(public_pem)
            .map_err(|e| ConfigError::InvalidPublicKey(e.to_string()))?;

        Ok(Self::Asymmetric {
            algorithm,
            private_key,
            public_key,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            Self::Symmetric { algorithm, .. } | Self::Asymmetric { algorithm, .. } => *algorithm,
        }
    }

    fn encoding_key(&self) -> &EncodingKey {
        match self {
            Self::Symmetric { encoding, .. } => encoding,
            Self::Asymmetric { private_key, .. } => private_key,
        }
    }

    fn decoding_key(&self) -> &DecodingKey {
        match self {
            Self::Symmetric { decoding, .. } => decoding,
            Self::Asymmetric { public_key, .. } => public_key,
        }
    }

    /// Signs a claim payload into a compact token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::FailedTokenCreation`] if encoding fails.
    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, AuthError> {
        encode(&Header::new(self.algorithm()), claims, self.encoding_key()).map_err(|e| {
            error!(error = %e, "Failed to sign token");
            AuthError::FailedTokenCreation
        })
    }

    /// Verifies structure, algorithm and signature, returning the raw claim map.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidSigningAlgorithm`] if the header names another algorithm
    /// - [`AuthError::InvalidSignature`] if the signature does not match the key
    /// - [`AuthError::MalformedToken`] for anything that is not a decodable token
    pub fn verify(&self, token: &str) -> Result<Map<String, Value>, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::MalformedToken(e.to_string()))?;

        if header.alg != self.algorithm() {
            debug!(expected = ?self.algorithm(), actual = ?header.alg, "Rejected token algorithm");
            return Err(AuthError::InvalidSigningAlgorithm);
        }

        let mut validation = Validation::new(self.algorithm());
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        decode::<Map<String, Value>>(token, self.decoding_key(), &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::InvalidAlgorithm => AuthError::InvalidSigningAlgorithm,
                _ => AuthError::MalformedToken(e.to_string()),
            })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) const PRIVATE_PEM: &[u8] = include_bytes!("../fixtures/private.pem");
    pub(crate) const PUBLIC_PEM: &[u8] = include_bytes!("../fixtures/public.pem");
    const OTHER_PUBLIC_PEM: &[u8] = include_bytes!("../fixtures/other_public.pem");

    fn hs256() -> Signer {
        Signer::symmetric(Algorithm::HS256, b"test-secret-key-at-least-32-characters-long")
    }

    fn rs256() -> Signer {
        Signer::asymmetric(Algorithm::RS256, PRIVATE_PEM, PUBLIC_PEM).unwrap()
    }

    fn sample_claims() -> Value {
        json!({"identity": "admin", "count": 3, "ok": true, "exp": 4_000_000_000u64, "iat": 1_700_000_000})
    }

    #[test]
    fn test_symmetric_round_trip() {
        let signer = hs256();
        let token = signer.sign(&sample_claims()).unwrap();
        let claims = signer.verify(&token).unwrap();

        assert_eq!(claims["identity"], json!("admin"));
        assert_eq!(claims["count"], json!(3));
        assert_eq!(claims["ok"], json!(true));
        assert_eq!(claims["exp"], json!(4_000_000_000u64));
    }

    #[test]
    fn test_asymmetric_round_trip() {
        let signer = rs256();
        let token = signer.sign(&sample_claims()).unwrap();
        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims["identity"], json!("admin"));
    }

    #[test]
    fn test_verify_does_not_check_expiry() {
        let signer = hs256();
        let token = signer.sign(&json!({"exp": 1})).unwrap();
        assert!(signer.verify(&token).is_ok());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = hs256().sign(&sample_claims()).unwrap();
        let other = Signer::symmetric(Algorithm::HS256, b"a-completely-different-secret-value");

        assert!(matches!(other.verify(&token), Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn test_wrong_public_key_is_rejected() {
        let token = rs256().sign(&sample_claims()).unwrap();
        let other = Signer::asymmetric(Algorithm::RS256, PRIVATE_PEM, OTHER_PUBLIC_PEM).unwrap();

        assert!(matches!(other.verify(&token), Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn test_algorithm_confusion_is_rejected() {
        let secret = b"test-secret-key-at-least-32-characters-long";
        let hs512_token = Signer::symmetric(Algorithm::HS512, secret)
            .sign(&sample_claims())
            .unwrap();

        // Same secret, different configured algorithm.
        assert!(matches!(
            hs256().verify(&hs512_token),
            Err(AuthError::InvalidSigningAlgorithm)
        ));

        // An HMAC token presented to an RSA verifier.
        assert!(matches!(
            rs256().verify(&hs512_token),
            Err(AuthError::InvalidSigningAlgorithm)
        ));

        let rs_token = rs256().sign(&sample_claims()).unwrap();
        assert!(matches!(
            hs256().verify(&rs_token),
            Err(AuthError::InvalidSigningAlgorithm)
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            hs256().verify("not-a-token"),
            Err(AuthError::MalformedToken(_))
        ));
        assert!(matches!(hs256().verify(""), Err(AuthError::MalformedToken(_))));
    }

    #[test]
    fn test_invalid_pem_is_config_error() {
        assert!(matches!(
            Signer::asymmetric(Algorithm::RS256, b"garbage", PUBLIC_PEM),
            Err(ConfigError::InvalidPrivateKey(_))
        ));
        assert!(matches!(
            Signer::asymmetric(Algorithm::RS256, PRIVATE_PEM, b"garbage"),
            Err(ConfigError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn test_from_config_symmetric() {
        let config = JwtConfig::builder()
            .algorithm(SigningAlgorithm::HS384)
            .secret("config-secret")
            .build()
            .unwrap();

        let signer = Signer::from_config(&config).unwrap();
        assert_eq!(signer.algorithm(), Algorithm::HS384);
        assert!(matches!(signer, Signer::Symmetric { .. }));
    }
}
