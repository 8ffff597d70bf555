//! Signed session tokens (HS256 JWT).

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::Error as JwtError, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use serde::{Deserialize, Serialize};

/// Claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Unique per token so two logins in the same second never collide
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies session tokens with a shared secret.
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, lifetime: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lifetime,
        }
    }

    pub fn sign(&self, user_id: &str) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            user_id: user_id.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };
        self.encode(&claims)
    }

    /// Check signature and expiry, returning the decoded claims.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation).map(|data| data.claims)
    }

    fn encode(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session_lifetime;

    fn signer() -> TokenSigner {
        TokenSigner::new("test-secret", session_lifetime())
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = signer();
        let token = signer.sign("user-1").unwrap();
        let claims = signer.verify(&token).unwrap();

        assert_eq!(claims.user_id, "user-1");
        assert_eq!(claims.exp - claims.iat, 172_800);
    }

    #[test]
    fn test_claims_use_user_id_key() {
        let claims = Claims {
            user_id: "u1".to_string(),
            jti: "j".to_string(),
            iat: 1,
            exp: 2,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["userId"], "u1");
    }

    #[test]
    fn test_tokens_are_unique_per_login() {
        let signer = signer();
        let a = signer.sign("user-1").unwrap();
        let b = signer.sign("user-1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = signer().sign("user-1").unwrap();
        let other = TokenSigner::new("another-secret", session_lifetime());
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let signer = signer();
        let mut token = signer.sign("user-1").unwrap();
        token.push('x');
        assert!(signer.verify(&token).is_err());
        assert!(signer.verify("not.a.token").is_err());
        assert!(signer.verify("").is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let signer = signer();
        let now = Utc::now().timestamp();
        let token = signer
            .encode(&Claims {
                user_id: "user-1".to_string(),
                jti: "expired".to_string(),
                iat: now - 172_900,
                exp: now - 100,
            })
            .unwrap();
        assert!(signer.verify(&token).is_err());
    }
}
