use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::claims::Claims;
use crate::config::SessionConfig;
use crate::error::{AuthError, AuthResult};
use crate::roles::Role;

/// Issues and verifies signed session assertions using the process-wide
/// secret. Pure computation; callers own transport (cookie or header).
pub struct TokenCodec {
    config: SessionConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Canonical wire payload. Legacy aliases are accepted on decode only, via
/// the repr in [`crate::claims`]; they are never emitted.
#[derive(Serialize)]
struct SessionClaims<'a> {
    sub: String,
    role: &'static str,
    iss: &'a str,
    iat: i64,
    exp: i64,
}

impl TokenCodec {
    pub fn new(config: SessionConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn issue(&self, subject: Uuid, role: Role) -> AuthResult<IssuedToken> {
        let issued_at = Utc::now();
        let expires_at = issued_at + Duration::days(self.config.ttl_days);

        let claims = SessionClaims {
            sub: subject.to_string(),
            role: role.as_str(),
            iss: &self.config.issuer,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| AuthError::Signing(err.to_string()))?;

        Ok(IssuedToken {
            token,
            issued_at,
            expires_at,
        })
    }

    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.issuer.clone()]);
        validation.leeway = self.config.leeway_seconds.into();

        let token_data =
            decode::<Value>(token, &self.decoding_key, &validation).map_err(|err| {
                match err.kind() {
                    ErrorKind::ExpiredSignature => AuthError::Expired,
                    _ => AuthError::Verification(err.to_string()),
                }
            })?;

        Claims::try_from(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn codec() -> TokenCodec {
        TokenCodec::new(SessionConfig::new("unit-test-secret", "nexus-storefront"))
    }

    fn sign_raw(secret: &str, payload: &Value) -> String {
        encode(
            &Header::default(),
            payload,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("sign payload")
    }

    #[test]
    fn issue_then_verify_round_trips_subject_and_role() {
        let codec = codec();
        let subject = Uuid::new_v4();
        let issued = codec.issue(subject, Role::Seller).expect("issue");

        let claims = codec.verify(&issued.token).expect("verify");
        assert_eq!(claims.subject, subject);
        assert_eq!(claims.role, Role::Seller);
        assert_eq!(claims.expires_at.timestamp(), issued.expires_at.timestamp());
    }

    #[test]
    fn validity_window_is_thirty_days() {
        let issued = codec().issue(Uuid::new_v4(), Role::Customer).unwrap();
        let window = issued.expires_at - issued.issued_at;
        assert_eq!(window.num_days(), 30);
    }

    #[test]
    fn verification_is_idempotent() {
        let codec = codec();
        let issued = codec.issue(Uuid::new_v4(), Role::Admin).unwrap();
        let first = codec.verify(&issued.token).unwrap();
        let second = codec.verify(&issued.token).unwrap();
        assert_eq!(first.subject, second.subject);
        assert_eq!(first.role, second.role);
        assert_eq!(first.expires_at, second.expires_at);
    }

    #[test]
    fn expired_token_is_classified_as_expired() {
        let codec = codec();
        let now = Utc::now().timestamp();
        let token = sign_raw(
            "unit-test-secret",
            &json!({
                "sub": Uuid::new_v4().to_string(),
                "role": "customer",
                "iss": "nexus-storefront",
                "iat": now - 7_200,
                "exp": now - 3_600,
            }),
        );
        let err = codec.verify(&token).expect_err("should be expired");
        assert!(matches!(err, AuthError::Expired));
    }

    #[test]
    fn foreign_secret_fails_verification() {
        let issuing = TokenCodec::new(SessionConfig::new("other-secret", "nexus-storefront"));
        let issued = issuing.issue(Uuid::new_v4(), Role::Customer).unwrap();
        let err = codec().verify(&issued.token).expect_err("wrong secret");
        assert!(matches!(err, AuthError::Verification(_)));
    }

    #[test]
    fn tampered_token_fails_verification() {
        let codec = codec();
        let issued = codec.issue(Uuid::new_v4(), Role::Customer).unwrap();
        let mut tampered = issued.token;
        tampered.push('x');
        let err = codec.verify(&tampered).expect_err("tampered");
        assert!(matches!(err, AuthError::Verification(_)));
    }

    #[test]
    fn wrong_issuer_fails_verification() {
        let other = TokenCodec::new(SessionConfig::new("unit-test-secret", "someone-else"));
        let issued = other.issue(Uuid::new_v4(), Role::Customer).unwrap();
        let err = codec().verify(&issued.token).expect_err("wrong issuer");
        assert!(matches!(err, AuthError::Verification(_)));
    }

    #[test]
    fn accepts_legacy_dual_field_tokens() {
        let codec = codec();
        let subject = Uuid::new_v4();
        let now = Utc::now().timestamp();
        let token = sign_raw(
            "unit-test-secret",
            &json!({
                "id": subject.to_string(),
                "userId": subject.to_string(),
                "role": "seller",
                "userType": "seller",
                "iss": "nexus-storefront",
                "iat": now,
                "exp": now + 600,
            }),
        );
        let claims = codec.verify(&token).expect("legacy token");
        assert_eq!(claims.subject, subject);
        assert_eq!(claims.role, Role::Seller);
    }

    #[test]
    fn subjectless_token_is_an_invalid_claim() {
        let codec = codec();
        let now = Utc::now().timestamp();
        let token = sign_raw(
            "unit-test-secret",
            &json!({
                "role": "customer",
                "iss": "nexus-storefront",
                "exp": now + 600,
            }),
        );
        let err = codec.verify(&token).expect_err("no subject");
        assert!(matches!(err, AuthError::InvalidClaim("sub", _)));
    }
}
