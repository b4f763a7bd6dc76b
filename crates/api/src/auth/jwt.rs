//! HS256 access tokens for staff.
//!
//! The subject is the staff id and the `role` claim drives RBAC. Tokens must
//! carry the configured issuer; a token minted for another service sharing
//! the secret is refused.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rollout_core::types::DbId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 15;
const DEFAULT_ISSUER: &str = "class-rollouts";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: DbId,
    pub role: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
    /// Token id, logged with audit entries by the issuing portal.
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub access_token_expiry_mins: i64,
}

impl JwtConfig {
    /// | Env Var                  | Required | Default          |
    /// |--------------------------|----------|------------------|
    /// | `JWT_SECRET`             | yes      | -                |
    /// | `JWT_ISSUER`             | no       | `class-rollouts` |
    /// | `JWT_ACCESS_EXPIRY_MINS` | no       | `15`             |
    ///
    /// Panics if `JWT_SECRET` is unset or empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let access_token_expiry_mins = match std::env::var("JWT_ACCESS_EXPIRY_MINS") {
            Ok(raw) => raw
                .parse()
                .expect("JWT_ACCESS_EXPIRY_MINS must be a whole number of minutes"),
            Err(_) => DEFAULT_ACCESS_EXPIRY_MINS,
        };

        Self {
            secret,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.into()),
            access_token_expiry_mins,
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);
        // `sub` is numeric, and jsonwebtoken only accepts a string `sub`
        // as a required claim. Its presence is enforced by `Claims`.
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation
    }
}

/// Mint an access token. The API never issues tokens itself; this serves
/// tooling and tests.
pub fn generate_access_token(
    staff_id: DbId,
    role: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: staff_id,
        role: role.to_string(),
        iss: config.issuer.clone(),
        exp: now + config.access_token_expiry_mins * 60,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Check signature, expiry and issuer, and return the claims.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &config.validation(),
    )
    .map(|data| data.claims)
}
