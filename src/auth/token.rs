// JWT token validation service
//
// Tokens are minted by the external identity service; this core only
// validates them and reads the claims.

use crate::auth::error::AuthError;
use crate::auth::models::Role;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// JWT claims structure shared with the identity service
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// customer or staff user id
    pub sub: i32,
    pub email: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

/// Token service for JWT validation
pub struct TokenService {
    secret: String,
}

impl TokenService {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    /// Validate a bearer token and return its claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::default();

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            if e.to_string().contains("ExpiredSignature") {
                AuthError::ExpiredToken
            } else {
                AuthError::InvalidToken
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test_secret_key_for_testing_purposes";

    fn mint(sub: i32, role: Role, exp_offset: i64) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub,
            email: "test@example.com".to_string(),
            role,
            iat: now,
            exp: now + exp_offset,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token_accepted() {
        let service = TokenService::new(SECRET.to_string());
        let token = mint(42, Role::Customer, 900);

        let claims = service.validate_token(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, Role::Customer);
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = TokenService::new(SECRET.to_string());
        let token = mint(42, Role::Customer, -500);

        let result = service.validate_token(&token);
        assert!(matches!(result, Err(AuthError::ExpiredToken)));
    }

    #[test]
    fn test_malformed_token_rejected() {
        let service = TokenService::new(SECRET.to_string());
        for garbage in ["not.a.jwt", "xxxx", ""] {
            assert!(matches!(
                service.validate_token(garbage),
                Err(AuthError::InvalidToken)
            ));
        }
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let service = TokenService::new("a_different_secret_entirely".to_string());
        let token = mint(42, Role::Staff, 900);
        assert!(matches!(
            service.validate_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }
}
