// Authentication extractors for protected routes

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::auth::{error::AuthError, models::Role, token::TokenService};

fn bearer_claims(parts: &Parts) -> Result<crate::auth::Claims, AuthError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidToken)?;

    let jwt_secret = std::env::var("JWT_SECRET")
        .map_err(|_| AuthError::ConfigError("JWT_SECRET not configured".to_string()))?;

    TokenService::new(jwt_secret).validate_token(token)
}

/// Authenticated customer extractor for customer-facing routes
#[derive(Debug, Clone)]
pub struct AuthenticatedCustomer {
    pub customer_id: i32,
    pub email: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedCustomer
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts)?;

        if claims.role != Role::Customer {
            return Err(AuthError::InsufficientPermissions {
                required: Role::Customer,
                actual: claims.role,
            });
        }

        Ok(AuthenticatedCustomer {
            customer_id: claims.sub,
            email: claims.email,
        })
    }
}

/// Staff extractor for back-office routes (status transitions, driver
/// assignment, point adjustments)
#[derive(Debug, Clone)]
pub struct StaffUser {
    pub staff_id: i32,
    pub email: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for StaffUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts)?;

        if claims.role != Role::Staff {
            return Err(AuthError::InsufficientPermissions {
                required: Role::Staff,
                actual: claims.role,
            });
        }

        Ok(StaffUser {
            staff_id: claims.sub,
            email: claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test_secret_key_for_testing_purposes";

    fn parts_with_auth(auth_value: &str) -> Parts {
        let req = Request::builder()
            .uri("/")
            .header(header::AUTHORIZATION, auth_value)
            .body(())
            .unwrap();
        let (parts, _) = req.into_parts();
        parts
    }

    fn parts_without_auth() -> Parts {
        let req = Request::builder().uri("/").body(()).unwrap();
        let (parts, _) = req.into_parts();
        parts
    }

    fn mint(sub: i32, role: Role) -> String {
        let now = Utc::now().timestamp();
        let claims = crate::auth::Claims {
            sub,
            email: "test@example.com".to_string(),
            role,
            iat: now,
            exp: now + 900,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_customer_token_accepted() {
        std::env::set_var("JWT_SECRET", SECRET);

        let token = mint(42, Role::Customer);
        let mut parts = parts_with_auth(&format!("Bearer {}", token));

        let customer = AuthenticatedCustomer::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(customer.customer_id, 42);
    }

    #[tokio::test]
    async fn test_staff_token_rejected_on_customer_routes() {
        std::env::set_var("JWT_SECRET", SECRET);

        let token = mint(7, Role::Staff);
        let mut parts = parts_with_auth(&format!("Bearer {}", token));

        let result = AuthenticatedCustomer::from_request_parts(&mut parts, &()).await;
        assert!(matches!(
            result,
            Err(AuthError::InsufficientPermissions { .. })
        ));
    }

    #[tokio::test]
    async fn test_customer_token_rejected_on_staff_routes() {
        std::env::set_var("JWT_SECRET", SECRET);

        let token = mint(42, Role::Customer);
        let mut parts = parts_with_auth(&format!("Bearer {}", token));

        let result = StaffUser::from_request_parts(&mut parts, &()).await;
        assert!(matches!(
            result,
            Err(AuthError::InsufficientPermissions { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_authorization_header() {
        let mut parts = parts_without_auth();
        let result = AuthenticatedCustomer::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::MissingToken)));
    }

    #[tokio::test]
    async fn test_invalid_bearer_format() {
        std::env::set_var("JWT_SECRET", SECRET);

        for auth_value in ["InvalidFormat token", "token_without_bearer", "Basic dXNlcjpwYXNz"] {
            let mut parts = parts_with_auth(auth_value);
            let result = AuthenticatedCustomer::from_request_parts(&mut parts, &()).await;
            assert!(result.is_err());
        }
    }
}
