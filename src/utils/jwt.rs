use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    error::{AppError, Result},
    models::{User, UserRole},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub exp: usize,
}

pub fn generate_token(config: &AuthConfig, user: &User) -> Result<String> {
    let expiration = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::days(config.token_expiry_days))
        .ok_or_else(|| AppError::InternalError("Failed to calculate expiration".to_string()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        name: user.name.clone(),
        role: user.role,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalError(format!("Token generation failed: {}", e)))
}

pub fn verify_token(config: &AuthConfig, token: &str) -> Result<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn config(secret: &str, days: i64) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string(),
            token_expiry_days: days,
        }
    }

    fn user(role: UserRole) -> User {
        User {
            id: 42,
            name: "Nino".to_string(),
            email: "nino@example.com".to_string(),
            password: String::new(),
            role,
            address: None,
            phone: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn token_carries_id_and_role() {
        let cfg = config("test-secret", 7);
        let token = generate_token(&cfg, &user(UserRole::Admin)).unwrap();

        let claims = verify_token(&cfg, &token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.role, UserRole::Admin);
        assert_eq!(claims.email, "nino@example.com");
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = generate_token(&config("one", 7), &user(UserRole::User)).unwrap();

        assert!(matches!(
            verify_token(&config("two", 7), &token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let cfg = config("test-secret", -1);
        let token = generate_token(&cfg, &user(UserRole::User)).unwrap();

        assert!(verify_token(&cfg, &token).is_err());
    }
}
