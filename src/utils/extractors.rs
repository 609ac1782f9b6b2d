use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    error::{AppError, Result},
    utils::jwt::Claims,
};

/// The authenticated caller, read from the claims the auth middleware attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i32,
}

pub fn extract_user_id(claims: &Claims) -> Result<i32> {
    claims
        .sub
        .parse::<i32>()
        .map_err(|_| AppError::Unauthorized("Unauthorized".to_string()))
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let claims = parts
            .extensions
            .get::<Claims>()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

        Ok(CurrentUser {
            id: extract_user_id(claims)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use axum::http::Request;

    fn claims(sub: &str) -> Claims {
        Claims {
            sub: sub.to_string(),
            email: "buyer@shop.ge".to_string(),
            name: "Buyer".to_string(),
            role: UserRole::User,
            exp: 0,
        }
    }

    #[tokio::test]
    async fn reads_id_from_attached_claims() {
        let (mut parts, _) = Request::new(()).into_parts();
        parts.extensions.insert(claims("42"));

        let user = CurrentUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(user, CurrentUser { id: 42 });
    }

    #[tokio::test]
    async fn missing_or_malformed_claims_are_unauthorized() {
        let (mut parts, _) = Request::new(()).into_parts();
        assert!(matches!(
            CurrentUser::from_request_parts(&mut parts, &()).await,
            Err(AppError::Unauthorized(_))
        ));

        parts.extensions.insert(claims("not-a-number"));
        assert!(matches!(
            CurrentUser::from_request_parts(&mut parts, &()).await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
