use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    error::{AppError, Result},
    models::{AuthResponse, RegisterRequest},
    queries::user_queries,
    utils::{jwt, validation},
};

pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    validate_registration(&payload)?;

    let email = validation::normalize_email(&payload.email);

    if user_queries::find_by_email(&state.db, &email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password_hash = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))?;

    let user = user_queries::create_user(&state.db, &payload, &email, &password_hash).await?;

    let token = jwt::generate_token(&state.auth, &user)?;

    tracing::info!("Registered user {}", user.id);

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

fn validate_registration(payload: &RegisterRequest) -> Result<()> {
    validation::validate_email(&payload.email)?;
    validation::validate_name(&payload.name)?;
    validation::validate_password(&payload.password)?;
    Ok(())
}
