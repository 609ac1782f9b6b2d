use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    error::{AppError, Result},
    models::{ChangePasswordRequest, Order, UpdateProfileRequest, User},
    queries::{order_queries, user_queries},
    utils::{extractors::CurrentUser, validation},
};

pub async fn get_profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<User>> {
    let user = user_queries::find_by_id(&state.db, current.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<User>> {
    if let Some(ref name) = payload.name {
        validation::validate_name(name)?;
    }

    let email = match payload.email {
        Some(ref email) => {
            validation::validate_email(email)?;
            let email = validation::normalize_email(email);

            if let Some(existing) = user_queries::find_by_email(&state.db, &email).await? {
                if existing.id != current.id {
                    return Err(AppError::Conflict("Email already registered".to_string()));
                }
            }
            Some(email)
        }
        None => None,
    };

    if user_queries::find_by_id(&state.db, current.id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let user =
        user_queries::update_profile(&state.db, current.id, &payload, email.as_deref()).await?;

    Ok(Json(user))
}

pub async fn change_password(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<StatusCode> {
    validation::validate_password(&payload.new_password)?;

    let user = user_queries::find_by_id(&state.db, current.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let is_valid = bcrypt::verify(&payload.current_password, &user.password)
        .map_err(|e| AppError::InternalError(format!("Password verification failed: {}", e)))?;

    if !is_valid {
        return Err(AppError::BadRequest("Current password is incorrect".to_string()));
    }

    let password_hash = bcrypt::hash(&payload.new_password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))?;

    user_queries::update_password(&state.db, user.id, &password_hash).await?;

    tracing::info!("User {} changed their password", user.id);

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_my_orders(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<Order>>> {
    let orders = order_queries::get_user_orders(&state.db, current.id).await?;

    Ok(Json(orders))
}
