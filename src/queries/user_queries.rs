use sqlx::PgPool;

use crate::{
    error::Result,
    models::{RegisterRequest, UpdateProfileRequest, User, UserRole},
};

pub async fn create_user(
    pool: &PgPool,
    req: &RegisterRequest,
    email: &str,
    password_hash: &str,
) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (name, email, password, phone, address)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(req.name.trim())
    .bind(email)
    .bind(password_hash)
    .bind(&req.phone)
    .bind(&req.address)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn update_profile(
    pool: &PgPool,
    id: i32,
    req: &UpdateProfileRequest,
    email: Option<&str>,
) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET
            name = COALESCE($1, name),
            email = COALESCE($2, email),
            phone = COALESCE($3, phone),
            address = COALESCE($4, address),
            updated_at = NOW()
        WHERE id = $5
        RETURNING *
        "#,
    )
    .bind(req.name.as_deref().map(str::trim))
    .bind(email)
    .bind(&req.phone)
    .bind(&req.address)
    .bind(id)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

pub async fn update_password(pool: &PgPool, id: i32, password_hash: &str) -> Result<()> {
    sqlx::query("UPDATE users SET password = $1, updated_at = NOW() WHERE id = $2")
        .bind(password_hash)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Creates the account as ADMIN, or promotes it if the email is already registered.
/// An existing password is left untouched.
pub async fn upsert_admin(
    pool: &PgPool,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (name, email, password, role)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role, updated_at = NOW()
         RETURNING *",
    )
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(UserRole::Admin)
    .fetch_one(pool)
    .await?;

    Ok(user)
}
