use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    config::{AdminBootstrap, AppConfig, AuthConfig, UploadConfig},
    database,
    error::{AppError, Result},
    queries::user_queries,
    routes,
    utils::validation,
};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub auth: Arc<AuthConfig>,
    pub uploads: Arc<UploadConfig>,
}

impl AppState {
    pub fn new(db: PgPool, config: &AppConfig) -> Self {
        Self {
            db,
            auth: Arc::new(config.auth.clone()),
            uploads: Arc::new(config.uploads.clone()),
        }
    }
}

pub async fn build(config: &AppConfig) -> Result<Router> {
    let pool = database::create_pool(&config.database).await?;

    if let Some(ref admin) = config.admin {
        ensure_admin(&pool, admin).await?;
    }

    build_router(AppState::new(pool, config), config)
}

async fn ensure_admin(pool: &PgPool, admin: &AdminBootstrap) -> Result<()> {
    validation::validate_email(&admin.email)?;
    validation::validate_password(&admin.password)?;

    let email = validation::normalize_email(&admin.email);
    let password_hash = bcrypt::hash(&admin.password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))?;

    let user = user_queries::upsert_admin(pool, admin.name.trim(), &email, &password_hash).await?;
    tracing::info!("Admin account {} is ready (id {})", user.email, user.id);

    Ok(())
}

pub fn build_router(state: AppState, config: &AppConfig) -> Result<Router> {
    let allowed_origins: Vec<HeaderValue> = config
        .cors
        .allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|_| AppError::ConfigError(format!("Invalid CORS origin: {}", origin)))
        })
        .collect::<Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .allow_origin(allowed_origins);

    let app = routes::create_router(state.clone())
        .nest_service("/uploads", ServeDir::new(&config.uploads.dir))
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}
