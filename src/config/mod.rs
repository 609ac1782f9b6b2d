mod app_config;

pub use app_config::{
    AdminBootstrap, AppConfig, AuthConfig, CorsConfig, DatabaseConfig, ServerConfig, UploadConfig,
};
