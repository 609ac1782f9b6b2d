pub mod image_compression;
pub mod upload_service;
