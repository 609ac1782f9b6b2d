use std::path::Path;

use axum::extract::Multipart;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    config::UploadConfig,
    error::{AppError, Result},
    services::image_compression::{FileKind, compress_to_target},
};

pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "pdf"];

#[derive(Debug)]
pub struct IncomingFile {
    pub file_name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub url: String,
    pub filename: String,
    pub size: usize,
    pub original_size: usize,
    pub compressed: bool,
}

pub fn file_extension(file_name: &str) -> Result<String> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| AppError::BadRequest("File has no extension".to_string()))?;

    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::BadRequest(format!(
            "File type .{} is not allowed",
            extension
        )));
    }

    Ok(extension)
}

/// Reads file parts whose field name is in `field_names`, skipping other fields.
pub async fn read_files(
    multipart: &mut Multipart,
    field_names: &[&str],
    max_files: usize,
) -> Result<Vec<IncomingFile>> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let accepted = field.name().is_some_and(|name| field_names.contains(&name));
        if !accepted {
            continue;
        }

        if files.len() == max_files {
            return Err(AppError::BadRequest(format!(
                "At most {} files can be uploaded at once",
                max_files
            )));
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("File part has no filename".to_string()))?;
        let data = field.bytes().await?.to_vec();

        files.push(IncomingFile { file_name, data });
    }

    Ok(files)
}

/// Checks name, emptiness and size without touching the disk. Returns the extension.
pub fn validate_upload(config: &UploadConfig, file: &IncomingFile) -> Result<String> {
    let extension = file_extension(&file.file_name)?;

    if file.data.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Uploaded file {} is empty",
            file.file_name
        )));
    }

    if file.data.len() > config.max_file_size {
        return Err(AppError::BadRequest(format!(
            "File {} exceeds the {} byte limit",
            file.file_name, config.max_file_size
        )));
    }

    Ok(extension)
}

pub async fn store_upload(config: &UploadConfig, file: IncomingFile) -> Result<StoredFile> {
    let extension = validate_upload(config, &file)?;

    let original_size = file.data.len();
    let kind = FileKind::from_extension(&extension);
    let target = config.target_size;

    let compressed = tokio::task::spawn_blocking(move || compress_to_target(file.data, kind, target))
        .await
        .map_err(|e| AppError::InternalError(format!("Compression task failed: {}", e)))?;

    let mut filename = format!(
        "{}-{}.{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        extension
    );
    if compressed.gzipped {
        filename.push_str(".gz");
    }

    tokio::fs::create_dir_all(&config.dir)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to create upload dir: {}", e)))?;
    tokio::fs::write(config.dir.join(&filename), &compressed.bytes)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to write upload: {}", e)))?;

    tracing::info!(
        "Stored upload {} ({} -> {} bytes)",
        filename,
        original_size,
        compressed.bytes.len()
    );

    Ok(StoredFile {
        url: format!("{}/uploads/{}", config.public_url, filename),
        size: compressed.bytes.len(),
        compressed: compressed.is_modified(),
        filename,
        original_size,
    })
}

/// Stores every file or none: all files are validated first, and files already
/// written are removed if a later write fails.
pub async fn store_batch(
    config: &UploadConfig,
    files: Vec<IncomingFile>,
) -> Result<Vec<StoredFile>> {
    for file in &files {
        validate_upload(config, file)?;
    }

    let mut stored = Vec::with_capacity(files.len());
    for file in files {
        match store_upload(config, file).await {
            Ok(saved) => stored.push(saved),
            Err(e) => {
                for saved in &stored {
                    let path = config.dir.join(&saved.filename);
                    if let Err(remove_err) = tokio::fs::remove_file(path).await {
                        tracing::warn!("Failed to remove {}: {}", saved.filename, remove_err);
                    }
                }
                return Err(e);
            }
        }
    }

    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &Path) -> UploadConfig {
        UploadConfig {
            dir: dir.to_path_buf(),
            public_url: "http://localhost:3000".to_string(),
            target_size: 1024,
            max_file_size: 64 * 1024,
        }
    }

    fn file(name: &str, data: &[u8]) -> IncomingFile {
        IncomingFile {
            file_name: name.to_string(),
            data: data.to_vec(),
        }
    }

    #[test]
    fn extension_must_be_whitelisted() {
        assert_eq!(file_extension("Receipt.JPG").unwrap(), "jpg");
        assert!(file_extension("payload.exe").is_err());
        assert!(file_extension("README").is_err());
    }

    #[tokio::test]
    async fn small_file_is_written_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let stored = store_upload(&config(dir.path()), file("logo.gif", b"GIF89a tiny"))
            .await
            .unwrap();

        assert!(!stored.compressed);
        assert_eq!(stored.size, stored.original_size);
        assert!(stored.filename.ends_with(".gif"));
        assert_eq!(
            stored.url,
            format!("http://localhost:3000/uploads/{}", stored.filename)
        );

        let on_disk = std::fs::read(dir.path().join(&stored.filename)).unwrap();
        assert_eq!(on_disk, b"GIF89a tiny");
    }

    #[tokio::test]
    async fn large_document_is_stored_gzipped() {
        let dir = tempfile::tempdir().unwrap();
        let body = b"%PDF-1.4 lorem ipsum dolor sit amet\n".repeat(500);

        let stored = store_upload(&config(dir.path()), file("proof.pdf", &body))
            .await
            .unwrap();

        assert!(stored.compressed);
        assert!(stored.filename.ends_with(".pdf.gz"));
        assert!(stored.size < stored.original_size);
        assert!(dir.path().join(&stored.filename).exists());
    }

    #[tokio::test]
    async fn oversized_and_empty_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());

        let too_big = vec![0u8; cfg.max_file_size + 1];
        assert!(matches!(
            store_upload(&cfg, file("big.png", &too_big)).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            store_upload(&cfg, file("empty.png", b"")).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn batch_with_one_bad_file_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());

        let files = vec![
            file("a.gif", b"GIF89a one"),
            file("b.gif", b"GIF89a two"),
            file("c.png", &vec![1u8; cfg.max_file_size + 1]),
            file("d.gif", b"GIF89a four"),
        ];

        assert!(matches!(
            store_batch(&cfg, files).await,
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn batch_stores_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());

        let stored = store_batch(
            &cfg,
            vec![file("a.gif", b"GIF89a one"), file("b.pdf", b"%PDF-1.4")],
        )
        .await
        .unwrap();

        assert_eq!(stored.len(), 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}
