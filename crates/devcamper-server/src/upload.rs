//! Bootcamp photo upload rules and storage.

use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use axum::http::StatusCode;
use devcamper_core::AppError;
use uuid::Uuid;

use crate::error::ApiError;

/// Name of the multipart field carrying the image.
pub const FILE_FIELD: &str = "file";

/// Headroom over the file limit for multipart boundaries and headers.
pub const MULTIPART_OVERHEAD: usize = 16 * 1024;

/// Image types accepted for upload, with the extension each is stored under.
const IMAGE_TYPES: [(&str, &str); 5] = [
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

/// A validated image read from a request.
#[derive(Debug)]
pub struct Photo {
    /// Derived from the content type, never from the client's file name.
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

pub fn too_large(max_bytes: usize) -> AppError {
    AppError::UploadRejected(format!("Please upload an image less than {max_bytes} bytes"))
}

/// Accept raster image types only, returning the extension to store under.
///
/// Parameters such as `; charset=...` are ignored. SVG is refused since it can
/// carry script when served back from `/uploads`.
pub fn check_content_type(content_type: Option<&str>) -> Result<&'static str, AppError> {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());

    essence
        .and_then(|ct| {
            IMAGE_TYPES
                .iter()
                .find(|(mime, _)| *mime == ct)
                .map(|(_, ext)| *ext)
        })
        .ok_or_else(|| AppError::UploadRejected("Please upload an image file".into()))
}

pub fn photo_file_name(id: Uuid, extension: &str) -> String {
    format!("photo_{id}.{extension}")
}

/// Pull the `file` field out of a multipart body, enforcing type and size.
///
/// Other fields are skipped. The size check runs while streaming so an
/// oversized part is rejected without buffering it whole.
pub async fn read_photo(multipart: &mut Multipart, max_bytes: usize) -> Result<Photo, ApiError> {
    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError(too_large(max_bytes))
        } else {
            ApiError::from(e)
        }
    })? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let extension = check_content_type(field.content_type())?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError(too_large(max_bytes))
            } else {
                ApiError::from(e)
            }
        })? {
            if bytes.len() + chunk.len() > max_bytes {
                return Err(ApiError(too_large(max_bytes)));
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            break;
        }
        return Ok(Photo { extension, bytes });
    }

    Err(ApiError(AppError::UploadRejected(
        "Please upload a file".into(),
    )))
}

/// Write the photo under `dir`, creating it if needed. Returns the full path.
pub async fn store(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, AppError> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(file_name);
    tokio::fs::write(&path, bytes).await?;
    tracing::info!(path = %path.display(), size = bytes.len(), "Photo stored");
    Ok(path)
}
