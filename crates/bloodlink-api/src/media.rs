//! Local-disk image plumbing: multipart intake, storage, and serving.

use std::path::Path as FsPath;

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
};
use tokio::io::AsyncWriteExt;
use tracing::error;
use uuid::Uuid;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};

/// 10 MB cap on uploaded images.
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

pub struct ImagePart {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

/// Pull the `request_data` JSON part and the optional `image` part out of a
/// multipart form. Unknown parts are ignored.
pub async fn read_multipart_form(
    multipart: &mut Multipart,
) -> ApiResult<(String, Option<ImagePart>)> {
    let mut request_data: Option<String> = None;
    let mut image: Option<ImagePart> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("request_data") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("unreadable request_data: {e}")))?;
                request_data = Some(text);
            }
            Some("image") => {
                let content_type = field.content_type().map(str::to_owned);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("unreadable image: {e}")))?;
                image = Some(ImagePart {
                    data: data.to_vec(),
                    content_type,
                });
            }
            _ => {}
        }
    }

    let request_data =
        request_data.ok_or_else(|| ApiError::BadRequest("missing request_data part".into()))?;
    Ok((request_data, image))
}

fn extension_for(content_type: Option<&str>) -> Option<&'static str> {
    match content_type {
        Some("image/jpeg") => Some("jpg"),
        Some("image/png") => Some("png"),
        Some("image/webp") => Some("webp"),
        Some("image/gif") => Some("gif"),
        _ => None,
    }
}

fn content_type_for(extension: &str) -> Option<&'static str> {
    match extension {
        "jpg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// Write an uploaded image under `media_dir`, returning its storage key.
pub async fn store_image(media_dir: &FsPath, image: &ImagePart) -> ApiResult<String> {
    if image.data.is_empty() {
        return Err(ApiError::BadRequest("empty image upload".into()));
    }
    if image.data.len() > MAX_IMAGE_SIZE {
        return Err(ApiError::BadRequest("image exceeds 10 MB".into()));
    }
    let ext = extension_for(image.content_type.as_deref())
        .ok_or_else(|| ApiError::BadRequest("unsupported image content type".into()))?;

    let key = format!("{}.{ext}", Uuid::new_v4());

    tokio::fs::create_dir_all(media_dir).await.map_err(|e| {
        error!("Failed to create media directory: {}", e);
        ApiError::Internal(format!("media directory: {e}"))
    })?;

    let path = media_dir.join(&key);
    let mut file = tokio::fs::File::create(&path).await.map_err(|e| {
        error!("Failed to create {}: {}", path.display(), e);
        ApiError::Internal(format!("media write: {e}"))
    })?;
    file.write_all(&image.data).await.map_err(|e| {
        error!("Failed to write {}: {}", path.display(), e);
        ApiError::Internal(format!("media write: {e}"))
    })?;

    Ok(key)
}

/// GET /media/{key} — serve a stored image back.
pub async fn download(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<impl IntoResponse> {
    // A key is "<uuid>.<known ext>"; anything else (and thus any path
    // traversal attempt) is rejected before touching the filesystem.
    let (stem, ext) = key
        .rsplit_once('.')
        .ok_or_else(|| ApiError::BadRequest("malformed media key".into()))?;
    stem.parse::<Uuid>()
        .map_err(|_| ApiError::BadRequest("malformed media key".into()))?;
    let content_type =
        content_type_for(ext).ok_or_else(|| ApiError::BadRequest("malformed media key".into()))?;

    let path = state.media_dir.join(&key);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::NotFound(format!("media {key}")))?;

    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_mapping_round_trips() {
        for (ct, ext) in [
            ("image/jpeg", "jpg"),
            ("image/png", "png"),
            ("image/webp", "webp"),
            ("image/gif", "gif"),
        ] {
            assert_eq!(extension_for(Some(ct)), Some(ext));
            assert_eq!(content_type_for(ext), Some(ct));
        }
        assert_eq!(extension_for(Some("application/pdf")), None);
        assert_eq!(extension_for(None), None);
    }

    #[tokio::test]
    async fn store_image_writes_a_keyed_file() {
        let dir = std::env::temp_dir().join(format!("bloodlink_media_test_{}", Uuid::new_v4()));

        let image = ImagePart {
            data: vec![0xFF, 0xD8, 0xFF, 0xE0],
            content_type: Some("image/jpeg".into()),
        };
        let key = store_image(&dir, &image).await.unwrap();
        assert!(key.ends_with(".jpg"));
        let (stem, _) = key.rsplit_once('.').unwrap();
        assert!(stem.parse::<Uuid>().is_ok());

        let stored = tokio::fs::read(dir.join(&key)).await.unwrap();
        assert_eq!(stored, image.data);

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn store_image_rejects_unknown_content_type() {
        let dir = std::env::temp_dir().join("bloodlink_media_test_reject");
        let image = ImagePart {
            data: vec![1, 2, 3],
            content_type: Some("application/octet-stream".into()),
        };
        let err = store_image(&dir, &image).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
