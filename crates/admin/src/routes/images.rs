//! Asset library: images stored in object storage.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use tracing::instrument;

use strives_core::ImageId;
use strives_db::images::Image;
use strives_db::{ImageRepository, RepositoryError};

use crate::error::{AppError, EntityResultExt, Result};
use crate::response::ApiResponse;
use crate::services::uploads::{self, UploadError, UploadedFile};
use crate::state::AppState;

/// Read every file sent under `field_name`. Other fields are ignored.
pub(crate) async fn read_files(
    multipart: &mut Multipart,
    field_name: &str,
) -> Result<Vec<UploadedFile>> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(field_name) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_owned();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_owned();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        files.push(UploadedFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    Ok(files)
}

fn upload_error(err: UploadError, failure: &'static str) -> AppError {
    match err {
        UploadError::NotAnImage(_) => {
            AppError::BadRequest("Only image files can be uploaded.".to_owned())
        }
        UploadError::Repository(RepositoryError::NotFound) => {
            AppError::status(StatusCode::NOT_FOUND, "Image not found")
        }
        other => AppError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: failure.into(),
            source: Some(Box::new(other)),
        },
    }
}

#[instrument(skip(state, multipart))]
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<ApiResponse<Image>> {
    let file = read_files(&mut multipart, "image")
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::BadRequest("No image provided.".to_owned()))?;

    let image = uploads::store_image(state.storage(), state.pool(), None, file)
        .await
        .map_err(|e| upload_error(e, "Error uploading image"))?;
    Ok(ApiResponse::data(image).with_message("Image Uploaded Successfully"))
}

#[instrument(skip(state))]
pub async fn list_images(State(state): State<AppState>) -> Result<ApiResponse<Vec<Image>>> {
    let images = ImageRepository::new(state.pool())
        .list()
        .await
        .or_entity("Image", "Error fetching images")?;
    Ok(ApiResponse::data(images))
}

#[instrument(skip(state))]
pub async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<ImageId>,
) -> Result<ApiResponse<()>> {
    uploads::delete_image(state.storage(), state.pool(), id)
        .await
        .map_err(|e| upload_error(e, "Error deleting image"))?;
    Ok(ApiResponse::message("Image Deleted Successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_non_image_is_bad_request() {
        let err = upload_error(UploadError::NotAnImage("a.pdf".to_owned()), "Error uploading image");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_missing_image_is_not_found() {
        let err = upload_error(
            UploadError::Repository(RepositoryError::NotFound),
            "Error deleting image",
        );
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
