//! Image uploads: bytes go to object storage, metadata to the database.

use futures::stream::{self, StreamExt};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{instrument, warn};

use strives_core::{ImageId, ProductId};
use strives_db::images::{Image, NewImage};
use strives_db::{ImageRepository, RepositoryError};
use strives_integrations::storage::random_object_key;
use strives_integrations::{ObjectStorage, StorageError};

/// Largest accepted request body for image routes.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Files of one product upload processed at the same time.
pub const UPLOAD_CONCURRENCY: usize = 4;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0} is not an image")]
    NotAnImage(String),

    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A file read from a multipart field.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    fn check(&self) -> Result<(), UploadError> {
        if self.content_type.starts_with("image/") && !self.bytes.is_empty() {
            Ok(())
        } else {
            Err(UploadError::NotAnImage(self.file_name.clone()))
        }
    }
}

/// Outcome of a multi-file product upload.
#[derive(Debug, Default, serde::Serialize)]
pub struct ProductUploadReport {
    pub uploaded: Vec<Image>,
    /// Names of files that were skipped.
    pub failed: Vec<String>,
}

/// Store one image, optionally appending it to a product's gallery.
///
/// The object is removed again if its row cannot be written.
///
/// # Errors
///
/// Returns `UploadError::NotAnImage` for non-image or empty files, and
/// storage or repository errors otherwise.
#[instrument(skip(storage, pool, file), fields(file_name = %file.file_name, size = file.bytes.len()))]
pub async fn store_image(
    storage: &ObjectStorage,
    pool: &PgPool,
    product: Option<ProductId>,
    file: UploadedFile,
) -> Result<Image, UploadError> {
    file.check()?;

    let key = random_object_key(&file.file_name);
    let size_bytes = i64::try_from(file.bytes.len()).unwrap_or(i64::MAX);
    let url = storage.put_object(&key, file.bytes, &file.content_type).await?;

    let new = NewImage {
        name: &file.file_name,
        object_key: &key,
        url: &url,
        content_type: &file.content_type,
        size_bytes,
    };
    let images = ImageRepository::new(pool);
    let recorded = match product {
        Some(product_id) => images.create_for_product(product_id, &new).await,
        None => images.create(&new).await,
    };

    match recorded {
        Ok(image) => Ok(image),
        Err(e) => {
            if let Err(cleanup) = storage.delete_object(&key).await {
                warn!(error = %cleanup, key, "orphaned object left in storage");
            }
            Err(e.into())
        }
    }
}

/// Store several images for a product, up to [`UPLOAD_CONCURRENCY`] at a
/// time. Failed files are logged and reported by name.
pub async fn store_product_images(
    storage: &ObjectStorage,
    pool: &PgPool,
    product_id: ProductId,
    files: Vec<UploadedFile>,
) -> ProductUploadReport {
    let results: Vec<(String, Result<Image, UploadError>)> = stream::iter(files)
        .map(|file| async move {
            let name = file.file_name.clone();
            (name, store_image(storage, pool, Some(product_id), file).await)
        })
        .buffer_unordered(UPLOAD_CONCURRENCY)
        .collect()
        .await;

    let mut report = ProductUploadReport::default();
    for (name, result) in results {
        match result {
            Ok(image) => report.uploaded.push(image),
            Err(e) => {
                warn!(error = %e, file_name = %name, %product_id, "product image skipped");
                report.failed.push(name);
            }
        }
    }
    report.uploaded.sort_by_key(|image| image.id.as_i32());
    report
}

/// Delete the stored object, then the row.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the image doesn't exist, and
/// storage or repository errors otherwise.
#[instrument(skip(storage, pool))]
pub async fn delete_image(
    storage: &ObjectStorage,
    pool: &PgPool,
    id: ImageId,
) -> Result<(), UploadError> {
    let images = ImageRepository::new(pool);
    let image = images.get(id).await?.ok_or(RepositoryError::NotFound)?;
    storage.delete_object(&image.object_key).await?;
    images.delete(id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(content_type: &str, bytes: &[u8]) -> UploadedFile {
        UploadedFile {
            file_name: "Kurta Front.JPG".to_owned(),
            content_type: content_type.to_owned(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn test_images_accepted() {
        assert!(file("image/jpeg", b"\xff\xd8").check().is_ok());
    }

    #[test]
    fn test_non_images_rejected() {
        assert!(matches!(
            file("application/pdf", b"%PDF").check(),
            Err(UploadError::NotAnImage(_))
        ));
        assert!(file("image/png", b"").check().is_err());
    }
}
