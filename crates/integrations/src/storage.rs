//! S3 object storage for uploaded images.

use chrono::Utc;
use rand::Rng;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use strives_core::slugify;

use crate::aws::{AwsCredentials, SigV4Signer, sha256_hex};

/// Prefix under which every uploaded asset is stored.
pub const ASSET_PREFIX: &str = "assets";

/// S3 bucket configuration.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub credentials: AwsCredentials,
    /// Path-style endpoint for S3-compatible stores. AWS is used when unset.
    pub endpoint: Option<String>,
    /// Base for public object URLs (e.g. a CDN). The bucket URL when unset.
    pub public_base_url: Option<String>,
}

/// Errors from object storage calls.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("S3 returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid storage URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Build the key for an upload: `assets/{stem}_{n}{ext}`.
///
/// The stem is slugified so keys are URL-safe. The extension is kept
/// lower-cased when it is plain alphanumeric.
#[must_use]
pub fn object_key(file_name: &str, n: u32) -> String {
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            (stem, format!(".{}", ext.to_ascii_lowercase()))
        }
        _ => (file_name, String::new()),
    };
    let stem = match slugify(stem) {
        s if s.is_empty() => "image".to_owned(),
        s => s,
    };
    format!("{ASSET_PREFIX}/{stem}_{n}{ext}")
}

/// [`object_key`] with a random suffix in `1..=10000`.
#[must_use]
pub fn random_object_key(file_name: &str) -> String {
    object_key(file_name, rand::rng().random_range(1..=10_000))
}

/// S3 client for one bucket.
#[derive(Debug, Clone)]
pub struct ObjectStorage {
    client: Client,
    signer: SigV4Signer,
    base: Url,
    public_base: String,
}

fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl ObjectStorage {
    /// Create a client for the configured bucket.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Url` if the endpoint is not a valid URL.
    pub fn new(config: S3Config) -> Result<Self, StorageError> {
        let base = match &config.endpoint {
            Some(endpoint) => Url::parse(&format!(
                "{}/{}/",
                endpoint.trim_end_matches('/'),
                config.bucket
            ))?,
            None => Url::parse(&format!(
                "https://{}.s3.{}.amazonaws.com/",
                config.bucket, config.region
            ))?,
        };
        let public_base = config
            .public_base_url
            .map_or_else(|| base.to_string(), |u| format!("{}/", u.trim_end_matches('/')));

        Ok(Self {
            client: Client::new(),
            signer: SigV4Signer::new(config.credentials, config.region, "s3"),
            base,
            public_base,
        })
    }

    /// Public URL of an object.
    #[must_use]
    pub fn public_url(&self, key: &str) -> String {
        format!("{}{}", self.public_base, encode_key(key))
    }

    fn object_url(&self, key: &str) -> Result<Url, StorageError> {
        Ok(self.base.join(&encode_key(key))?)
    }

    async fn send(
        &self,
        method: reqwest::Method,
        key: &str,
        mut headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Result<(), StorageError> {
        let url = self.object_url(key)?;
        let payload_hash = sha256_hex(&body);
        headers.push(("x-amz-content-sha256".to_owned(), payload_hash.clone()));
        self.signer
            .sign(method.as_str(), &url, &mut headers, &payload_hash, Utc::now());

        let mut request = self.client.request(method, url);
        for (name, value) in &headers {
            if name != "host" {
                request = request.header(name, value);
            }
        }

        let response = request.body(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Upload an object with public-read access and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or S3 rejects it.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let headers = vec![
            ("content-type".to_owned(), content_type.to_owned()),
            ("x-amz-acl".to_owned(), "public-read".to_owned()),
        ];
        self.send(reqwest::Method::PUT, key, headers, bytes).await?;
        debug!(key, "object uploaded");
        Ok(self.public_url(key))
    }

    /// Delete an object. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or S3 rejects it.
    #[instrument(skip(self))]
    pub async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.send(reqwest::Method::DELETE, key, Vec::new(), Vec::new())
            .await?;
        debug!(key, "object deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn config(endpoint: Option<&str>) -> S3Config {
        S3Config {
            bucket: "strives-assets".to_owned(),
            region: "ap-south-1".to_owned(),
            credentials: AwsCredentials {
                access_key_id: "AKIDEXAMPLE".to_owned(),
                secret_access_key: SecretString::from("secret"),
            },
            endpoint: endpoint.map(str::to_owned),
            public_base_url: None,
        }
    }

    #[test]
    fn test_object_key_format() {
        assert_eq!(object_key("Red Kurta.JPG", 42), "assets/red-kurta_42.jpg");
        assert_eq!(object_key("noext", 7), "assets/noext_7");
        assert_eq!(object_key(".png", 1), "assets/png_1");
        assert_eq!(object_key("???.webp", 3), "assets/image_3.webp");
    }

    #[test]
    fn test_random_key_suffix_in_range() {
        for _ in 0..50 {
            let key = random_object_key("a.png");
            let n: u32 = key
                .trim_start_matches("assets/a_")
                .trim_end_matches(".png")
                .parse()
                .unwrap();
            assert!((1..=10_000).contains(&n));
        }
    }

    #[test]
    fn test_virtual_hosted_urls() {
        let storage = ObjectStorage::new(config(None)).unwrap();
        assert_eq!(
            storage.public_url("assets/a_1.png"),
            "https://strives-assets.s3.ap-south-1.amazonaws.com/assets/a_1.png"
        );
    }

    #[test]
    fn test_path_style_endpoint() {
        let storage = ObjectStorage::new(config(Some("http://localhost:9000/"))).unwrap();
        assert_eq!(
            storage.object_url("assets/x y.png").unwrap().as_str(),
            "http://localhost:9000/strives-assets/assets/x%20y.png"
        );
    }
}
