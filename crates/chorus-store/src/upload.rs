//! Attachment upload capability.
//!
//! Uploads are addressed by a name derived from the author and the send
//! time (see [`attachment_name`]) and resolve to an opaque reference string
//! that is stored on the message record.

use std::future::Future;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, info};

use chorus_shared::constants::IMAGE_FOLDER;

use crate::error::UploadError;

/// Handle to an image on the local device that has not been uploaded yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalImage {
    pub path: PathBuf,
}

impl LocalImage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Something that turns a local image into a reference (usually a URL).
pub trait Uploader: Send + Sync {
    fn upload(
        &self,
        image: &LocalImage,
        name: &str,
    ) -> impl Future<Output = Result<String, UploadError>> + Send;
}

/// Storage name for an attachment: `images/{author}_{unix millis}`.
pub fn attachment_name(author_id: &str, at: DateTime<Utc>) -> String {
    format!("{}/{}_{}", IMAGE_FOLDER, author_id, at.timestamp_millis())
}

/// Uploader that copies attachments into a directory.
///
/// References are `{base_url}/{name}` when a public base URL is configured,
/// otherwise a `file://` URL pointing at the stored copy.
#[derive(Debug, Clone)]
pub struct BlobUploader {
    base_path: PathBuf,
    base_url: Option<String>,
    max_size: u64,
}

impl BlobUploader {
    pub async fn new(
        base_path: PathBuf,
        base_url: Option<String>,
        max_size: u64,
    ) -> Result<Self, UploadError> {
        fs::create_dir_all(&base_path).await?;

        info!(path = %base_path.display(), "Attachment store initialized");

        Ok(Self {
            base_path,
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
            max_size,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve `name` under the base directory, refusing anything that escapes it.
    fn safe_path(&self, name: &str) -> Result<PathBuf, UploadError> {
        let relative = Path::new(name);
        if name.is_empty() || name.contains('\\') {
            return Err(UploadError::InvalidName(name.to_string()));
        }
        let mut resolved = self.base_path.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                _ => return Err(UploadError::InvalidName(name.to_string())),
            }
        }
        Ok(resolved)
    }

    fn reference_for(&self, name: &str, stored: &Path) -> String {
        match &self.base_url {
            Some(base) => format!("{base}/{name}"),
            None => format!("file://{}", stored.display()),
        }
    }
}

impl Uploader for BlobUploader {
    async fn upload(&self, image: &LocalImage, name: &str) -> Result<String, UploadError> {
        let target = self.safe_path(name)?;

        let metadata = match fs::metadata(&image.path).await {
            Ok(m) if m.is_file() => m,
            _ => return Err(UploadError::NotFound(image.path.clone())),
        };
        if metadata.len() > self.max_size {
            return Err(UploadError::TooLarge {
                size: metadata.len(),
                max: self.max_size,
            });
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(&image.path, &target).await?;

        debug!(name, size = metadata.len(), "Stored attachment");
        Ok(self.reference_for(name, &target))
    }
}
