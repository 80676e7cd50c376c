//! Uploaded meal images
//!
//! Images arrive as base64 (optionally a `data:image/...;base64,` URL), are
//! sniffed by content, and stored flat in the uploads directory under a
//! generated name. They are served back at `/api/images/<name>`.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use mealplan_common::{time, Error, Result};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// URL prefix under which uploads are served
pub const IMAGE_URL_PREFIX: &str = "/api/images/";

/// Image formats accepted for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageKind {
    /// Detect the format from file content
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match infer::get(bytes)?.mime_type() {
            "image/jpeg" => Some(ImageKind::Jpeg),
            "image/png" => Some(ImageKind::Png),
            "image/gif" => Some(ImageKind::Gif),
            "image/webp" => Some(ImageKind::Webp),
            _ => None,
        }
    }

    /// Guess the format from a file name; unknown extensions are JPEG
    pub fn from_filename(name: &str) -> Self {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("png") => ImageKind::Png,
            Some("gif") => ImageKind::Gif,
            Some("webp") => ImageKind::Webp,
            _ => ImageKind::Jpeg,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Gif => "gif",
            ImageKind::Webp => "webp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Gif => "image/gif",
            ImageKind::Webp => "image/webp",
        }
    }
}

/// Remove a leading `data:image/<type>;base64,` prefix
pub fn strip_data_url(data: &str) -> &str {
    let Some(rest) = data.strip_prefix("data:image/") else {
        return data;
    };
    match rest.split_once(";base64,") {
        Some((subtype, payload))
            if !subtype.is_empty() && subtype.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') =>
        {
            payload
        }
        _ => data,
    }
}

/// Decoded size estimate of a base64 payload
pub fn estimated_size(base64: &str) -> usize {
    base64.len() * 3 / 4
}

/// Plain file name without path separators or parent references
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty() && !name.contains("..") && !name.contains('/') && !name.contains('\\')
}

/// File name of an uploaded image from its public URL
pub fn filename_from_url(url: &str) -> Option<&str> {
    url.strip_prefix(IMAGE_URL_PREFIX)
        .filter(|name| is_safe_filename(name))
}

/// `<unix-ms>-<6 hex>.<ext>`
pub fn generate_filename(kind: ImageKind) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("{}-{}.{}", time::now_millis(), &random[..6], kind.extension())
}

fn is_image_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    [".jpg", ".jpeg", ".png", ".gif", ".webp"]
        .iter()
        .any(|ext| lower.ends_with(ext))
}

/// Image directory operations
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Validate, decode and store an uploaded image; returns its public URL
    pub async fn save(&self, data: &str, max_bytes: usize) -> Result<String> {
        let payload = strip_data_url(data.trim());
        if payload.is_empty() {
            return Err(Error::InvalidInput("Image data is required".to_string()));
        }
        if estimated_size(payload) > max_bytes {
            return Err(Error::InvalidInput(format!(
                "Image size must be less than {}MB",
                max_bytes / (1024 * 1024)
            )));
        }

        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| Error::InvalidInput(format!("Invalid base64 image data: {}", e)))?;
        let kind = ImageKind::sniff(&bytes).ok_or_else(|| {
            Error::InvalidInput("Unsupported image type. Use JPEG, PNG, GIF or WebP".to_string())
        })?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let filename = generate_filename(kind);
        tokio::fs::write(self.dir.join(&filename), &bytes).await?;

        info!("Stored upload {} ({} bytes)", filename, bytes.len());
        Ok(format!("{}{}", IMAGE_URL_PREFIX, filename))
    }

    /// Read a stored image; `None` for unsafe or missing names
    pub async fn read(&self, filename: &str) -> Result<Option<(Vec<u8>, ImageKind)>> {
        if !is_safe_filename(filename) {
            return Ok(None);
        }
        match tokio::fs::read(self.dir.join(filename)).await {
            Ok(bytes) => Ok(Some((bytes, ImageKind::from_filename(filename)))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the uploaded file behind a public URL
    ///
    /// Returns false for URLs outside the uploads area and for missing files.
    pub async fn delete_by_url(&self, url: &str) -> Result<bool> {
        let Some(filename) = filename_from_url(url) else {
            debug!("Not an uploaded image URL: {}", url);
            return Ok(false);
        };
        match tokio::fs::remove_file(self.dir.join(filename)).await {
            Ok(()) => {
                info!("Deleted image file {}", filename);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Image file already gone: {}", filename);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete an image, logging instead of failing
    pub async fn remove_quietly(&self, url: &str) {
        if let Err(e) = self.delete_by_url(url).await {
            warn!("Failed to delete image {}: {}", url, e);
        }
    }

    /// Image file names in the uploads directory, sorted
    pub async fn list_images(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if is_image_name(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
