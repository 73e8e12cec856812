use anyhow::Context;
use axum::body::Bytes;
use std::path::Path;

pub const ACCEPTED_MIME_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

const MIB: usize = 1024 * 1024;

pub const MAX_PORTRAIT_SOURCE_BYTES: usize = 10 * MIB;
pub const MAX_LISTING_PHOTO_BYTES: usize = 20 * MIB;

#[must_use]
pub fn is_valid_image_type(mime: &str) -> bool {
    ACCEPTED_MIME_TYPES.contains(&mime)
}

#[must_use]
pub const fn is_valid_size(len: usize, max_bytes: usize) -> bool {
    len <= max_bytes
}

/// Declared content type, else a guess from the file name.
#[must_use]
pub fn resolve_mime(declared: Option<&str>, file_name: Option<&str>) -> String {
    if let Some(ct) = declared.map(str::trim).filter(|ct| !ct.is_empty()) {
        return ct.to_ascii_lowercase();
    }
    file_name
        .and_then(|name| mime_guess::from_path(name).first())
        .map_or_else(
            || "application/octet-stream".to_string(),
            |m| m.essence_str().to_string(),
        )
}

/// Why an upload was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    UnsupportedType,
    TooLarge { max_bytes: usize },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedType => f.write_str("Please upload a JPEG or PNG image."),
            Self::TooLarge { max_bytes } if *max_bytes >= MIB => {
                write!(f, "Image must be at most {}MB.", max_bytes.div_ceil(MIB))
            }
            Self::TooLarge { max_bytes } => {
                write!(f, "Image must be at most {}KB.", max_bytes.div_ceil(1024).max(1))
            }
        }
    }
}

impl std::error::Error for Rejection {}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl ImageUpload {
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub async fn from_path(path: &Path) -> anyhow::Result<Self> {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let file_name = path
            .file_name()
            .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().to_string());
        let content_type = resolve_mime(None, Some(&file_name));
        Ok(Self {
            file_name,
            content_type,
            data: Bytes::from(data),
        })
    }

    /// Checks size and, when `require_photo_type` is set, JPEG/PNG type.
    ///
    /// # Errors
    ///
    /// Returns the first rule the upload breaks.
    pub fn validate(&self, max_bytes: usize, require_photo_type: bool) -> Result<(), Rejection> {
        if require_photo_type && !is_valid_image_type(&self.content_type) {
            return Err(Rejection::UnsupportedType);
        }
        if !is_valid_size(self.data.len(), max_bytes) {
            return Err(Rejection::TooLarge { max_bytes });
        }
        Ok(())
    }

    /// Builds a reqwest multipart part keeping file name and type.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored content type is not a valid MIME string.
    pub fn to_part(&self) -> reqwest::Result<reqwest::multipart::Part> {
        reqwest::multipart::Part::bytes(self.data.to_vec())
            .file_name(self.file_name.clone())
            .mime_str(&self.content_type)
    }
}
