//! Typed client for a running server, driving the portrait and listing flows.

use anyhow::{Context, anyhow, bail};
use axum::body::Bytes;
use rand::Rng;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use url::Url;

use crate::listing::{ListingForm, ListingPost};
use crate::normalize::{GeneratedImage, decode_data_url, extract_caption, extract_image};
use crate::validators::{
    ImageUpload, MAX_LISTING_PHOTO_BYTES, MAX_PORTRAIT_SOURCE_BYTES, resolve_mime,
};

#[derive(Debug, Clone)]
pub struct StudioClient {
    pub base: Url,
    http: reqwest::Client,
}

/// Status, content type and body of a server answer.
struct Reply {
    status: reqwest::StatusCode,
    content_type: Option<String>,
    body: Bytes,
}

impl Reply {
    async fn read(resp: reqwest::Response) -> anyhow::Result<Self> {
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let body = resp.bytes().await.context("reading server response")?;
        Ok(Self {
            status,
            content_type,
            body,
        })
    }

    /// The server's `error` message, or `fallback`.
    fn error_message(&self, fallback: &str) -> String {
        serde_json::from_slice::<JsonValue>(&self.body)
            .ok()
            .and_then(|v| v.get("error").and_then(JsonValue::as_str).map(ToString::to_string))
            .unwrap_or_else(|| fallback.to_string())
    }
}

impl StudioClient {
    #[must_use]
    pub fn new(base: Url) -> Self {
        Self {
            base,
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> anyhow::Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("building URL for {path}"))
    }

    /// Sends a photo (and optional retry feedback) and returns the portrait.
    ///
    /// # Errors
    ///
    /// Fails on an invalid photo, a non-2xx answer, or an answer with no image in it.
    pub async fn generate_portrait(
        &self,
        photo: &ImageUpload,
        feedback: Option<&str>,
    ) -> anyhow::Result<GeneratedImage> {
        photo.validate(MAX_PORTRAIT_SOURCE_BYTES, true)?;

        let mut form = reqwest::multipart::Form::new().part("file", photo.to_part()?);
        if let Some(feedback) = feedback.filter(|f| !f.trim().is_empty()) {
            form = form.text("feedback", feedback.to_string());
        }

        let resp = self
            .http
            .post(self.endpoint("/api/generate")?)
            .multipart(form)
            .send()
            .await
            .context("network error while generating portrait")?;
        let reply = Reply::read(resp).await?;
        if !reply.status.is_success() {
            bail!(reply.error_message("Generation failed"));
        }

        extract_image(reply.content_type.as_deref(), &reply.body)
            .ok_or_else(|| anyhow!("server answered without an image"))
    }

    /// Runs the whole listing flow: images first, then the caption.
    ///
    /// # Errors
    ///
    /// Fails on an incomplete form, an invalid photo, a non-2xx answer from
    /// either step, or when neither an image nor a caption could be extracted.
    pub async fn compose_listing<R: Rng + ?Sized>(
        &self,
        form: &ListingForm,
        photo: &ImageUpload,
        portrait: &ImageUpload,
        rng: &mut R,
    ) -> anyhow::Result<ListingPost> {
        let missing = form.missing_fields();
        if !missing.is_empty() {
            bail!("listing form is incomplete, missing: {}", missing.join(", "));
        }
        photo.validate(MAX_LISTING_PHOTO_BYTES, true)?;

        let images = reqwest::multipart::Form::new()
            .part("listingImage", photo.to_part()?)
            .part("portraitImage", portrait.to_part()?);
        let resp = self
            .http
            .post(self.endpoint("/api/listing/images")?)
            .multipart(images)
            .send()
            .await
            .context("network error while sending listing images")?;
        let images_reply = Reply::read(resp).await?;
        if !images_reply.status.is_success() {
            bail!(images_reply.error_message("Failed to upload images"));
        }

        let resp = self
            .http
            .post(self.endpoint("/api/listing/caption")?)
            .json(&form.caption_request())
            .send()
            .await
            .context("network error while sending caption data")?;
        let caption_reply = Reply::read(resp).await?;
        if !caption_reply.status.is_success() {
            bail!(caption_reply.error_message("Failed to send caption data"));
        }

        let caption_text = serde_json::from_slice::<JsonValue>(&caption_reply.body)
            .ok()
            .and_then(|v| extract_caption(&v))
            .unwrap_or_default();
        let image = extract_image(images_reply.content_type.as_deref(), &images_reply.body);
        tracing::debug!(
            has_image = image.is_some(),
            caption_chars = caption_text.chars().count(),
            "listing responses parsed"
        );

        if image.is_none() && caption_text.is_empty() {
            bail!("Could not extract image or caption from the responses");
        }
        Ok(ListingPost::compose(image, &caption_text, rng))
    }

    /// Loads a portrait from a path, an http(s) URL or a `data:` URL.
    ///
    /// # Errors
    ///
    /// Fails if the source cannot be read, downloaded or decoded.
    pub async fn load_portrait(&self, source: &str) -> anyhow::Result<ImageUpload> {
        let (content_type, data) = if source.starts_with("data:") {
            match decode_data_url(source) {
                Some(GeneratedImage::Inline { content_type, data }) => (content_type, data),
                _ => bail!("portrait data URL is not valid base64"),
            }
        } else if source.starts_with("http://") || source.starts_with("https://") {
            self.download(source).await?
        } else {
            let upload = ImageUpload::from_path(Path::new(source)).await?;
            (upload.content_type, upload.data)
        };
        Ok(ImageUpload {
            file_name: format!("portrait.{}", extension_for(&content_type)),
            content_type,
            data,
        })
    }

    async fn download(&self, url: &str) -> anyhow::Result<(String, Bytes)> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("downloading {url}"))?
            .error_for_status()?;
        let reply = Reply::read(resp).await?;
        let content_type = resolve_mime(reply.content_type.as_deref(), Some(url));
        Ok((content_type, reply.body))
    }

    /// Writes an image to `<stem>.<ext>`, downloading it first if it is a URL.
    ///
    /// # Errors
    ///
    /// Fails if the download or the write fails.
    pub async fn save_image(&self, image: &GeneratedImage, stem: &Path) -> anyhow::Result<PathBuf> {
        let (content_type, data) = match image {
            GeneratedImage::Inline { content_type, data } => (content_type.clone(), data.clone()),
            GeneratedImage::Url(url) => self.download(url).await?,
        };
        let path = stem.with_extension(extension_for(&content_type));
        tokio::fs::write(&path, &data)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}

/// File extension for a MIME type; `bin` when unknown.
#[must_use]
pub fn extension_for(content_type: &str) -> &'static str {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    match essence {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        _ => mime_guess::get_mime_extensions_str(essence)
            .and_then(|exts| exts.first().copied())
            .unwrap_or("bin"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions() {
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("image/png; charset=binary"), "png");
        assert_eq!(extension_for("application/x-unknown-thing"), "bin");
    }
}
