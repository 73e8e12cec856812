use anyhow::Context;
use axum::body::Bytes;
use axum::http::StatusCode;
use serde_json::Value as JsonValue;
use std::time::Duration;
use url::Url;

use crate::config::Config;

/// One external automation webhook.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    pub name: &'static str,
    pub url: Url,
    /// Pre-built `Authorization` header value.
    pub auth: Option<String>,
    pub timeout: Duration,
}

/// Buffered upstream answer.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl UpstreamResponse {
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json"))
    }

    #[must_use]
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

/// The three webhooks the service talks to.
#[derive(Debug, Clone)]
pub struct Webhooks {
    pub portrait: WebhookClient,
    pub listing_images: WebhookClient,
    pub listing_caption: WebhookClient,
}

impl Webhooks {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let auth = config.basic_auth();
        let timeout = config.upstream_timeout();
        let hook = |name, url: &Url| WebhookClient {
            name,
            url: url.clone(),
            auth: auth.clone(),
            timeout,
        };
        Self {
            portrait: hook("portrait", &config.portrait_webhook_url),
            listing_images: hook("listing-images", &config.listing_images_webhook_url),
            listing_caption: hook("listing-caption", &config.listing_caption_webhook_url),
        }
    }
}

impl WebhookClient {
    /// # Errors
    ///
    /// Will return err if the webhook cannot be reached or its body cannot be read.
    pub async fn post_multipart(
        &self,
        http: &reqwest::Client,
        form: reqwest::multipart::Form,
    ) -> anyhow::Result<UpstreamResponse> {
        let req = http.post(self.url.clone()).multipart(form);
        self.send(req).await
    }

    /// # Errors
    ///
    /// Will return err if the webhook cannot be reached or its body cannot be read.
    pub async fn post_json(
        &self,
        http: &reqwest::Client,
        body: &JsonValue,
    ) -> anyhow::Result<UpstreamResponse> {
        let req = http
            .post(self.url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(body);
        self.send(req).await
    }

    async fn send(&self, mut req: reqwest::RequestBuilder) -> anyhow::Result<UpstreamResponse> {
        req = req.timeout(self.timeout);
        if let Some(auth) = &self.auth {
            req = req.header(reqwest::header::AUTHORIZATION, auth);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("{} webhook request failed", self.name))?;
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let body = resp
            .bytes()
            .await
            .with_context(|| format!("{} webhook body read failed", self.name))?;

        tracing::info!(
            webhook = self.name,
            status = %status,
            content_type = content_type.as_deref().unwrap_or("-"),
            bytes = body.len(),
            "webhook responded"
        );

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}
