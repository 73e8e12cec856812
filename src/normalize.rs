//! Best-effort extraction of captions and images from webhook responses.
//!
//! The automation workflows behind the webhooks have changed shape over time
//! (plain strings, JSON-in-a-string, Gemini `candidates`, arrays of content
//! blocks, base64 payloads). Everything here tolerates all of them.

use axum::body::Bytes;
use base64::{
    Engine as _, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use regex::Regex;
use serde_json::Value as JsonValue;
use std::sync::LazyLock;

const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Standard alphabet, padding optional.
const LENIENT_B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decodes base64 the way browsers do for data URLs: embedded whitespace
/// (line-wrapped payloads) is ignored and `=` padding is optional.
fn decode_lenient(payload: &str) -> Option<Vec<u8>> {
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    LENIENT_B64.decode(compact).ok()
}

/// Image produced by a webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedImage {
    Url(String),
    Inline { content_type: String, data: Bytes },
}

fn non_empty_str(v: Option<&JsonValue>) -> Option<&str> {
    v.and_then(JsonValue::as_str).filter(|s| !s.is_empty())
}

fn content_parts(v: &JsonValue) -> Option<&JsonValue> {
    v.pointer("/content/parts").filter(|p| p.is_array())
}

/// Concatenates the non-empty `text` fields of a `parts` array.
fn join_parts(parts: &JsonValue) -> Option<String> {
    let joined: String = parts
        .as_array()?
        .iter()
        .filter_map(|p| non_empty_str(p.get("text")))
        .collect();
    Some(joined)
}

/// Gemini-style `{candidates: [{content: {parts: [...]}}]}` or a bare
/// `[{content: {parts: [...]}}]` array.
fn caption_from_candidates(data: &JsonValue) -> Option<String> {
    if let Some(first) = data
        .get("candidates")
        .and_then(JsonValue::as_array)
        .and_then(|c| c.first())
    {
        if let Some(parts) = content_parts(first) {
            return join_parts(parts);
        }
        return non_empty_str(first.get("text")).map(ToString::to_string);
    }
    if let Some(parts) = data
        .as_array()
        .and_then(|a| a.first())
        .and_then(content_parts)
    {
        return join_parts(parts);
    }
    None
}

fn caption_from_embedded(data: &JsonValue, caption: &str) -> Option<String> {
    let Ok(parsed) = serde_json::from_str::<JsonValue>(caption) else {
        return Some(caption.to_string());
    };
    if !(parsed.is_object() || parsed.is_array()) {
        return Some(caption.to_string());
    }
    if let Some(msg) = non_empty_str(parsed.get("message")) {
        return Some(msg.to_string());
    }
    if let Some(inner) = non_empty_str(parsed.get("caption")) {
        return Some(inner.to_string());
    }
    // The workflow echoed its input; the generated text sits in `raw`.
    data.get("raw").and_then(caption_from_candidates)
}

/// Finds the caption text in a caption-webhook response.
///
/// Returns `None` when no shape matched or the text found was empty.
#[must_use]
pub fn extract_caption(data: &JsonValue) -> Option<String> {
    let found = if let Some(caption) = non_empty_str(data.get("caption")) {
        caption_from_embedded(data, caption)
    } else if data
        .get("candidates")
        .and_then(JsonValue::as_array)
        .is_some_and(|c| !c.is_empty())
        || data
            .as_array()
            .and_then(|a| a.first())
            .is_some_and(|f| content_parts(f).is_some())
    {
        caption_from_candidates(data)
    } else {
        non_empty_str(data.get("message")).map(ToString::to_string)
    };
    found.filter(|s| !s.is_empty())
}

/// Parses `data:<mime>;base64,<payload>`.
#[must_use]
pub fn decode_data_url(url: &str) -> Option<GeneratedImage> {
    let rest = url.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    let data = decode_lenient(payload)?;
    Some(GeneratedImage::Inline {
        content_type: if mime.is_empty() {
            DEFAULT_IMAGE_MIME.to_string()
        } else {
            mime.to_string()
        },
        data: Bytes::from(data),
    })
}

fn decode_base64(payload: &str, mime: Option<&str>) -> Option<GeneratedImage> {
    let data = decode_lenient(payload)?;
    Some(GeneratedImage::Inline {
        content_type: mime.unwrap_or(DEFAULT_IMAGE_MIME).to_string(),
        data: Bytes::from(data),
    })
}

fn image_from_json(data: &JsonValue) -> Option<GeneratedImage> {
    let url = non_empty_str(data.get("imageUrl"))
        .or_else(|| non_empty_str(data.get("url")))
        .or_else(|| non_empty_str(data.pointer("/result/imageUrl")));
    if let Some(url) = url {
        return Some(GeneratedImage::Url(url.to_string()));
    }

    let mime = non_empty_str(data.get("mimeType"));
    if let Some(inline) = data
        .get("data")
        .and_then(JsonValue::as_str)
        .filter(|s| s.starts_with("data:image"))
    {
        return decode_data_url(inline);
    }
    if let Some(b64) = non_empty_str(data.get("base64")) {
        return decode_base64(b64, mime);
    }
    if let Some(raw) = non_empty_str(data.get("imageData")) {
        return if raw.starts_with("data:") {
            decode_data_url(raw)
        } else {
            decode_base64(raw, mime)
        };
    }
    tracing::warn!(
        keys = ?data.as_object().map(|o| o.keys().cloned().collect::<Vec<_>>()),
        "image response JSON has no image data"
    );
    None
}

/// Finds the generated image in a portrait or listing-image response.
#[must_use]
pub fn extract_image(content_type: Option<&str>, body: &Bytes) -> Option<GeneratedImage> {
    let ct = content_type.unwrap_or("");
    if ct.contains("application/json") {
        let data: JsonValue = serde_json::from_slice(body).ok()?;
        return image_from_json(&data);
    }
    if body.is_empty() {
        return None;
    }
    let content_type = if ct.starts_with("image/") {
        ct.split(';').next().unwrap_or(ct).trim().to_string()
    } else {
        "application/octet-stream".to_string()
    };
    Some(GeneratedImage::Inline {
        content_type,
        data: body.clone(),
    })
}

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("static regex"));

/// Splits a caption into its leading call-to-action paragraph and the rest.
///
/// The CTA loses one trailing period. With no paragraphs the CTA is empty.
#[must_use]
pub fn split_cta(caption: &str) -> (String, String) {
    let paragraphs: Vec<&str> = PARAGRAPH_BREAK
        .split(caption)
        .filter(|p| !p.trim().is_empty())
        .collect();
    let Some((first, rest)) = paragraphs.split_first() else {
        return (String::new(), caption.to_string());
    };
    let first = first.trim();
    let cta = first.strip_suffix('.').unwrap_or(first).to_string();
    (cta, rest.join("\n\n").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD as B64;
    use serde_json::json;

    #[test]
    fn plain_caption_string() {
        let data = json!({"caption": "Lindo apartamento!"});
        assert_eq!(extract_caption(&data).as_deref(), Some("Lindo apartamento!"));
    }

    #[test]
    fn caption_with_embedded_message() {
        let data = json!({"caption": "{\"message\":\"Agende já\"}"});
        assert_eq!(extract_caption(&data).as_deref(), Some("Agende já"));
        let data = json!({"caption": "{\"caption\":\"Vista incrível\"}"});
        assert_eq!(extract_caption(&data).as_deref(), Some("Vista incrível"));
    }

    #[test]
    fn echoed_input_falls_back_to_raw_candidates() {
        let data = json!({
            "caption": "{\"title\":\"Apto\",\"price\":\"1\"}",
            "raw": {"candidates": [{"content": {"parts": [
                {"text": "Olá "},
                {"text": ""},
                {"text": "mundo"}
            ]}}]}
        });
        assert_eq!(extract_caption(&data).as_deref(), Some("Olá mundo"));

        let data = json!({
            "caption": "{\"title\":\"Apto\"}",
            "raw": [{"content": {"parts": [{"text": "antigo"}]}}]
        });
        assert_eq!(extract_caption(&data).as_deref(), Some("antigo"));
    }

    #[test]
    fn echoed_input_without_raw_yields_nothing() {
        let data = json!({"caption": "{\"title\":\"Apto\"}"});
        assert_eq!(extract_caption(&data), None);
    }

    #[test]
    fn json_scalar_caption_is_kept_verbatim() {
        let data = json!({"caption": "42"});
        assert_eq!(extract_caption(&data).as_deref(), Some("42"));
        let data = json!({"caption": "null"});
        assert_eq!(extract_caption(&data).as_deref(), Some("null"));
    }

    #[test]
    fn top_level_candidates_and_arrays() {
        let data = json!({"candidates": [{"text": "direto"}]});
        assert_eq!(extract_caption(&data).as_deref(), Some("direto"));
        let data = json!([{"content": {"parts": [{"text": "a"}, {"text": "b"}]}}]);
        assert_eq!(extract_caption(&data).as_deref(), Some("ab"));
    }

    #[test]
    fn message_is_last_resort() {
        let data = json!({"message": "Workflow was started"});
        assert_eq!(extract_caption(&data).as_deref(), Some("Workflow was started"));
        let data = json!({"caption": "", "message": "m"});
        assert_eq!(extract_caption(&data).as_deref(), Some("m"));
        assert_eq!(extract_caption(&json!({"candidates": []})), None);
        assert_eq!(extract_caption(&json!({"other": 1})), None);
    }

    #[test]
    fn image_url_fields_in_priority_order() {
        let body = Bytes::from(r#"{"url":"b","result":{"imageUrl":"c"}}"#);
        assert_eq!(
            extract_image(Some("application/json; charset=utf-8"), &body),
            Some(GeneratedImage::Url("b".into()))
        );
        let body = Bytes::from(r#"{"result":{"imageUrl":"c"}}"#);
        assert_eq!(
            extract_image(Some("application/json"), &body),
            Some(GeneratedImage::Url("c".into()))
        );
    }

    #[test]
    fn base64_payload_variants() {
        let png = B64.encode(b"png-bytes");
        let body = Bytes::from(json!({"base64": png, "mimeType": "image/jpeg"}).to_string());
        assert_eq!(
            extract_image(Some("application/json"), &body),
            Some(GeneratedImage::Inline {
                content_type: "image/jpeg".into(),
                data: Bytes::from_static(b"png-bytes"),
            })
        );

        let body = Bytes::from(json!({"imageData": png}).to_string());
        assert!(matches!(
            extract_image(Some("application/json"), &body),
            Some(GeneratedImage::Inline { ref content_type, .. }) if content_type == "image/png"
        ));

        let data_url = format!("data:image/webp;base64,{png}");
        let body = Bytes::from(json!({ "data": data_url }).to_string());
        assert!(matches!(
            extract_image(Some("application/json"), &body),
            Some(GeneratedImage::Inline { ref content_type, .. }) if content_type == "image/webp"
        ));
    }

    fn inline_png(data: &'static [u8]) -> Option<GeneratedImage> {
        Some(GeneratedImage::Inline {
            content_type: "image/png".into(),
            data: Bytes::from_static(data),
        })
    }

    #[test]
    fn wrapped_base64_is_decoded() {
        let body = Bytes::from(json!({"base64": "aGVsbG8g\nd29ybGQ="}).to_string());
        assert_eq!(extract_image(Some("application/json"), &body), inline_png(b"hello world"));

        let body = Bytes::from(
            json!({"data": "data:image/png;base64,aGVs\r\nbG8g d29y\nbGQ="}).to_string(),
        );
        assert_eq!(extract_image(Some("application/json"), &body), inline_png(b"hello world"));
    }

    #[test]
    fn unpadded_base64_is_decoded() {
        let body = Bytes::from(json!({"base64": "aGVsbG8"}).to_string());
        assert_eq!(extract_image(Some("application/json"), &body), inline_png(b"hello"));

        assert_eq!(decode_data_url("data:image/png;base64,aGVsbG8"), inline_png(b"hello"));
    }

    #[test]
    fn empty_base64_falls_through_to_image_data() {
        let body = Bytes::from(json!({"base64": "", "imageData": "aGVsbG8="}).to_string());
        assert_eq!(extract_image(Some("application/json"), &body), inline_png(b"hello"));
    }

    #[test]
    fn binary_bodies() {
        let body = Bytes::from_static(b"\x89PNG");
        assert!(matches!(
            extract_image(Some("image/png"), &body),
            Some(GeneratedImage::Inline { ref content_type, .. }) if content_type == "image/png"
        ));
        assert!(matches!(
            extract_image(None, &body),
            Some(GeneratedImage::Inline { ref content_type, .. })
                if content_type == "application/octet-stream"
        ));
        assert_eq!(extract_image(Some("image/png"), &Bytes::new()), None);
        assert_eq!(
            extract_image(Some("application/json"), &Bytes::from_static(b"{}")),
            None
        );
    }

    #[test]
    fn cta_is_first_paragraph() {
        let (cta, rest) = split_cta("Agende uma visita.\n\nApartamento lindo.\n  \nLigue já!");
        assert_eq!(cta, "Agende uma visita");
        assert_eq!(rest, "Apartamento lindo.\n\nLigue já!");
    }

    #[test]
    fn single_paragraph_leaves_empty_rest() {
        let (cta, rest) = split_cta("Só uma linha.");
        assert_eq!(cta, "Só uma linha");
        assert_eq!(rest, "");
        let (cta, rest) = split_cta("   ");
        assert_eq!(cta, "");
        assert_eq!(rest, "   ");
    }
}
