use std::future::Future;

use log::{debug, error};
use serde_json::Value;

pub const DEFAULT_TRANSLATE_URL: &str = "https://translate.googleapis.com";

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("Translation request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Unexpected translation response: {0}")]
    UnexpectedResponse(String),
}

/// Something that can translate text into a target language.
pub trait Translator: Send + Sync + 'static {
    /// Translates `text` into `language` (an ISO 639-1 code such as `"fr"`).
    fn translate(
        &self,
        text: &str,
        language: &str,
    ) -> impl Future<Output = Result<String, TranslateError>> + Send;
}

/// Calls a Google-Translate-compatible `translate_a/single` endpoint.
#[derive(Debug, Clone)]
pub struct HttpTranslator {
    client: reqwest::Client,
    base_url: String,
}

impl Default for HttpTranslator {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSLATE_URL)
    }
}

impl HttpTranslator {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Translator for HttpTranslator {
    async fn translate(&self, text: &str, language: &str) -> Result<String, TranslateError> {
        let url = format!("{}/translate_a/single", self.base_url);
        debug!("Translating {} chars to '{}' via {}", text.len(), language, url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", language),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?
            .error_for_status()?;
        let body: Value = response.json().await?;
        parse_translation(&body).map_err(|e| {
            error!("Could not parse translation response: {}", e);
            e
        })
    }
}

/// Joins the translated segments of a `[[["segment", "source", ...], ...], ...]` payload.
pub(crate) fn parse_translation(body: &Value) -> Result<String, TranslateError> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslateError::UnexpectedResponse("missing segment list".into()))?;
    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();
    if translated.is_empty() && !segments.is_empty() {
        return Err(TranslateError::UnexpectedResponse("segments carry no text".into()));
    }
    Ok(translated)
}
