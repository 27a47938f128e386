//! Gemini `generateContent` client.

use super::prompt::build_prompt;
use super::{ContentGenerator, GenerationError};
use crate::api::models::content::{ContentRequest, ContentResponse};
use crate::config::GeminiConfig;
use crate::ingest::Bitmap;
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, instrument};
use url::Url;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Concrete [`ContentGenerator`] backed by the Generative Language REST API.
pub struct GeminiClient {
    client: Client,
    endpoint: Url,
    model: String,
    api_key: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> anyhow::Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow!("GEMINI_API_KEY is not set"))?
            .to_string();

        let model = config.model.trim().trim_start_matches("models/").to_string();
        if model.is_empty() {
            return Err(anyhow!("Gemini model name cannot be empty"));
        }

        let endpoint = ensure_slash(&config.api_base)
            .join(&format!("v1beta/models/{model}:generateContent"))
            .with_context(|| format!("Failed to construct generateContent URL for model {model}"))?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        debug!(%endpoint, "Configured Gemini client");

        Ok(Self {
            client,
            endpoint,
            model,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Makes sure a url has a trailing slash, so `join` appends instead of replacing the last segment.
fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let mut path = new_url.path().to_string();
        path.push('/');
        new_url.set_path(&path);
        new_url
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: SystemInstruction<'a>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Part<'a> {
    InlineData(InlineData),
    Text(&'a str),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// OpenAPI-subset schema of [`ContentResponse`], all fields required.
fn response_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "product_summary": { "type": "STRING" },
            "social_caption": { "type": "STRING" },
            "seo_description": { "type": "STRING" },
            "hashtags": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["product_summary", "social_caption", "seo_description", "hashtags"],
        "propertyOrdering": ["product_summary", "social_caption", "seo_description", "hashtags"]
    })
}

/// Text of the first candidate, or the reason there is none.
fn candidate_text(response: GenerateContentResponse) -> Result<String, GenerationError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .map(|reason| format!("prompt blocked: {reason}"))
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(GenerationError::EmptyResponse { reason });
    };

    let text: String = candidate
        .content
        .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate
            .finish_reason
            .map(|reason| format!("finish reason {reason}"))
            .unwrap_or_else(|| "candidate has no text".to_string());
        return Err(GenerationError::EmptyResponse { reason });
    }

    Ok(text)
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    #[instrument(skip_all, fields(model = %self.model, images = images.len()))]
    async fn generate(&self, images: &[Bitmap], request: &ContentRequest) -> Result<ContentResponse, GenerationError> {
        let prompt = build_prompt(request);
        debug!(style = ?prompt.style, "Built generation prompt");

        // Images first, in upload order, then the instructions
        let mut parts: Vec<Part<'_>> = images
            .iter()
            .map(|image| {
                Part::InlineData(InlineData {
                    mime_type: image.mime_type(),
                    data: STANDARD.encode(image.encoded()),
                })
            })
            .collect();
        parts.push(Part::Text(&prompt.user_prompt));

        let body = GenerateContentRequest {
            contents: vec![Content { role: "user", parts }],
            system_instruction: SystemInstruction {
                parts: vec![Part::Text(prompt.system_instruction)],
            },
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: response_schema(),
            },
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(GenerationError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, url = %self.endpoint, "Gemini generateContent request failed");
            return Err(GenerationError::Upstream { status, body });
        }

        let body_text = response.text().await.map_err(GenerationError::from_transport)?;
        debug!("generateContent response body: {}", body_text);

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body_text).map_err(GenerationError::MalformedResponse)?;
        let text = candidate_text(parsed)?;

        serde_json::from_str::<ContentResponse>(&text).map_err(|e| {
            error!(error = %e, "Generated content did not match the response schema");
            GenerationError::MalformedOutput(e)
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}
