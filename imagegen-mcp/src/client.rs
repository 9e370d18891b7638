//! HTTP client for the laozhang.ai image generation gateway.
//!
//! The gateway speaks Google's Gemini content-generation wire format for
//! images and an OpenAI-compatible chat completions format for text. Image
//! parameters (aspectRatio, imageSize) are nested inside imageConfig. The
//! image model returns exactly one image per request; batches are issued as
//! sequential calls by the handler.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use imagegen_mcp_common::error::Error;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Path of the Gemini image generation endpoint.
pub const GENERATE_PATH: &str = "/v1beta/models/gemini-3-pro-image-preview:generateContent";

/// Path of the chat completions endpoint used for prompt diversification.
pub const CHAT_PATH: &str = "/v1/chat/completions";

/// Model used to rewrite prompts for diversified batches.
const VARIATION_MODEL: &str = "gpt-4o-mini";

// Image generation can take a while; chat completions are fast.
const GENERATE_TIMEOUT: Duration = Duration::from_secs(120);
const CHAT_TIMEOUT: Duration = Duration::from_secs(30);

/// A reference image attached to a variation request.
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Client for the image generation gateway.
pub struct GenApiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GenApiClient {
    /// Create a new client. `base_url` must not end with a slash.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Generate a single image from a prompt, optionally guided by reference
    /// images.
    #[instrument(level = "debug", skip_all, fields(aspect_ratio, size, refs = reference_images.len()))]
    pub async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: &str,
        size: &str,
        reference_images: &[ReferenceImage],
    ) -> Result<Vec<u8>, Error> {
        let endpoint = format!("{}{}", self.base_url, GENERATE_PATH);
        let body = build_generate_body(prompt, aspect_ratio, size, reference_images);

        debug!(endpoint = %endpoint, "Calling image generation API");
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .timeout(GENERATE_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::api(&endpoint, 401, "Invalid API key"));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::api(
                &endpoint,
                429,
                "Rate limit exceeded. Please wait before trying again.",
            ));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::api(&endpoint, status.as_u16(), api_error_message(&text)));
        }

        let data: GenerateContentResponse = response.json().await.map_err(|e| {
            Error::api(&endpoint, status.as_u16(), format!("Failed to parse API response: {}", e))
        })?;

        extract_image(&endpoint, data)
    }

    /// Ask the chat model for `count` rewrites of a prompt whose divergence
    /// scales with `diversity` (0.0 subtle, 1.0 creative reinterpretation).
    #[instrument(level = "debug", skip(self, base_prompt))]
    pub async fn prompt_variations(
        &self,
        base_prompt: &str,
        count: usize,
        diversity: f64,
    ) -> Result<Vec<String>, Error> {
        let endpoint = format!("{}{}", self.base_url, CHAT_PATH);

        let system_prompt = format!(
            "You generate variations of image prompts. Diversity level: {:.1}\n\n\
             - 0.0-0.3 (low): Subtle changes - lighting, time of day, minor details\n\
             - 0.4-0.6 (medium): Change style, mood, setting, or composition\n\
             - 0.7-1.0 (high): Creative reinterpretation, keep core subject\n\n\
             Generate exactly {} variations. Return JSON only:\n\
             {{\"variations\": [\"prompt1\", \"prompt2\", ...]}}",
            diversity, count
        );

        let body = ChatRequest {
            model: VARIATION_MODEL,
            messages: vec![
                ChatMessage { role: "system", content: system_prompt },
                ChatMessage { role: "user", content: base_prompt.to_string() },
            ],
            response_format: ResponseFormat { kind: "json_object" },
            // Scale temperature with diversity: 0.7-1.0
            temperature: 0.7 + diversity * 0.3,
        };

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .timeout(CHAT_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::api(&endpoint, status.as_u16(), api_error_message(&text)));
        }

        let data: ChatResponse = response.json().await.map_err(|e| {
            Error::api(&endpoint, status.as_u16(), format!("Failed to parse LLM response: {}", e))
        })?;

        let content = data
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::api(&endpoint, 200, "No choices in LLM response"))?;

        let parsed: VariationList = serde_json::from_str(&content).map_err(|e| {
            Error::api(&endpoint, 200, format!("Failed to parse LLM response: {}", e))
        })?;

        if parsed.variations.len() != count {
            return Err(Error::api(
                &endpoint,
                200,
                format!("Expected {} variations, got {}", count, parsed.variations.len()),
            ));
        }

        Ok(parsed.variations)
    }
}

fn map_send_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::transport("Request timed out. Try a smaller image size or simpler prompt.")
    } else {
        Error::transport(format!("Network error: {}", e))
    }
}

/// Pull `error.message` out of an error payload, falling back to the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")?
                .get("message")?
                .as_str()
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Build the generateContent request body. Reference image parts precede the
/// text prompt part.
fn build_generate_body(
    prompt: &str,
    aspect_ratio: &str,
    size: &str,
    reference_images: &[ReferenceImage],
) -> GenerateContentRequest {
    let mut parts: Vec<RequestPart> = reference_images
        .iter()
        .map(|img| RequestPart {
            inline_data: Some(InlineData {
                mime_type: img.mime_type.clone(),
                data: BASE64.encode(&img.data),
            }),
            text: None,
        })
        .collect();

    parts.push(RequestPart {
        inline_data: None,
        text: Some(prompt.to_string()),
    });

    GenerateContentRequest {
        contents: vec![RequestContent { parts }],
        generation_config: GenerationConfig {
            response_modalities: vec!["TEXT", "IMAGE"],
            image_config: ImageConfig {
                aspect_ratio: aspect_ratio.to_string(),
                image_size: size.to_string(),
            },
        },
    }
}

/// Find the first image part among the candidates and decode it.
fn extract_image(endpoint: &str, response: GenerateContentResponse) -> Result<Vec<u8>, Error> {
    if response.candidates.is_empty() {
        return Err(Error::api(endpoint, 200, "No candidates in API response"));
    }

    for candidate in response.candidates {
        for part in candidate.content.parts {
            let Some(inline) = part.inline_data else {
                continue;
            };
            if inline.mime_type.starts_with("image/") && !inline.data.is_empty() {
                return BASE64.decode(inline.data.as_bytes()).map_err(|e| {
                    Error::api(endpoint, 200, format!("Invalid base64 image data: {}", e))
                });
            }
        }
    }

    Err(Error::api(endpoint, 200, "No image found in API response"))
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
    image_config: ImageConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: String,
    image_size: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Deserialize, Default)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct VariationList {
    #[serde(default)]
    variations: Vec<String>,
}
