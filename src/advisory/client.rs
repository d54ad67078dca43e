//! HTTP client for an OpenAI-compatible chat-completions endpoint.

use super::{AdviceRequest, RemoteAdvisor};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::RgbImage;
use panocrop_core::core::config::AdvisoryConfig;
use panocrop_core::core::errors::{CropError, CropResult};
use panocrop_core::utils::encode_jpeg;
use reqwest::blocking::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

const ERROR_SNIPPET_CHARS: usize = 200;

const NETWORK_FAILURE: &str =
    "Network connection failed: check the network connection and DNS configuration";

fn snippet(text: &str) -> String {
    text.chars().take(ERROR_SNIPPET_CHARS).collect()
}

/// Prompt sent alongside the two images.
pub fn build_prompt(region_type: &str, coordinates: &str, context_text: &str) -> String {
    format!(
        "You are a professional photography composition coach. Write detailed, well-organized \
advice of at least 500 words as plain paragraphs, without any Markdown, lists or symbols.\n\
1. Strengths of the crop: name concrete qualities such as subject placement, balance and \
color transitions.\n\
2. Weaknesses of the crop: describe problems such as tight margins, awkward proportions or \
distracting background elements.\n\
3. Re-shooting advice: using the full panorama and the scene description, explain how to \
change the shooting angle, focal length, subject position and background, and why each \
change helps.\n\
4. Two or three extra techniques suited to the scene, such as use of light or layering.\n\
\n\
Additional information:\n\
- Crop region type: {}\n\
- Crop coordinates (top-left x,y; bottom-right x2,y2): {}\n\
- Scene description: {}",
        region_type, coordinates, context_text
    )
}

/// Turns an HTTP status and body into the advice text or an error description.
pub fn interpret_response(status: u16, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    if !(200..300).contains(&status) {
        let message = parsed
            .as_ref()
            .and_then(|v| v.pointer("/error/message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| snippet(body));
        return format!("HTTP error {}: {}", status, message);
    }
    let Some(value) = parsed else {
        return format!("API call failed: response is not JSON: {}", snippet(body));
    };
    match value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
    {
        Some(content) => content.trim().to_string(),
        None => format!("Unexpected response format: {}", snippet(&value.to_string())),
    }
}

/// Chat-completions advisor.
#[derive(Debug)]
pub struct ChatAdvisorClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    max_retries: u32,
    jpeg_quality: u8,
}

impl ChatAdvisorClient {
    /// Builds a client, or returns `None` when `config` carries no API key.
    pub fn from_config(config: &AdvisoryConfig) -> CropResult<Option<Self>> {
        let Some(api_key) = config.api_key.clone().filter(|k| !k.trim().is_empty()) else {
            debug!("no advisory API key configured, remote advice disabled");
            return Ok(None);
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CropError::config_error(format!("failed to build HTTP client: {}", e)))?;
        Ok(Some(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            jpeg_quality: config.jpeg_quality,
        }))
    }

    fn encode(&self, image: &RgbImage) -> Result<String, String> {
        encode_jpeg(image, self.jpeg_quality)
            .map(|bytes| STANDARD.encode(bytes))
            .map_err(|e| format!("image encoding failed: {}", e))
    }

    /// Request body for one advice call.
    pub fn request_body(&self, original_b64: &str, crop_b64: &str, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "stream": false,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "image_url", "image_url": format!("data:image/jpeg;base64,{}", original_b64) },
                    { "type": "image_url", "image_url": format!("data:image/jpeg;base64,{}", crop_b64) },
                    { "type": "text", "text": prompt },
                ],
            }],
        })
    }

    fn post(&self, body: &Value) -> String {
        let mut attempt = 0;
        loop {
            let result = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(body)
                .send();
            match result {
                Ok(response) => {
                    let status = response.status().as_u16();
                    debug!(status, "advisory response");
                    return match response.text() {
                        Ok(text) => interpret_response(status, &text),
                        Err(e) => format!("API call failed: {}", e),
                    };
                }
                Err(e) if e.is_connect() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(attempt, error = %e, "advisory connection failed, retrying");
                }
                Err(e) if e.is_connect() => return NETWORK_FAILURE.to_string(),
                Err(e) => return format!("API call failed: {}", e),
            }
        }
    }
}

impl RemoteAdvisor for ChatAdvisorClient {
    fn advise(&self, request: &AdviceRequest<'_>) -> String {
        let (original, crop) = match (self.encode(request.original), self.encode(request.crop)) {
            (Ok(original), Ok(crop)) => (original, crop),
            (original, crop) => {
                return format!(
                    "Image processing error: original ({}) | crop ({})",
                    original.err().unwrap_or_else(|| "ok".to_string()),
                    crop.err().unwrap_or_else(|| "ok".to_string())
                );
            }
        };
        let prompt = build_prompt(request.region_type, request.coordinates, request.context_text);
        self.post(&self.request_body(&original, &crop, &prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_response_is_trimmed() {
        let body = r#"{"choices":[{"message":{"content":"  Step left a little.  "}}]}"#;
        assert_eq!(interpret_response(200, body), "Step left a little.");
    }

    #[test]
    fn test_http_error_uses_api_message() {
        let body = r#"{"error":{"message":"invalid api key"}}"#;
        assert_eq!(interpret_response(401, body), "HTTP error 401: invalid api key");
        assert_eq!(interpret_response(502, "bad gateway"), "HTTP error 502: bad gateway");
    }

    #[test]
    fn test_missing_choices_reported() {
        let text = interpret_response(200, r#"{"choices":[]}"#);
        assert!(text.starts_with("Unexpected response format"));
    }

    #[test]
    fn test_disabled_without_api_key() -> CropResult<()> {
        assert!(ChatAdvisorClient::from_config(&AdvisoryConfig::default())?.is_none());
        Ok(())
    }

    #[test]
    fn test_request_body_layout() -> CropResult<()> {
        let config = AdvisoryConfig {
            api_key: Some("key".to_string()),
            ..Default::default()
        };
        let client = ChatAdvisorClient::from_config(&config)?.expect("client");
        let body = client.request_body("AAA", "BBB", "prompt");
        assert_eq!(body["max_tokens"], 2000);
        assert_eq!(body["stream"], false);
        let content = &body["messages"][0]["content"];
        assert_eq!(content[0]["image_url"], "data:image/jpeg;base64,AAA");
        assert_eq!(content[1]["image_url"], "data:image/jpeg;base64,BBB");
        assert_eq!(content[2]["text"], "prompt");
        Ok(())
    }

    #[test]
    fn test_prompt_mentions_region_details() {
        let prompt = build_prompt("object_person", "1,2,3,4", "facing east");
        assert!(prompt.contains("object_person"));
        assert!(prompt.contains("1,2,3,4"));
        assert!(prompt.contains("facing east"));
    }
}
