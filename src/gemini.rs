//! Gemini API client for explanation enrichment
//!
//! The generative model only ever adds free-text explanation to an already
//! scored finding; it never participates in scoring. Uses a long-lived
//! reqwest::Client for connection pooling.

use crate::error::BodyguardError;
use crate::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

/// Reusable Gemini client (connection-pooled).
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url: "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent".to_string(),
        }
    }

    /// Build a client from `GEMINI_API_KEY`, or None when unset. The rest
    /// of the system runs fully without it.
    pub fn from_env() -> Option<Self> {
        match std::env::var("GEMINI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Some(Self::new(key)),
            _ => None,
        }
    }

    /// Generate a short explanation for the given prompt.
    pub async fn generate(&self, prompt: &str, system_instruction: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(BodyguardError::Generation(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let url = format!("{}?key={}", self.base_url, self.api_key);

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.3,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 512,
            },
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: system_instruction.to_string(),
                }],
            },
        };

        info!("Calling Gemini API");

        let response = self.client.post(&url).json(&request).send().await.map_err(|e| {
            error!("Gemini API request failed: {}", e);
            BodyguardError::Generation(format!("Gemini API error: {}", e))
        })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response: {}", error_text);
            return Err(BodyguardError::Generation(format!(
                "Gemini API error: {}",
                error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            BodyguardError::Generation(format!("Gemini parse error: {}", e))
        })?;

        let answer = gemini_response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| BodyguardError::Generation("Empty response from Gemini".to_string()))?;

        Ok(answer)
    }
}

/// Canned explanation used when no API key is configured or the call fails.
/// Keyed on the dominant topic of the content.
pub fn fallback_response(content: &str) -> String {
    let text = content.to_lowercase();
    if text.contains("kyc") {
        "Banks never ask you to update KYC through links or apps. Visit your branch or use the official app directly.".to_string()
    } else if text.contains("fraud") || text.contains("scam") {
        "This message shows classic signs of a financial scam. Do not act on it, and report it to the cyber crime helpline 1930.".to_string()
    } else if text.contains("otp") || text.contains("pin") {
        "Never share OTPs, PINs, or passwords with anyone. No legitimate organisation will ask for them.".to_string()
    } else {
        "Be cautious with unsolicited financial messages. Verify independently through official channels before acting.".to_string()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    system_instruction: SystemInstruction,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "Explain this scam".to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.3,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 512,
            },
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: "You are a fraud-awareness assistant".to_string(),
                }],
            },
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("Explain this scam"));
        assert!(json.contains("generationConfig"));
        assert!(json.contains("maxOutputTokens"));
    }

    #[test]
    fn test_fallback_keys_on_topic() {
        assert!(fallback_response("please update your kyc").contains("KYC"));
        assert!(fallback_response("share your otp").contains("OTP"));
        assert!(fallback_response("this is a scam call").contains("1930"));
        assert!(!fallback_response("hello").is_empty());
    }
}
