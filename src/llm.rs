// llm.rs - Best-effort LLM field extraction over page text
//
// The language model is an untrusted collaborator: any timeout, transport
// error, empty reply, or non-JSON payload is treated as "no extraction" and
// the pipeline continues on the deterministic sources alone. Returned values
// are only annotated with a position when they can be located verbatim in
// the submitted text; paraphrased values keep a whole-text fallback span.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum page text submitted per request, to keep prompts bounded.
const MAX_PROMPT_TEXT_CHARS: usize = 6000;

/// One extracted field with model-reported confidence on a 0-100 scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmField {
    pub value: String,

    /// Model-reported confidence, clamped to [0, 100]
    pub confidence: f64,

    /// Short surrounding context the model quoted for the value
    #[serde(default)]
    pub context: String,

    /// (start, end) byte offsets of the value within the submitted text.
    /// Falls back to (0, text length) when the value is not found verbatim.
    #[serde(skip_deserializing)]
    pub position: (usize, usize),
}

/// Field-name to LlmField mapping for one extraction call.
/// Empty when the collaborator failed or returned nothing usable.
pub type LlmExtraction = BTreeMap<String, LlmField>;

/// Chat-completions client for the field-extraction collaborator.
pub struct LlmClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl LlmClient {
    pub fn new(
        endpoint: String,
        model: String,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| anyhow!("Failed to build LLM HTTP client: {}", e))?;

        Ok(Self {
            client,
            endpoint,
            model,
            api_key,
        })
    }

    /// Ask the model to pull the schema's fields out of the text.
    /// Never fails: any collaborator problem yields an empty extraction.
    pub async fn extract_fields(
        &self,
        text: &str,
        schema: &BTreeMap<String, String>,
        domain: Option<&str>,
    ) -> LlmExtraction {
        if text.trim().is_empty() || schema.is_empty() {
            return LlmExtraction::new();
        }

        match self.request_fields(text, schema, domain).await {
            Ok(fields) => verify_fields(text, fields),
            Err(e) => {
                warn!("LLM extraction failed, continuing without it: {}", e);
                LlmExtraction::new()
            }
        }
    }

    async fn request_fields(
        &self,
        text: &str,
        schema: &BTreeMap<String, String>,
        domain: Option<&str>,
    ) -> Result<BTreeMap<String, RawField>> {
        let prompt = build_prompt(text, schema, domain);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You extract structured fields from web page text. \
                              Respond with a single JSON object and nothing else."
                        .to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.0,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| anyhow!("LLM request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!("LLM returned status {}", response.status()));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("LLM response was not valid JSON: {}", e))?;

        let content = chat
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .ok_or_else(|| anyhow!("LLM response had no message content"))?;

        parse_field_payload(content)
    }
}

/// Field shape as the model reports it, before position verification.
#[derive(Debug, Deserialize)]
struct RawField {
    value: Option<String>,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    context: String,
}

fn build_prompt(text: &str, schema: &BTreeMap<String, String>, domain: Option<&str>) -> String {
    let mut truncated = text;
    if truncated.len() > MAX_PROMPT_TEXT_CHARS {
        let mut end = MAX_PROMPT_TEXT_CHARS;
        while end > 0 && !truncated.is_char_boundary(end) {
            end -= 1;
        }
        truncated = &truncated[..end];
    }

    let mut prompt = String::new();
    if let Some(d) = domain {
        prompt.push_str(&format!("The text below comes from the website {}.\n", d));
    }
    prompt.push_str(
        "Extract the following fields from the text. For each field return an \
         object {\"value\": string or null, \"confidence\": 0-100, \"context\": \
         short quote around the value}. Use null for fields that are absent.\n\nFields:\n",
    );
    for (name, description) in schema {
        prompt.push_str(&format!("- {}: {}\n", name, description));
    }
    prompt.push_str("\nText:\n");
    prompt.push_str(truncated);
    prompt
}

/// Parse the model's reply into raw fields, tolerating markdown code fences.
fn parse_field_payload(content: &str) -> Result<BTreeMap<String, RawField>> {
    let stripped = strip_code_fence(content);
    serde_json::from_str(stripped)
        .map_err(|e| anyhow!("LLM payload was not the expected JSON object: {}", e))
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Attach positions: a verbatim match anchors the field at its offsets,
/// otherwise the field keeps a whole-text span. Null values are dropped.
fn verify_fields(text: &str, raw: BTreeMap<String, RawField>) -> LlmExtraction {
    let mut verified = LlmExtraction::new();
    for (name, field) in raw {
        let value = match field.value {
            Some(v) if !v.trim().is_empty() => v,
            _ => continue,
        };

        let position = match text.find(&value) {
            Some(start) => (start, start + value.len()),
            None => {
                debug!("LLM value for '{}' not found verbatim in text", name);
                (0, text.len())
            }
        };

        verified.insert(
            name,
            LlmField {
                value,
                confidence: field.confidence.clamp(0.0, 100.0),
                context: field.context,
                position,
            },
        );
    }
    verified
}
