//! Gemini Provider
//!
//! 调用 Google Gemini `generateContent` 接口。API 密钥通过
//! `x-goog-api-key` 头发送，不会出现在 URL 或日志中。

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Generation, GenerationParams, TextProvider, Usage};

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiProvider {
    client: Client,
    api_base: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(
        api_base: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
        disable_tls_verify: bool,
    ) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("card-forge/", env!("CARGO_PKG_VERSION")));

        if disable_tls_verify {
            tracing::warn!("TLS certificate verification is DISABLED - for debugging only!");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().context("Failed to create Gemini HTTP client")?;

        Ok(Self {
            client,
            api_base: api_base.into(),
            model: model.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

impl<'a> GenerateContentRequest<'a> {
    fn new(prompt: &'a str, params: &GenerationParams) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![TextPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: params.temperature,
                max_output_tokens: params.max_output_tokens,
                thinking_config: params
                    .thinking_budget
                    .map(|thinking_budget| ThinkingConfig { thinking_budget }),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
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
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    thoughts_token_count: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl GenerateContentResponse {
    /// 拼接第一个 candidate 中所有非 thought 的文本片段
    fn visible_text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts
            .iter()
            .filter(|p| !p.thought)
            .filter_map(|p| p.text.as_deref())
            .collect();

        (!text.is_empty()).then_some(text)
    }

    fn into_generation(self) -> Generation {
        let text = self.visible_text();
        let finish_reason = self
            .candidates
            .first()
            .and_then(|c| c.finish_reason.clone());
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);
        let usage = self
            .usage_metadata
            .map(|u| Usage {
                prompt_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
                thoughts_tokens: u.thoughts_token_count,
            })
            .unwrap_or_default();

        Generation {
            text,
            finish_reason,
            block_reason,
            usage,
        }
    }
}

/// 将上游错误体整理成一行信息；优先使用结构化的 `error.status` 与 `error.message`
fn describe_error(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { error }) if !error.status.is_empty() => {
            format!("Gemini API error {}: [{}] {}", status, error.status, error.message)
        }
        Ok(ErrorEnvelope { error }) => format!("Gemini API error {}: {}", status, error.message),
        Err(_) => format!("Gemini API error {}: {}", status, body.trim()),
    }
}

#[async_trait]
impl TextProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        api_key: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<Generation> {
        let body = GenerateContentRequest::new(prompt, params);

        tracing::debug!(
            model = %self.model,
            temperature = params.temperature,
            max_output_tokens = params.max_output_tokens,
            thinking_budget = ?params.thinking_budget,
            "request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!(describe_error(status, &error_body));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse Gemini API response")?;

        let generation = parsed.into_generation();

        tracing::info!(
            model = %self.model,
            finish_reason = generation.finish_reason.as_deref().unwrap_or("none"),
            block_reason = generation.block_reason.as_deref().unwrap_or("none"),
            prompt_tokens = generation.usage.prompt_tokens,
            output_tokens = generation.usage.output_tokens,
            thoughts_tokens = generation.usage.thoughts_tokens,
            "response"
        );

        Ok(generation)
    }
}
