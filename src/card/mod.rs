//! 卡片生成
//!
//! 用固定 prompt 请求上游生成一句设计思维卡片文案，并将结果或错误
//! 归一化为 JSON 信封。每次调用相互独立，不共享可变状态。

mod error;

pub use error::CardError;

use anyhow::Result;
use http::StatusCode;
use serde::Serialize;
use std::sync::Arc;

use crate::config::Config;
use crate::providers::{GeminiProvider, GenerationParams, TextProvider};

/// 发送给上游的固定 prompt
pub const PROMPT: &str = "Generate a single, unique, creative constraint or unexpected idea starter for a design thinking workshop. The output must be concise, highly specific, and actionable. Maximum length is 7 words. Must be a standalone phrase. Ensure the context is professional yet surprising (e.g., 'Involve a quantum computer' or 'Be inspired by the chaos of a toddler's room').";

/// 返回给调用方的信封
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Card {
        #[serde(rename = "cardText")]
        card_text: String,
    },
    Error {
        error: &'static str,
    },
}

impl Envelope {
    pub fn status(&self) -> StatusCode {
        match self {
            Envelope::Card { .. } => StatusCode::OK,
            Envelope::Error { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::result::Result<String, CardError>> for Envelope {
    fn from(result: std::result::Result<String, CardError>) -> Self {
        match result {
            Ok(card_text) => Envelope::Card { card_text },
            Err(err) => Envelope::Error {
                error: err.user_message(),
            },
        }
    }
}

/// 卡片生成器
pub struct CardGenerator {
    api_key: Option<String>,
    provider: Arc<dyn TextProvider>,
    params: GenerationParams,
}

impl CardGenerator {
    pub fn new(
        api_key: Option<String>,
        provider: Arc<dyn TextProvider>,
        params: GenerationParams,
    ) -> Self {
        Self {
            api_key,
            provider,
            params,
        }
    }

    /// 根据应用配置创建使用 Gemini 的生成器
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = GeminiProvider::new(
            config.api_base.clone(),
            config.model.clone(),
            config.provider_timeout,
            config.disable_tls_verify,
        )?;

        if config.api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set, card requests will return an error");
        }

        Ok(Self::new(
            config.api_key.clone(),
            Arc::new(provider),
            config.generation.clone(),
        ))
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// 生成一张卡片，返回去除首尾空白后的文本
    ///
    /// 缺少密钥时不会调用上游。上游成功但没有可见文本
    /// （安全过滤、thinking 耗尽 token 预算），或文本因非 `STOP`
    /// 原因被截断时，视为独立的错误，截断的文本不会返回。
    pub async fn generate(&self) -> std::result::Result<String, CardError> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::error!("Gemini API key is not configured");
            return Err(CardError::MissingCredential);
        };

        let provider = self.provider.name();
        let generation = self
            .provider
            .generate(api_key, PROMPT, &self.params)
            .await
            .map_err(|err| {
                tracing::error!(provider, "Gemini API error: {:#}", err);
                CardError::Provider(err)
            })?;

        match generation.text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() && generation.finished_cleanly() => {
                Ok(text.to_string())
            }
            _ => {
                tracing::error!(
                    provider,
                    finish_reason = generation.finish_reason.as_deref().unwrap_or("none"),
                    block_reason = generation.block_reason.as_deref().unwrap_or("none"),
                    thoughts_tokens = generation.usage.thoughts_tokens,
                    output_tokens = generation.usage.output_tokens,
                    partial_text = generation.text.is_some(),
                    "Gemini response was empty or blocked"
                );
                Err(CardError::EmptyOrFiltered)
            }
        }
    }

    /// 完整的一次调用：生成并归一化为信封
    pub async fn invoke(&self) -> Envelope {
        self.generate().await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::stub::{Outcome, StubProvider};
    use serde_json::{json, Value};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const EMPTY_OR_BLOCKED: &str =
        r#"{"error":"Gemini response was empty or blocked (e.g., safety filtering)."}"#;

    fn generator(api_key: Option<&str>, stub: &Arc<StubProvider>) -> CardGenerator {
        CardGenerator::new(
            api_key.map(str::to_string),
            stub.clone(),
            GenerationParams::default(),
        )
    }

    #[tokio::test]
    async fn missing_key_never_calls_provider() {
        let stub = StubProvider::new(Outcome::Text("unused"));
        let envelope = generator(None, &stub).invoke().await;

        assert_eq!(envelope.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            serde_json::to_string(&envelope).unwrap(),
            r#"{"error":"API Key not configured."}"#
        );
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn success_trims_only_outer_whitespace() {
        let stub = StubProvider::new(Outcome::Text("\n  Design  for   a silent city \t\n"));
        let envelope = generator(Some("key"), &stub).invoke().await;

        assert_eq!(envelope.status(), StatusCode::OK);
        assert_eq!(
            envelope,
            Envelope::Card {
                card_text: "Design  for   a silent city".to_string()
            }
        );
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn missing_text_is_reported_as_empty_or_blocked() {
        let stub = StubProvider::new(Outcome::NoText);
        let envelope = generator(Some("key"), &stub).invoke().await;

        assert_eq!(envelope.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            serde_json::to_string(&envelope).unwrap(),
            r#"{"error":"Gemini response was empty or blocked (e.g., safety filtering)."}"#
        );
    }

    #[tokio::test]
    async fn whitespace_only_text_is_reported_as_empty_or_blocked() {
        let stub = StubProvider::new(Outcome::Text(" \n\t "));
        let err = generator(Some("key"), &stub).generate().await.unwrap_err();
        assert!(matches!(err, CardError::EmptyOrFiltered));
    }

    #[tokio::test]
    async fn provider_failures_are_classified() {
        let cases = [
            (
                "[400 Bad Request] API key not valid. Please pass a valid API key.",
                "Authentication failed: API Key may be invalid or restricted.",
            ),
            (
                "Gemini API error 403 Forbidden",
                "Permission denied: API Key may lack necessary permissions.",
            ),
            (
                "[INVALID_ARGUMENT] Invalid JSON payload received",
                "Configuration error: The AI model configuration is invalid.",
            ),
            (
                "error sending request: connection reset",
                "Failed to generate card content due to a server error.",
            ),
        ];

        for (raw, expected) in cases {
            let stub = StubProvider::new(Outcome::Fail(raw));
            let envelope = generator(Some("key"), &stub).invoke().await;
            assert_eq!(envelope.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(envelope, Envelope::Error { error: expected });
        }
    }

    #[tokio::test]
    async fn error_envelope_never_leaks_key_or_upstream_text() {
        let stub = StubProvider::new(Outcome::Fail("upstream rejected key AIza-very-secret"));
        let envelope = generator(Some("AIza-very-secret"), &stub).invoke().await;
        let body = serde_json::to_string(&envelope).unwrap();

        assert!(!body.contains("AIza-very-secret"));
        assert!(!body.contains("upstream"));
    }

    #[tokio::test]
    async fn repeated_invocations_are_identical() {
        let stub = StubProvider::new(Outcome::Text("Involve a lighthouse keeper"));
        let generator = generator(Some("key"), &stub);

        let first = serde_json::to_vec(&generator.invoke().await).unwrap();
        let second = serde_json::to_vec(&generator.invoke().await).unwrap();

        assert_eq!(first, second);
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn truncated_text_is_never_returned() {
        for reason in ["SAFETY", "MAX_TOKENS", "RECITATION", "PROHIBITED_CONTENT"] {
            let stub = StubProvider::new(Outcome::Cut("Involve a quantum", reason));
            let envelope = generator(Some("key"), &stub).invoke().await;

            assert_eq!(envelope.status(), StatusCode::INTERNAL_SERVER_ERROR, "{reason}");
            assert_eq!(serde_json::to_string(&envelope).unwrap(), EMPTY_OR_BLOCKED);
        }
    }

    /// 用 wiremock 模拟 Gemini，经由真实的 GeminiProvider 走完整个生成流程
    async fn invoke_against(body: Value) -> Envelope {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GeminiProvider::new(
            format!("{}/v1beta", server.uri()),
            "gemini-2.5-flash",
            Duration::from_secs(5),
            false,
        )
        .unwrap();

        CardGenerator::new(
            Some("test-key".to_string()),
            Arc::new(provider),
            GenerationParams::default(),
        )
        .invoke()
        .await
    }

    #[tokio::test]
    async fn gemini_complete_answer_becomes_card() {
        let envelope = invoke_against(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": " Involve a quantum computer\n"}]},
                "finishReason": "STOP"
            }]
        }))
        .await;

        assert_eq!(envelope.status(), StatusCode::OK);
        assert_eq!(
            serde_json::to_string(&envelope).unwrap(),
            r#"{"cardText":"Involve a quantum computer"}"#
        );
    }

    #[tokio::test]
    async fn gemini_cut_off_answers_become_empty_or_blocked() {
        for reason in ["SAFETY", "MAX_TOKENS", "RECITATION", "BLOCKLIST", "SPII"] {
            let envelope = invoke_against(json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Involve a quantum"}]},
                    "finishReason": reason
                }]
            }))
            .await;

            assert_eq!(envelope.status(), StatusCode::INTERNAL_SERVER_ERROR, "{reason}");
            assert_eq!(serde_json::to_string(&envelope).unwrap(), EMPTY_OR_BLOCKED);
        }
    }

    #[tokio::test]
    async fn gemini_blocked_prompt_becomes_empty_or_blocked() {
        let envelope = invoke_against(json!({
            "promptFeedback": {"blockReason": "SAFETY"},
            "usageMetadata": {"promptTokenCount": 70}
        }))
        .await;

        assert_eq!(envelope.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(serde_json::to_string(&envelope).unwrap(), EMPTY_OR_BLOCKED);
    }

    #[tokio::test]
    async fn gemini_exhausted_thinking_budget_becomes_empty_or_blocked() {
        let envelope = invoke_against(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "weighing options", "thought": true}]},
                "finishReason": "MAX_TOKENS"
            }],
            "usageMetadata": {"promptTokenCount": 70, "thoughtsTokenCount": 1024}
        }))
        .await;

        assert_eq!(envelope.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(serde_json::to_string(&envelope).unwrap(), EMPTY_OR_BLOCKED);
    }
}
