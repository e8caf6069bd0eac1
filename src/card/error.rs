//! 卡片生成错误与上游错误分类

use thiserror::Error;

pub const MISSING_CREDENTIAL_MESSAGE: &str = "API Key not configured.";
pub const EMPTY_RESULT_MESSAGE: &str =
    "Gemini response was empty or blocked (e.g., safety filtering).";
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to generate card content due to a server error.";

/// 分类规则：(错误信息中的特征子串, 返回给调用方的安全信息)
///
/// 按顺序匹配，第一条命中即返回。无效密钥的错误同样带有
/// `INVALID_ARGUMENT` 状态，所以它必须排在配置错误之前。
const CLASSIFICATION_RULES: &[(&str, &str)] = &[
    (
        "API key not valid",
        "Authentication failed: API Key may be invalid or restricted.",
    ),
    (
        "403",
        "Permission denied: API Key may lack necessary permissions.",
    ),
    (
        "INVALID_ARGUMENT",
        "Configuration error: The AI model configuration is invalid.",
    ),
];

/// 将上游错误信息映射为对调用方安全的提示
pub fn classify(message: &str) -> &'static str {
    CLASSIFICATION_RULES
        .iter()
        .find(|(needle, _)| message.contains(needle))
        .map(|(_, user_message)| *user_message)
        .unwrap_or(GENERIC_FAILURE_MESSAGE)
}

/// 一次卡片生成可能出现的错误，全部在本地恢复为 500 信封
#[derive(Debug, Error)]
pub enum CardError {
    #[error("Gemini API key is not configured")]
    MissingCredential,

    #[error("Gemini returned no usable text")]
    EmptyOrFiltered,

    #[error("Gemini call failed: {0:#}")]
    Provider(anyhow::Error),
}

impl CardError {
    /// 返回给调用方的信息，不包含任何上游原文或密钥
    pub fn user_message(&self) -> &'static str {
        match self {
            CardError::MissingCredential => MISSING_CREDENTIAL_MESSAGE,
            CardError::EmptyOrFiltered => EMPTY_RESULT_MESSAGE,
            CardError::Provider(err) => classify(&format!("{:#}", err)),
        }
    }
}
