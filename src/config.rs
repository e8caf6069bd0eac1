//! 应用配置模块
//!
//! 负责从环境变量加载应用配置，包括：
//! - 服务器监听地址和端口
//! - Gemini API 密钥（可选，缺失时每次请求返回错误信封）
//! - 生成参数（模型、温度、输出 token 上限、thinking 预算）

use anyhow::{Context, Result};
use std::fmt;
use std::time::Duration;

use crate::providers::GenerationParams;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8888;
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TEMPERATURE: f32 = 0.9;
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1024;
const MAX_OUTPUT_TOKENS_LIMIT: u32 = 8192;
const DEFAULT_THINKING_BUDGET: u32 = 0;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// 服务器层的请求超时；Provider 超时必须小于它，超时才会以 JSON 信封返回
pub const SERVER_REQUEST_TIMEOUT_SECS: u64 = 300;

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// 应用配置
#[derive(Clone)]
pub struct Config {
    /// 服务器监听地址（如 "0.0.0.0" 或 "127.0.0.1"）
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
    pub log_format: LogFormat,
    /// Gemini API 密钥，不会出现在日志或响应中
    pub api_key: Option<String>,
    pub model: String,
    /// Gemini API 基础地址（测试时指向 mock server）
    pub api_base: String,
    pub generation: GenerationParams,
    /// Provider HTTP 客户端请求超时
    pub provider_timeout: Duration,
    /// 禁用 TLS 证书校验（仅用于 mitmproxy 等调试场景）
    pub disable_tls_verify: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_format", &self.log_format)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("generation", &self.generation)
            .field("provider_timeout", &self.provider_timeout)
            .field("disable_tls_verify", &self.disable_tls_verify)
            .finish()
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            thinking_budget: Some(DEFAULT_THINKING_BUDGET),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// # 环境变量
    ///
    /// - `CARD_FORGE_HOST`: 服务器监听地址（默认: "0.0.0.0"）
    /// - `CARD_FORGE_PORT`: 服务器监听端口（默认: 8888）
    /// - `CARD_FORGE_LOG_FORMAT`: `pretty` 或 `json`（默认: pretty）
    /// - `GEMINI_API_KEY`: Gemini API 密钥（可选）
    /// - `GEMINI_MODEL`: 模型名称（默认: "gemini-2.5-flash"）
    /// - `GEMINI_API_BASE`: API 基础地址
    /// - `GEMINI_TEMPERATURE`: 采样温度（默认: 0.9）
    /// - `GEMINI_MAX_OUTPUT_TOKENS`: 输出 token 上限（默认: 1024）
    /// - `GEMINI_THINKING_BUDGET`: thinking 预算（默认: 0 即关闭；`default` 表示不发送该字段）
    /// - `GEMINI_TIMEOUT_SECS`: 请求超时秒数（默认: 60，须小于服务器超时 300）
    /// - `CARD_FORGE_DISABLE_TLS_VERIFY`: `1` 或 `true` 时禁用 TLS 校验
    ///
    /// # 错误
    ///
    /// 任意数值型变量无法解析或越界时返回错误
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意 key/value 来源加载配置，便于测试时注入
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = get("CARD_FORGE_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match get("CARD_FORGE_PORT") {
            Some(v) => v
                .parse()
                .context("CARD_FORGE_PORT must be a valid port number")?,
            None => DEFAULT_PORT,
        };

        let log_format = match get("CARD_FORGE_LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                anyhow::bail!("CARD_FORGE_LOG_FORMAT must be 'pretty' or 'json', got '{other}'")
            }
        };

        let api_key = get("GEMINI_API_KEY");
        let model = get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_base = get("GEMINI_API_BASE")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let temperature = match get("GEMINI_TEMPERATURE") {
            Some(v) => v
                .parse::<f32>()
                .context("GEMINI_TEMPERATURE must be a number")?,
            None => DEFAULT_TEMPERATURE,
        };
        if !(0.0..=2.0).contains(&temperature) {
            anyhow::bail!("GEMINI_TEMPERATURE must be between 0.0 and 2.0, got {temperature}");
        }

        let max_output_tokens = match get("GEMINI_MAX_OUTPUT_TOKENS") {
            Some(v) => v
                .parse::<u32>()
                .context("GEMINI_MAX_OUTPUT_TOKENS must be a positive integer")?,
            None => DEFAULT_MAX_OUTPUT_TOKENS,
        };
        if max_output_tokens == 0 || max_output_tokens > MAX_OUTPUT_TOKENS_LIMIT {
            anyhow::bail!(
                "GEMINI_MAX_OUTPUT_TOKENS must be between 1 and {MAX_OUTPUT_TOKENS_LIMIT}, got {max_output_tokens}"
            );
        }

        let thinking_budget = match lookup("GEMINI_THINKING_BUDGET").map(|v| v.trim().to_string()) {
            None => Some(DEFAULT_THINKING_BUDGET),
            Some(v) if v.is_empty() || v.eq_ignore_ascii_case("default") => None,
            Some(v) => Some(
                v.parse::<u32>()
                    .context("GEMINI_THINKING_BUDGET must be a non-negative integer or 'default'")?,
            ),
        };

        let timeout_secs = match get("GEMINI_TIMEOUT_SECS") {
            Some(v) => v
                .parse::<u64>()
                .context("GEMINI_TIMEOUT_SECS must be a positive integer")?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        if timeout_secs == 0 || timeout_secs >= SERVER_REQUEST_TIMEOUT_SECS {
            anyhow::bail!(
                "GEMINI_TIMEOUT_SECS must be between 1 and {}, got {timeout_secs}",
                SERVER_REQUEST_TIMEOUT_SECS - 1
            );
        }

        let disable_tls_verify = get("CARD_FORGE_DISABLE_TLS_VERIFY")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            host,
            port,
            log_format,
            api_key,
            model,
            api_base,
            generation: GenerationParams {
                temperature,
                max_output_tokens,
                thinking_budget,
            },
            provider_timeout: Duration::from_secs(timeout_secs),
            disable_tls_verify,
        })
    }
}
