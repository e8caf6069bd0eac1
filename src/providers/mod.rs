//! Provider 抽象层
//!
//! 上游文本生成服务的统一接口。handler 只依赖 [`TextProvider`]，
//! 测试中可替换为返回固定结果的 stub。

pub mod gemini;
#[cfg(test)]
pub mod stub;

use anyhow::Result;
use async_trait::async_trait;

pub use gemini::GeminiProvider;

/// 生成参数
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    /// 采样温度，越高越有创意
    pub temperature: f32,
    /// 输出 token 上限（包含 thinking 消耗的部分）
    pub max_output_tokens: u32,
    /// thinking 预算；`Some(0)` 关闭，`None` 使用模型默认值
    pub thinking_budget: Option<u32>,
}

/// Token 使用统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub output_tokens: u64,
    pub thoughts_tokens: u64,
}

/// 一次生成调用的结果
///
/// `text` 为 `None` 表示上游调用成功但没有可见文本（安全过滤、
/// thinking 耗尽 token 预算等），由调用方决定如何处理。
#[derive(Debug, Clone, Default)]
pub struct Generation {
    pub text: Option<String>,
    pub finish_reason: Option<String>,
    pub block_reason: Option<String>,
    pub usage: Usage,
}

impl Generation {
    /// 上游是否正常结束
    ///
    /// 只有 `STOP`（或未给出结束原因）且 prompt 未被拦截时，文本才完整可用；
    /// `SAFETY`、`MAX_TOKENS`、`RECITATION` 等都意味着文本被截断或过滤。
    pub fn finished_cleanly(&self) -> bool {
        self.block_reason.is_none()
            && matches!(self.finish_reason.as_deref(), None | Some("STOP"))
    }
}

/// 文本生成 Provider
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Provider 名称（用于日志和标识）
    fn name(&self) -> &str;

    /// 发起一次生成请求
    ///
    /// 传输、认证或请求格式错误以 `Err` 返回，错误信息保留上游原文，
    /// 供上层分类。
    async fn generate(
        &self,
        api_key: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<Generation>;
}
