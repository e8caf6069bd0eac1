//! 测试用 Provider，返回预设结果并记录调用次数

use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{Generation, GenerationParams, TextProvider};

pub enum Outcome {
    Text(&'static str),
    NoText,
    /// 带部分文本，但以给定原因结束
    Cut(&'static str, &'static str),
    Fail(&'static str),
}

pub struct StubProvider {
    outcome: Outcome,
    calls: AtomicUsize,
}

impl StubProvider {
    pub fn new(outcome: Outcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate(
        &self,
        _api_key: &str,
        _prompt: &str,
        _params: &GenerationParams,
    ) -> Result<Generation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.outcome {
            Outcome::Text(text) => Ok(Generation {
                text: Some(text.to_string()),
                finish_reason: Some("STOP".to_string()),
                ..Generation::default()
            }),
            Outcome::NoText => Ok(Generation {
                finish_reason: Some("MAX_TOKENS".to_string()),
                ..Generation::default()
            }),
            Outcome::Cut(text, reason) => Ok(Generation {
                text: Some(text.to_string()),
                finish_reason: Some(reason.to_string()),
                ..Generation::default()
            }),
            Outcome::Fail(message) => Err(anyhow::anyhow!(message)),
        }
    }
}
