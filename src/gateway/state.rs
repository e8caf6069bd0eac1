//! Gateway 应用状态

use std::sync::Arc;

use crate::card::CardGenerator;

/// Gateway 应用状态
///
/// 只包含启动时确定的只读数据，请求之间不共享可变状态。
#[derive(Clone)]
pub struct AppState {
    generator: Arc<CardGenerator>,
    model: Arc<str>,
}

impl AppState {
    pub fn new(generator: CardGenerator, model: impl Into<Arc<str>>) -> Self {
        Self {
            generator: Arc::new(generator),
            model: model.into(),
        }
    }

    pub fn generator(&self) -> &CardGenerator {
        &self.generator
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}
