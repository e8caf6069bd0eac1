//! Generate 命令 - 在进程内执行一次卡片生成
//!
//! 不启动服务器，直接调用生成器并打印状态码和 JSON 信封，
//! 便于在部署前验证密钥和生成参数。

use anyhow::{Context, Result};

use crate::card::CardGenerator;
use crate::config::Config;

/// 执行一次生成并打印结果
///
/// 信封为错误时返回 `Err`，使进程以非零状态退出。
pub async fn generate_command(config: Config) -> Result<()> {
    let generator = CardGenerator::from_config(&config)?;
    let envelope = generator.invoke().await;
    let status = envelope.status();

    let body = serde_json::to_string_pretty(&envelope).context("Failed to encode envelope")?;

    println!("Status: {}", status);
    println!("{}", body);

    if !status.is_success() {
        anyhow::bail!("Card generation failed with status {}", status);
    }

    Ok(())
}
