//! Card Forge - 设计思维灵感卡片函数
//!
//! 一个极小的 HTTP 函数：用固定 prompt 请求 Gemini 生成一句设计思维
//! 工作坊用的约束或灵感短语，并以 JSON 信封返回给前端页面。
//!
//! # 功能特性
//!
//! - 缺少 API 密钥时快速失败，不调用上游
//! - 关闭 thinking，避免推理耗尽输出 token
//! - 空结果、安全过滤与上游错误统一归一化为安全的错误信息
//! - 所有响应带宽松的 CORS 头
//!
//! # 命令行接口
//!
//! - `serve`: 启动 HTTP 服务器
//! - `generate`: 在进程内生成一张卡片并打印
//! - `test`: 向本地服务器发送测试请求

mod card;
mod commands;
mod config;
mod gateway;
mod providers;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::{Config, LogFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Card Forge CLI
#[derive(Parser)]
#[command(name = "card-forge")]
#[command(about = "Design-thinking idea cards generated by Gemini", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// 可用的命令
#[derive(Subcommand)]
enum Commands {
    /// 启动 HTTP 服务器
    Serve,
    /// 在进程内生成一张卡片并打印 JSON 信封
    Generate,
    /// 向本地服务器发送测试请求
    Test,
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "card_forge=info".into());

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true),
            )
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 加载 .env 文件（如果存在）
    if let Ok(dotenv_path) = std::env::var("CARD_FORGE_ENV_FILE") {
        dotenvy::from_path(&dotenv_path).ok();
    } else {
        dotenvy::dotenv().ok();
    }

    // 解析命令行参数和配置
    let cli = Cli::parse();
    let config = Config::from_env()?;

    init_tracing(config.log_format);
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Serve => commands::serve_command(config).await,
        Commands::Generate => commands::generate_command(config).await,
        Commands::Test => commands::test_command(config).await,
    }
}
