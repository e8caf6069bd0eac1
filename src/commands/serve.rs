//! Serve 命令 - 启动 HTTP 服务器
//!
//! 此模块实现 `serve` 命令，启动承载卡片生成函数的 HTTP 服务器。

use anyhow::Result;

use crate::config::Config;
use crate::gateway;

/// 执行服务器启动命令
///
/// # 参数
///
/// * `config` - 应用配置，包含监听地址、端口和生成参数
///
/// # 功能
///
/// - 创建 Gemini Provider 和卡片生成器
/// - 初始化 HTTP 路由和中间件
/// - 启动服务器并等待关闭信号
/// - 支持优雅关闭（Ctrl+C 或 SIGTERM）
pub async fn serve_command(config: Config) -> Result<()> {
    gateway::serve(config).await
}
