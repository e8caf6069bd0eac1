use reqwest::Client;
use std::sync::OnceLock;
use std::time::Duration;

/// 获取共享的 HTTP 客户端（用于 `test` 命令请求本地服务器）
static SHARED_CLIENT: OnceLock<Client> = OnceLock::new();

pub fn get_shared_client() -> &'static Client {
    SHARED_CLIENT.get_or_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client, falling back to defaults: {}", e);
                Client::new()
            })
    })
}
