//! HTTP 请求处理器

pub mod card;
pub mod health;

pub use card::handle_generate_card;
pub use health::handle_health;
