//! DeepSeek API 客户端（OpenAI 兼容格式）
//!
//! - Base URL: https://api.deepseek.com
//! - 模型: deepseek-chat（默认）

use crate::llm::OpenAiClient;

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";

/// 创建 DeepSeek 客户端；base_url 为空时使用官方端点。
/// 模型名可带 LiteLLM 风格前缀（如 `deepseek/deepseek-chat`），会去掉前缀
pub fn create_deepseek_client(base_url: Option<&str>, model: &str, api_key: &str) -> OpenAiClient {
    let model = model.strip_prefix("deepseek/").unwrap_or(model);
    let model = if model.is_empty() { DEEPSEEK_CHAT } else { model };
    OpenAiClient::new(Some(base_url.unwrap_or(DEEPSEEK_BASE_URL)), model, api_key)
}
