//! 路由器回复格式的 JSON Schema（schemars 自动生成）
//!
//! 拼入 system prompt，约束 LLM 以 `[{"tool": "...", "args": {...}}]` 的形式选择工具。

use schemars::{schema_for, JsonSchema};
use serde_json::Value;
use std::collections::HashMap;

/// 单个工具选择（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct ToolSelectionFormat {
    /// 工具名，必须是 Available tools 中的一个，如 mermaid_render、graphviz_render
    pub tool: String,
    /// 工具参数，按该工具的 parameters schema 填写（code、output_format、title 等）
    pub args: HashMap<String, Value>,
}

/// 路由器回复：零个或多个工具选择（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct RouterReplyFormat(Vec<ToolSelectionFormat>);

/// 返回路由器回复格式的 JSON Schema 字符串，可拼入 system prompt
pub fn tool_call_schema_json() -> String {
    let schema = schema_for!(RouterReplyFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| String::new())
}
