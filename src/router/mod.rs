//! 路由器边界：工具描述列表进，{tool, args} 选择出
//!
//! 路由决策（理解自然语言、挑选工具）完全交给外部托管的 LLM；本模块只定义窄接口、
//! 解析回复，不实现任何路由逻辑，也不定义失败后的重试或回退策略。

pub mod llm_router;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::ChartError;
use crate::tools::ToolSpec;

pub use llm_router::LlmRouter;

/// 路由器选出的一次工具调用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSelection {
    pub tool: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// 路由结果
#[derive(Debug, Clone, PartialEq)]
pub enum RouterDecision {
    /// 无需渲染，直接回复用户
    Reply(String),
    /// 选择零个或多个工具
    Render(Vec<ToolSelection>),
}

/// 外部路由器接口
#[async_trait]
pub trait Router: Send + Sync {
    async fn route(&self, request: &str, tools: &[ToolSpec]) -> Result<RouterDecision, ChartError>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SelectionPayload {
    Many(Vec<ToolSelection>),
    One(ToolSelection),
}

/// 解析路由器回复：```json 代码块或最外层 JSON 对象/数组为工具选择，纯文本为直接回复
///
/// 只有 ```json 代码块内容无法解析时才报错；正文里夹带的括号片段若不是工具选择，整段按文本回复处理
pub fn parse_router_reply(output: &str) -> Result<RouterDecision, ChartError> {
    let trimmed = output.trim();

    let (json_str, payload) = if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        let json_str = rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim());
        let payload: SelectionPayload = serde_json::from_str(json_str)
            .map_err(|e| ChartError::Router(format!("{}: {}", e, json_str)))?;
        (json_str, payload)
    } else {
        let parsed = outermost_json(trimmed)
            .and_then(|s| serde_json::from_str::<SelectionPayload>(s).ok().map(|p| (s, p)));
        match parsed {
            Some(found) => found,
            None => return Ok(RouterDecision::Reply(trimmed.to_string())),
        }
    };

    let selections = match payload {
        SelectionPayload::Many(v) => v,
        SelectionPayload::One(s) => vec![s],
    };
    let selections: Vec<ToolSelection> = selections
        .into_iter()
        .filter(|s| !s.tool.trim().is_empty())
        .collect();
    if selections.is_empty() && !json_str.trim_start().starts_with('[') {
        return Ok(RouterDecision::Reply(trimmed.to_string()));
    }
    Ok(RouterDecision::Render(selections))
}

/// 取最外层的 JSON 数组或对象片段（以先出现的括号为准）
fn outermost_json(s: &str) -> Option<&str> {
    let obj = s.find('{');
    let arr = s.find('[');
    let (start, close) = match (obj, arr) {
        (Some(o), Some(a)) if a < o => (a, ']'),
        (Some(o), _) => (o, '}'),
        (None, Some(a)) => (a, ']'),
        (None, None) => return None,
    };
    let end = s.rfind(close)?;
    (end > start).then(|| &s[start..=end])
}
