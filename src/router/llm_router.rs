//! 基于 LLM 的路由器：把可用工具描述与回复格式拼入 system prompt，解析 LLM 的选择

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::ChartError;
use crate::llm::{LlmClient, Message};
use crate::router::{parse_router_reply, Router, RouterDecision};
use crate::tools::{tool_call_schema_json, ToolSpec};

const DEFAULT_INSTRUCTIONS: &str = "You are a chart coordinator. Read the user's request and data, \
pick the rendering tool(s) best suited to it from the available tools, and write the chart source \
code for each selected tool. Reply with JSON only: an array of {\"tool\": ..., \"args\": {...}} \
objects whose args follow the tool's parameter schema. If no tool fits or information is missing, \
reply in plain text instead.";

/// LLM 路由器：持有 LLM 客户端与基础指令
pub struct LlmRouter {
    llm: Arc<dyn LlmClient>,
    instructions: String,
}

impl LlmRouter {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// system prompt = 基础指令 + Available tools（JSON）+ 回复格式 Schema
    pub fn system_prompt(&self, tools: &[ToolSpec]) -> String {
        let tools_json = serde_json::to_string_pretty(tools).unwrap_or_else(|_| "[]".to_string());
        format!(
            "{}\n\n## Available tools\n{}\n\n## Reply format (JSON Schema)\n{}",
            self.instructions,
            tools_json,
            tool_call_schema_json()
        )
    }
}

#[async_trait]
impl Router for LlmRouter {
    async fn route(&self, request: &str, tools: &[ToolSpec]) -> Result<RouterDecision, ChartError> {
        if tools.is_empty() {
            return Ok(RouterDecision::Reply(
                "No rendering tools are available in this environment.".to_string(),
            ));
        }
        let messages = vec![Message::system(self.system_prompt(tools)), Message::user(request)];
        let output = self
            .llm
            .complete(&messages)
            .await
            .map_err(ChartError::Router)?;

        match parse_router_reply(&output)? {
            RouterDecision::Render(selections) => {
                let (offered, dropped): (Vec<_>, Vec<_>) = selections
                    .into_iter()
                    .partition(|s| tools.iter().any(|t| t.name == s.tool));
                for s in &dropped {
                    tracing::warn!(tool = %s.tool, "router selected a tool that was not offered");
                }
                Ok(RouterDecision::Render(offered))
            }
            reply => Ok(reply),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlmClient, Role};
    use crate::tools::{DomainTag, OutputKind, ToolDescriptor};

    fn specs() -> Vec<ToolSpec> {
        let d = ToolDescriptor::new("mermaid_render", "mermaid", DomainTag::Flowchart, OutputKind::StaticImage)
            .formats(&["png"])
            .with_chart_params("code", "diagram");
        vec![ToolSpec::from(&d)]
    }

    #[tokio::test]
    async fn test_prompt_contains_tools_and_schema() {
        let llm = Arc::new(MockLlmClient::with_replies([r#"[{"tool": "mermaid_render", "args": {"code": "graph TD; A-->B"}}]"#]));
        let router = LlmRouter::new(llm.clone());
        let d = router.route("draw a flow", &specs()).await.unwrap();
        assert!(matches!(d, RouterDecision::Render(ref s) if s.len() == 1));

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0][0].role, Role::System);
        assert!(requests[0][0].content.contains("\"mermaid_render\""));
        assert!(requests[0][0].content.contains("Reply format"));
        assert_eq!(requests[0][1].content, "draw a flow");
    }

    #[tokio::test]
    async fn test_unoffered_tools_dropped() {
        let llm = Arc::new(MockLlmClient::with_replies([
            r#"[{"tool": "ghost_render", "args": {}}, {"tool": "mermaid_render", "args": {"code": "x"}}]"#,
        ]));
        let d = LlmRouter::new(llm).route("x", &specs()).await.unwrap();
        match d {
            RouterDecision::Render(s) => {
                assert_eq!(s.len(), 1);
                assert_eq!(s[0].tool, "mermaid_render");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_clarifying_text_with_brackets_is_reply() {
        let llm = Arc::new(MockLlmClient::with_replies(["Send the series, e.g. [1, 2, 3], please."]));
        let d = LlmRouter::new(llm).route("chart it", &specs()).await.unwrap();
        assert_eq!(d, RouterDecision::Reply("Send the series, e.g. [1, 2, 3], please.".into()));
    }

    #[tokio::test]
    async fn test_no_tools_skips_llm() {
        let llm = Arc::new(MockLlmClient::new());
        let d = LlmRouter::new(llm.clone()).route("x", &[]).await.unwrap();
        assert!(matches!(d, RouterDecision::Reply(_)));
        assert!(llm.requests().is_empty());
    }
}
