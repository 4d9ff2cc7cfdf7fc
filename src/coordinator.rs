//! 协调者：自然语言请求 → 路由器选择工具 → 适配器并发执行 → 汇总回复

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::{self, join_all, Either};
use serde::{Deserialize, Serialize};

use crate::core::ChartError;
use crate::router::{Router, RouterDecision};
use crate::tools::{InvocationAdapter, RenderRequest, RenderResult, Specialist, ToolSpec};

/// 一次请求的回复：路由器的文本回复（若有）+ 每个工具调用的结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(default)]
    pub results: Vec<RenderResult>,
}

impl CoordinatorReply {
    pub fn all_succeeded(&self) -> bool {
        !self.results.is_empty() && self.results.iter().all(RenderResult::is_success)
    }
}

pub struct Coordinator {
    router: Arc<dyn Router>,
    adapter: Arc<InvocationAdapter>,
}

impl Coordinator {
    pub fn new(router: Arc<dyn Router>, adapter: Arc<InvocationAdapter>) -> Self {
        Self { router, adapter }
    }

    pub fn adapter(&self) -> &Arc<InvocationAdapter> {
        &self.adapter
    }

    /// 向路由器暴露全部已启用工具
    pub async fn handle(&self, request: &str) -> Result<CoordinatorReply, ChartError> {
        let tools = self.adapter.active().describe();
        self.dispatch(request, &tools).await
    }

    /// 仅暴露某个专家负责且已启用的工具
    pub async fn handle_as(
        &self,
        specialist: Specialist,
        request: &str,
    ) -> Result<CoordinatorReply, ChartError> {
        let tools = self.adapter.active().describe_for(specialist);
        tracing::debug!(specialist = %specialist, offered = tools.len(), "handing request to specialist");
        self.dispatch(request, &tools).await
    }

    async fn dispatch(&self, request: &str, tools: &[ToolSpec]) -> Result<CoordinatorReply, ChartError> {
        match self.router.route(request, tools).await? {
            RouterDecision::Reply(text) => Ok(CoordinatorReply {
                reply: Some(text),
                results: Vec::new(),
            }),
            RouterDecision::Render(selections) => {
                tracing::info!(
                    tools = %selections.iter().map(|s| s.tool.as_str()).collect::<Vec<_>>().join(","),
                    "router selected tools"
                );
                // 只执行本次提供给路由器的工具，其余直接拒绝，顺序与选择一致
                let offered: HashSet<&str> = tools.iter().map(|t| t.name.as_str()).collect();
                let runs = selections.into_iter().map(|s| {
                    if offered.contains(s.tool.as_str()) {
                        Either::Left(self.adapter.execute(RenderRequest::new(s.tool, s.args)))
                    } else {
                        tracing::warn!(tool = %s.tool, "router selected a tool that was not offered");
                        let request_id = uuid::Uuid::new_v4().to_string();
                        let err = ChartError::UnknownTool(s.tool.clone());
                        Either::Right(future::ready(RenderResult::from_error(&request_id, &s.tool, &err)))
                    }
                });
                let results = join_all(runs).await;
                Ok(CoordinatorReply {
                    reply: None,
                    results,
                })
            }
        }
    }
}
