//! 工具调用适配器
//!
//! 持有已发布的 ActiveToolSet 快照、单次调用超时、产物大小上限与产物目录。
//! execute(request) 的顺序：查找工具 → 校验参数与格式 → 在超时内运行后端 → 检查大小 → 落盘。
//! 前两步失败为 BadRequest，且不会触碰任何渲染例程；之后的失败为 Failure。
//! 每次调用输出一条结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use crate::core::ChartError;
use crate::tools::artifact::{ArtifactStore, RenderResult, RenderStatus};
use crate::tools::backend::RenderJob;
use crate::tools::registry::{ActiveToolSet, RegisteredTool};

/// 一次渲染请求：创建、消费一次、丢弃
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    pub tool: String,
    #[serde(default)]
    pub params: serde_json::Value,
    /// 覆盖 params 中的 output_format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
}

impl RenderRequest {
    pub fn new(tool: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            tool: tool.into(),
            params,
            output_format: None,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = Some(format.into());
        self
    }
}

/// 适配器设置
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    pub timeout: Duration,
    pub max_artifact_bytes: usize,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            max_artifact_bytes: 20 * 1024 * 1024,
        }
    }
}

/// 工具调用适配器：无共享可变状态，可被多个任务并发调用
pub struct InvocationAdapter {
    active: Arc<ActiveToolSet>,
    store: ArtifactStore,
    settings: AdapterSettings,
}

impl InvocationAdapter {
    pub fn new(active: Arc<ActiveToolSet>, store: ArtifactStore, settings: AdapterSettings) -> Self {
        Self {
            active,
            store,
            settings,
        }
    }

    pub fn active(&self) -> &Arc<ActiveToolSet> {
        &self.active
    }

    pub fn settings(&self) -> &AdapterSettings {
        &self.settings
    }

    /// 执行一次渲染请求；任何失败都转为结构化的 RenderResult
    pub async fn execute(&self, request: RenderRequest) -> RenderResult {
        let request_id = uuid::Uuid::new_v4().to_string();
        let start = Instant::now();
        let args_preview = args_preview(&request.params);
        let code = request
            .params
            .get("code")
            .and_then(|v| v.as_str())
            .map(String::from);

        let result = match self.prepare(&request) {
            Ok((tool, job)) => match self.run(&tool, job, &request_id).await {
                Ok(artifact) => RenderResult::success(&request_id, &request.tool, artifact),
                Err(e) => {
                    tracing::warn!(tool = %request.tool, error = %e, "render failed");
                    RenderResult::from_error(&request_id, &request.tool, &e)
                        .with_fallback_code(code.as_deref())
                }
            },
            Err(e) => {
                tracing::warn!(tool = %request.tool, error = %e, "render request rejected");
                RenderResult::from_error(&request_id, &request.tool, &e)
            }
        };

        let outcome = match result.status {
            RenderStatus::Success => "ok",
            RenderStatus::BadRequest => "bad_request",
            RenderStatus::Failure => "failure",
        };
        let audit = serde_json::json!({
            "event": "render_audit",
            "request_id": request_id,
            "tool": request.tool,
            "ok": result.is_success(),
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit.to_string(), "render");
        result
    }

    /// 并发执行一批相互独立的请求；结果顺序与请求顺序一致
    pub async fn execute_all(&self, requests: Vec<RenderRequest>) -> Vec<RenderResult> {
        join_all(requests.into_iter().map(|r| self.execute(r))).await
    }

    /// 查找工具并校验参数与格式，不产生任何副作用
    fn prepare(&self, request: &RenderRequest) -> Result<(Arc<RegisteredTool>, RenderJob), ChartError> {
        let tool = self
            .active
            .get(&request.tool)
            .ok_or_else(|| ChartError::UnknownTool(request.tool.clone()))?;
        let descriptor = &tool.descriptor;
        let params = descriptor.params.validate(&request.params)?;

        let format = request
            .output_format
            .clone()
            .or_else(|| params.str("output_format").map(String::from))
            .unwrap_or_else(|| descriptor.default_format.clone())
            .to_ascii_lowercase();
        if !descriptor.supports_format(&format) {
            return Err(ChartError::BadRequest(format!(
                "unsupported output format '{}', supported: {}",
                format,
                descriptor.formats.join(", ")
            )));
        }

        let code = params.str("code").unwrap_or_default().to_string();
        if descriptor.params.get("code").is_some() && code.trim().is_empty() {
            return Err(ChartError::BadRequest("parameter 'code' must not be empty".to_string()));
        }
        let job = RenderJob {
            tool: descriptor.name.clone(),
            code,
            title: params
                .str("title")
                .map(String::from)
                .unwrap_or_else(|| descriptor.name.clone()),
            width: params.u64("width").unwrap_or(800),
            height: params.u64("height").unwrap_or(600),
            format,
            params,
        };
        Ok((tool, job))
    }

    async fn run(
        &self,
        tool: &RegisteredTool,
        job: RenderJob,
        request_id: &str,
    ) -> Result<crate::tools::Artifact, ChartError> {
        tracing::info!(tool = %job.tool, format = %job.format, "rendering");
        let bytes = timeout(self.settings.timeout, tool.backend.render(&job))
            .await
            .map_err(|_| ChartError::RenderTimeout {
                tool: job.tool.clone(),
                secs: self.settings.timeout.as_secs_f64(),
            })?
            .map_err(|message| ChartError::RenderFailed {
                tool: job.tool.clone(),
                message,
            })?;

        if bytes.is_empty() {
            return Err(ChartError::RenderFailed {
                tool: job.tool.clone(),
                message: "renderer produced an empty artifact".to_string(),
            });
        }
        if bytes.len() > self.settings.max_artifact_bytes {
            return Err(ChartError::ArtifactTooLarge {
                size: bytes.len(),
                limit: self.settings.max_artifact_bytes,
            });
        }
        self.store.save(&job.title, request_id, &job.format, &bytes).await
    }
}

fn args_preview(args: &serde_json::Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
