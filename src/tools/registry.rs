//! 工具注册表
//!
//! register 收集候选工具（描述 + 后端 + 依赖声明），activate_all 对全部候选跑能力探测，
//! 只把依赖满足的工具发布为不可变快照 ActiveToolSet（Arc 共享，请求处理期间只读）。
//! describe_active 返回供外部路由器（LLM）阅读的工具描述，是与路由器之间唯一的契约边界。

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::backend::RenderBackend;
use crate::tools::descriptor::{DomainTag, OutputKind, ToolDescriptor};
use crate::tools::probe::{CapabilityProbe, DependencyCheckResult, Requirement};
use crate::tools::specialist::Specialist;

/// 已注册工具：描述 + 渲染后端
#[derive(Debug, Clone)]
pub struct RegisteredTool {
    pub descriptor: ToolDescriptor,
    pub backend: RenderBackend,
}

impl RegisteredTool {
    pub fn new(descriptor: ToolDescriptor, backend: RenderBackend) -> Self {
        Self { descriptor, backend }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

/// 供路由器阅读的工具描述（名称、描述、参数 JSON Schema）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub domain: DomainTag,
    pub output_kind: OutputKind,
    pub formats: Vec<String>,
    pub parameters: Value,
}

impl From<&ToolDescriptor> for ToolSpec {
    fn from(d: &ToolDescriptor) -> Self {
        Self {
            name: d.name.clone(),
            description: d.description.clone(),
            domain: d.domain,
            output_kind: d.output_kind,
            formats: d.formats.clone(),
            parameters: d.params.to_json_schema(),
        }
    }
}

/// 依赖满足的工具集合；启动（或显式重新探测）后发布，之后只读
#[derive(Debug, Default)]
pub struct ActiveToolSet {
    tools: BTreeMap<String, Arc<RegisteredTool>>,
}

impl ActiveToolSet {
    pub fn get(&self, name: &str) -> Option<Arc<RegisteredTool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// 全部可用工具的描述，按名称排序
    pub fn describe(&self) -> Vec<ToolSpec> {
        self.tools
            .values()
            .map(|t| ToolSpec::from(&t.descriptor))
            .collect()
    }

    /// 只返回某个专家分组内且可用的工具
    pub fn describe_for(&self, specialist: Specialist) -> Vec<ToolSpec> {
        specialist
            .tool_names()
            .iter()
            .filter_map(|name| self.tools.get(*name))
            .map(|t| ToolSpec::from(&t.descriptor))
            .collect()
    }

    /// 工具描述的 JSON 文本，用于拼入 system prompt
    pub fn to_schema_json(&self) -> String {
        serde_json::to_string_pretty(&self.describe()).unwrap_or_else(|_| "[]".to_string())
    }
}

/// activate_all 的完整报告：包含所有候选工具（满足与不满足）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationReport {
    pub results: Vec<DependencyCheckResult>,
}

impl ActivationReport {
    pub fn get(&self, tool: &str) -> Option<&DependencyCheckResult> {
        self.results.iter().find(|r| r.tool == tool)
    }

    pub fn satisfied(&self) -> impl Iterator<Item = &DependencyCheckResult> {
        self.results.iter().filter(|r| r.satisfied)
    }

    pub fn unsatisfied(&self) -> impl Iterator<Item = &DependencyCheckResult> {
        self.results.iter().filter(|r| !r.satisfied)
    }

    pub fn summary(&self) -> String {
        format!(
            "{}/{} tools active",
            self.satisfied().count(),
            self.results.len()
        )
    }
}

struct Candidate {
    tool: Arc<RegisteredTool>,
    requirements: Vec<Requirement>,
}

/// 工具注册表：显式构造、按引用传递，不使用全局状态
pub struct ToolRegistry {
    candidates: BTreeMap<String, Candidate>,
    probe: CapabilityProbe,
    active: Arc<ActiveToolSet>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(CapabilityProbe::default())
    }
}

impl ToolRegistry {
    pub fn new(probe: CapabilityProbe) -> Self {
        Self {
            candidates: BTreeMap::new(),
            probe,
            active: Arc::new(ActiveToolSet::default()),
        }
    }

    /// 注册候选工具；同名重复注册时后者覆盖前者并告警。返回是否覆盖了已有候选
    pub fn register(&mut self, tool: RegisteredTool, requirements: Vec<Requirement>) -> bool {
        let name = tool.name().to_string();
        let replaced = self
            .candidates
            .insert(
                name.clone(),
                Candidate {
                    tool: Arc::new(tool),
                    requirements,
                },
            )
            .is_some();
        if replaced {
            tracing::warn!(tool = %name, "duplicate tool registration, last one wins");
        }
        replaced
    }

    pub fn candidate_names(&self) -> Vec<String> {
        self.candidates.keys().cloned().collect()
    }

    /// 对全部候选并发跑能力探测，发布新的 ActiveToolSet，返回完整报告（按名称排序）
    pub async fn activate_all(&mut self) -> ActivationReport {
        let probe = &self.probe;
        let checks = self
            .candidates
            .iter()
            .map(|(name, c)| probe.check(name, &c.requirements));
        let results: Vec<DependencyCheckResult> = join_all(checks).await;

        let mut tools = BTreeMap::new();
        for result in &results {
            if result.satisfied {
                tracing::info!(tool = %result.tool, "tool active");
                if let Some(c) = self.candidates.get(&result.tool) {
                    tools.insert(result.tool.clone(), c.tool.clone());
                }
            } else if let Some(e) = result.error() {
                tracing::warn!(tool = %result.tool, error = %e, "tool excluded");
            }
        }
        self.active = Arc::new(ActiveToolSet { tools });

        let report = ActivationReport { results };
        tracing::info!(summary = %report.summary(), "capability probing finished");
        report
    }

    /// 当前发布的快照；activate_all 之前为空集合
    pub fn active(&self) -> Arc<ActiveToolSet> {
        self.active.clone()
    }

    pub fn describe_active(&self) -> Vec<ToolSpec> {
        self.active.describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::backend::{RenderJob, RenderRoutine};
    use crate::tools::descriptor::{ParamSpec, ParamType};
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl RenderRoutine for Echo {
        async fn render(&self, job: &RenderJob) -> Result<Vec<u8>, String> {
            Ok(job.code.clone().into_bytes())
        }
    }

    fn tool(name: &str, description: &str) -> RegisteredTool {
        RegisteredTool::new(
            ToolDescriptor::new(name, description, DomainTag::Statistical, OutputKind::StaticImage)
                .formats(&["png"])
                .param(ParamSpec::required("data", ParamType::Array, "rows")),
            RenderBackend::routine(Echo),
        )
    }

    #[tokio::test]
    async fn test_unsatisfied_excluded_but_reported() {
        let mut registry = ToolRegistry::default();
        registry.register(tool("ok_tool", "a"), vec![]);
        registry.register(
            tool("graphviz_render", "b"),
            vec![Requirement::executable("dot-surely-not-installed-xyz")],
        );
        let report = registry.activate_all().await;

        assert_eq!(report.results.len(), 2);
        let bad = report.get("graphviz_render").unwrap();
        assert!(!bad.satisfied);
        assert!(bad.missing[0].contains("dot-surely-not-installed-xyz"));

        let active = registry.active();
        assert!(active.contains("ok_tool"));
        assert!(!active.contains("graphviz_render"));
        assert_eq!(report.summary(), "1/2 tools active");
    }

    #[tokio::test]
    async fn test_activate_twice_is_identical() {
        let mut registry = ToolRegistry::default();
        registry.register(tool("b_tool", "b"), vec![Requirement::executable("nope-xyz")]);
        registry.register(tool("a_tool", "a"), vec![]);
        let first = registry.activate_all().await;
        let second = registry.activate_all().await;
        assert_eq!(first, second);
        assert_eq!(first.results[0].tool, "a_tool");
    }

    #[tokio::test]
    async fn test_duplicate_registration_last_wins() {
        let mut registry = ToolRegistry::default();
        assert!(!registry.register(tool("x", "first"), vec![]));
        assert!(registry.register(tool("x", "second"), vec![]));
        assert_eq!(registry.candidate_names(), vec!["x".to_string()]);
        registry.activate_all().await;
        let specs = registry.describe_active();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].description, "second");
    }

    #[tokio::test]
    async fn test_describe_active_contract() {
        let mut registry = ToolRegistry::default();
        registry.register(tool("x", "draws x"), vec![]);
        assert!(registry.describe_active().is_empty(), "nothing active before probing");
        registry.activate_all().await;
        let spec = &registry.describe_active()[0];
        assert_eq!(spec.name, "x");
        assert_eq!(spec.parameters["required"], serde_json::json!(["data"]));
        assert_eq!(spec.parameters["properties"]["data"]["type"], "array");
        let json = registry.active().to_schema_json();
        assert!(json.contains("\"draws x\""));
    }

    #[tokio::test]
    async fn test_snapshot_survives_reprobe() {
        let mut registry = ToolRegistry::default();
        registry.register(tool("x", "x"), vec![]);
        registry.activate_all().await;
        let old = registry.active();
        registry.register(tool("y", "y"), vec![]);
        registry.activate_all().await;
        assert_eq!(old.len(), 1);
        assert_eq!(registry.active().len(), 2);
    }
}
