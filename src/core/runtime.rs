//! 运行时构建器：统一的启动装配逻辑
//!
//! 配置 → 能力探测器 → 注册内置目录（及额外工具）→ activate_all → 发布快照
//! → 调用适配器 → LLM 客户端与路由器 → 协调者。

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::coordinator::Coordinator;
use crate::core::ChartError;
use crate::llm::{create_deepseek_client, LlmClient, MockLlmClient, OpenAiClient};
use crate::router::{LlmRouter, Router};
use crate::tools::{
    register_builtin, ActivationReport, ActiveToolSet, AdapterSettings, ArtifactStore,
    CapabilityProbe, CatalogOptions, InvocationAdapter, RegisteredTool, Requirement, ToolRegistry,
};

/// 按配置创建 LLM 客户端：deepseek / openai / mock
pub fn create_llm_from_config(cfg: &AppConfig) -> Result<Arc<dyn LlmClient>, ChartError> {
    let provider = cfg.llm.provider.to_ascii_lowercase();
    if provider == "mock" {
        tracing::warn!("Using Mock LLM");
        return Ok(Arc::new(MockLlmClient::new()));
    }
    let api_key = cfg
        .llm
        .api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| ChartError::Config("missing API key".to_string()))?;
    let base = cfg.llm.base_url.as_deref();
    match provider.as_str() {
        "deepseek" => {
            tracing::info!("Using DeepSeek LLM ({})", cfg.llm.model);
            Ok(Arc::new(create_deepseek_client(base, &cfg.llm.model, api_key)))
        }
        "openai" => {
            tracing::info!("Using OpenAI LLM ({})", cfg.llm.model);
            Ok(Arc::new(OpenAiClient::new(base, &cfg.llm.model, api_key)))
        }
        other => Err(ChartError::Config(format!("unknown llm.provider '{}'", other))),
    }
}

/// 装配完成的运行时
pub struct ChartRuntime {
    pub report: ActivationReport,
    pub active: Arc<ActiveToolSet>,
    pub adapter: Arc<InvocationAdapter>,
    pub coordinator: Coordinator,
}

/// 运行时构建器
pub struct ChartRuntimeBuilder {
    config: AppConfig,
    builtin: bool,
    extra: Vec<(RegisteredTool, Vec<Requirement>)>,
    llm: Option<Arc<dyn LlmClient>>,
    router: Option<Arc<dyn Router>>,
}

impl ChartRuntimeBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            builtin: true,
            extra: Vec::new(),
            llm: None,
            router: None,
        }
    }

    /// 是否注册内置的 15 个渲染工具（默认是）
    pub fn with_builtin_tools(mut self, enabled: bool) -> Self {
        self.builtin = enabled;
        self
    }

    /// 追加一个候选工具；与内置工具同名时覆盖内置工具
    pub fn with_tool(mut self, tool: RegisteredTool, requirements: Vec<Requirement>) -> Self {
        self.extra.push((tool, requirements));
        self
    }

    /// 指定 LLM 客户端，不再按配置创建
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// 指定路由器，优先于 with_llm
    pub fn with_router(mut self, router: Arc<dyn Router>) -> Self {
        self.router = Some(router);
        self
    }

    /// 探测并发布工具集；探测失败的工具只会出现在报告中
    pub async fn build(self) -> Result<ChartRuntime, ChartError> {
        let cfg = &self.config;
        let probe = CapabilityProbe::new(cfg.probe_timeout())
            .with_python(cfg.probe.python.clone())
            .with_network(cfg.probe.check_network);
        let mut registry = ToolRegistry::new(probe);

        if self.builtin {
            let options = CatalogOptions {
                python: cfg.probe.python.clone(),
                default_width: cfg.render.default_width,
                default_height: cfg.render.default_height,
            };
            register_builtin(&mut registry, &options);
        }
        for (tool, requirements) in self.extra {
            registry.register(tool, requirements);
        }

        let report = registry.activate_all().await;
        let active = registry.active();

        let settings = AdapterSettings {
            timeout: Duration::from_secs(cfg.render.timeout_secs),
            max_artifact_bytes: cfg.render.max_artifact_bytes,
        };
        let adapter = Arc::new(InvocationAdapter::new(
            active.clone(),
            ArtifactStore::new(cfg.app.output_dir.clone()),
            settings,
        ));

        let router: Arc<dyn Router> = match (self.router, self.llm) {
            (Some(router), _) => router,
            (None, Some(llm)) => Arc::new(LlmRouter::new(llm)),
            (None, None) => Arc::new(LlmRouter::new(create_llm_from_config(cfg)?)),
        };
        let coordinator = Coordinator::new(router, adapter.clone());

        Ok(ChartRuntime {
            report,
            active,
            adapter,
            coordinator,
        })
    }
}

/// 按配置构建运行时（内置工具 + 配置指定的 LLM）
pub async fn build_runtime(cfg: &AppConfig) -> Result<ChartRuntime, ChartError> {
    ChartRuntimeBuilder::new(cfg.clone()).build().await
}
