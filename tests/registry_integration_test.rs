//! 工具注册表集成测试：探测门控、调用适配器、协调者端到端

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use chart_coordinator::config::AppConfig;
    use chart_coordinator::core::ChartRuntimeBuilder;
    use chart_coordinator::llm::MockLlmClient;
    use chart_coordinator::tools::{
        AdapterSettings, ArtifactStore, CapabilityProbe, CommandBackend, DomainTag, InvocationAdapter,
        OutputKind, ParamSpec, ParamType, RegisteredTool, RenderBackend, RenderJob,
        RenderRequest, RenderRoutine, RenderStatus, Requirement, ToolDescriptor, ToolRegistry,
    };
    use serde_json::json;

    /// 计数的渲染例程，可选地在返回前等待
    struct Counting {
        calls: Arc<AtomicUsize>,
        delay: Duration,
    }

    #[async_trait]
    impl RenderRoutine for Counting {
        async fn render(&self, job: &RenderJob) -> Result<Vec<u8>, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(format!("<svg data-tool=\"{}\">{}</svg>", job.tool, job.code).into_bytes())
        }
    }

    fn tool(name: &str, calls: &Arc<AtomicUsize>, delay: Duration) -> RegisteredTool {
        RegisteredTool::new(
            ToolDescriptor::new(name, "test tool", DomainTag::Statistical, OutputKind::StaticImage)
                .formats(&["svg"])
                .with_chart_params("chart source", "chart")
                .param(ParamSpec::required("data", ParamType::Array, "data rows")),
            RenderBackend::routine(Counting {
                calls: calls.clone(),
                delay,
            }),
        )
    }

    fn empty_path_probe(dir: &Path) -> CapabilityProbe {
        CapabilityProbe::new(Duration::from_secs(1))
            .with_network(false)
            .with_search_path(dir.as_os_str())
    }

    fn files_in(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_unsatisfied_tools_excluded_but_reported() {
        let bin = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new(empty_path_probe(bin.path()));
        registry.register(tool("graphviz_render", &calls, Duration::ZERO), vec![Requirement::executable("dot")]);
        registry.register(tool("bars_render", &calls, Duration::ZERO), vec![]);

        let report = registry.activate_all().await;
        assert_eq!(report.results.len(), 2);
        let graphviz = report.get("graphviz_render").unwrap();
        assert!(!graphviz.satisfied);
        assert!(graphviz.missing.iter().any(|m| m.contains("dot")));
        assert!(report.get("bars_render").unwrap().satisfied);

        let active = registry.active();
        assert!(!active.contains("graphviz_render"));
        assert!(active.contains("bars_render"));
        let described: Vec<String> = registry.describe_active().into_iter().map(|s| s.name).collect();
        assert_eq!(described, vec!["bars_render".to_string()]);
    }

    #[tokio::test]
    async fn test_activate_all_is_idempotent() {
        let bin = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new(empty_path_probe(bin.path()));
        registry.register(tool("graphviz_render", &calls, Duration::ZERO), vec![Requirement::executable("dot")]);
        registry.register(tool("bars_render", &calls, Duration::ZERO), vec![]);

        let first = registry.activate_all().await;
        let second = registry.activate_all().await;
        assert_eq!(first, second);
        assert_eq!(registry.active().names(), vec!["bars_render".to_string()]);
    }

    #[tokio::test]
    async fn test_adapter_rejects_before_any_side_effect() {
        let bin = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new(empty_path_probe(bin.path()));
        registry.register(tool("graphviz_render", &calls, Duration::ZERO), vec![Requirement::executable("dot")]);
        registry.register(tool("x_render", &calls, Duration::ZERO), vec![]);
        registry.activate_all().await;
        let adapter = InvocationAdapter::new(
            registry.active(),
            ArtifactStore::new(out.path()),
            AdapterSettings::default(),
        );

        // 注册过但未启用
        let r = adapter
            .execute(RenderRequest::new("graphviz_render", json!({"code": "a", "data": []})))
            .await;
        assert_eq!(r.status, RenderStatus::BadRequest);
        assert!(r.diagnostic.as_deref().unwrap().contains("graphviz_render"));

        // 从未注册
        let r = adapter.execute(RenderRequest::new("nope_render", json!({}))).await;
        assert_eq!(r.status, RenderStatus::BadRequest);

        // 缺少必需参数
        let r = adapter.execute(RenderRequest::new("x_render", json!({}))).await;
        assert_eq!(r.status, RenderStatus::BadRequest);
        assert!(r.diagnostic.as_deref().unwrap().contains("data"));
        assert!(r.artifact.is_none());

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(files_in(out.path()), 0);
    }

    #[tokio::test]
    async fn test_timeout_yields_failure_without_artifact() {
        let out = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::default();
        registry.register(tool("slow_render", &calls, Duration::from_secs(5)), vec![]);
        registry.activate_all().await;
        let adapter = InvocationAdapter::new(
            registry.active(),
            ArtifactStore::new(out.path()),
            AdapterSettings {
                timeout: Duration::from_millis(100),
                ..AdapterSettings::default()
            },
        );

        let r = adapter
            .execute(RenderRequest::new("slow_render", json!({"code": "plot()", "data": [1, 2]})))
            .await;
        assert_eq!(r.status, RenderStatus::Failure);
        assert!(r.diagnostic.as_deref().unwrap().to_lowercase().contains("timeout"));
        assert!(r.artifact.is_none());
        assert_eq!(r.fallback_code.as_deref(), Some("plot()"));
        assert_eq!(files_in(out.path()), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_external_command_killed_on_timeout() {
        let out = tempfile::tempdir().unwrap();
        let mut registry = ToolRegistry::default();
        registry.register(
            RegisteredTool::new(
                ToolDescriptor::new("sleepy_cmd", "shell tool", DomainTag::Statistical, OutputKind::StaticImage)
                    .formats(&["txt"])
                    .with_chart_params("chart source", "chart"),
                RenderBackend::Command(CommandBackend::new(
                    "sh",
                    &["-c", "sleep 30; echo x > {{output}}"],
                    "in.txt",
                    "out.{{format}}",
                )),
            ),
            vec![],
        );
        registry.activate_all().await;
        let adapter = InvocationAdapter::new(
            registry.active(),
            ArtifactStore::new(out.path()),
            AdapterSettings {
                timeout: Duration::from_millis(200),
                ..AdapterSettings::default()
            },
        );

        let start = std::time::Instant::now();
        let r = adapter
            .execute(RenderRequest::new("sleepy_cmd", json!({"code": "x"})))
            .await;
        assert!(start.elapsed() < Duration::from_secs(10));
        assert_eq!(r.status, RenderStatus::Failure);
        assert!(r.diagnostic.as_deref().unwrap().to_lowercase().contains("timeout"));
        assert!(r.artifact.is_none());
        assert_eq!(files_in(out.path()), 0);
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_independent() {
        let out = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::default();
        registry.register(tool("a_render", &calls, Duration::from_millis(50)), vec![]);
        registry.register(tool("b_render", &calls, Duration::from_millis(50)), vec![]);
        registry.activate_all().await;
        let adapter = InvocationAdapter::new(
            registry.active(),
            ArtifactStore::new(out.path()),
            AdapterSettings::default(),
        );

        let results = adapter
            .execute_all(vec![
                RenderRequest::new("a_render", json!({"code": "a", "data": [], "title": "a"})),
                RenderRequest::new("b_render", json!({"code": "b"})),
                RenderRequest::new("b_render", json!({"code": "b", "data": [], "title": "b"})),
            ])
            .await;
        assert_eq!(results.len(), 3);
        assert!(results[0].is_success());
        assert_eq!(results[1].status, RenderStatus::BadRequest);
        assert!(results[2].is_success());
        assert_ne!(results[0].request_id, results[2].request_id);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(files_in(out.path()), 2);
    }

    #[tokio::test]
    async fn test_coordinator_end_to_end_with_mock_llm() {
        let out = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "mock".into();
        cfg.app.output_dir = out.path().to_path_buf();

        let llm = Arc::new(MockLlmClient::with_replies([
            "```json\n[{\"tool\": \"bars_render\", \"args\": {\"code\": \"bar(1,2)\", \"data\": [[1, 2]], \"title\": \"Sales\"}}]\n```",
            "Please share the numbers you want plotted.",
        ]));
        let runtime = ChartRuntimeBuilder::new(cfg)
            .with_builtin_tools(false)
            .with_tool(tool("bars_render", &calls, Duration::ZERO), vec![])
            .with_llm(llm.clone())
            .build()
            .await
            .unwrap();

        let reply = runtime.coordinator.handle("bar chart of sales").await.unwrap();
        assert!(reply.all_succeeded(), "{:?}", reply);
        let artifact = reply.results[0].artifact.as_ref().unwrap();
        assert!(artifact.path.starts_with(out.path()));
        assert_eq!(artifact.mime_type, "image/svg+xml");

        let reply = runtime.coordinator.handle("make a chart").await.unwrap();
        assert!(reply.results.is_empty());
        assert!(reply.reply.unwrap().contains("numbers"));

        assert_eq!(llm.requests().len(), 2);
        assert!(llm.requests()[0][0].content.contains("bars_render"));
    }
}
