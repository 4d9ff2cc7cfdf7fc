//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `CHART__*` 覆盖（双下划线表示嵌套，如 `CHART__LLM__PROVIDER=mock`），
//! 最后应用约定的具名环境变量（DEEPSEEK_API_KEY、DEFAULT_MODEL、LOG_LEVEL 等）。
//! 配置只在启动时读取一次。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::core::ChartError;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub render: RenderSection,
    pub probe: ProbeSection,
    pub log: LogSection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    /// 产物目录
    pub output_dir: PathBuf,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "chart-coordinator".to_string(),
            output_dir: PathBuf::from("./output"),
        }
    }
}

/// [llm] 段：后端选择
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// deepseek / openai / mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "deepseek".to_string(),
            model: "deepseek-chat".to_string(),
            base_url: None,
            api_key: None,
        }
    }
}

/// [render] 段：单次渲染超时、产物上限、默认画布尺寸
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderSection {
    pub timeout_secs: u64,
    pub max_artifact_bytes: usize,
    pub default_width: u64,
    pub default_height: u64,
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            max_artifact_bytes: 20 * 1024 * 1024,
            default_width: 800,
            default_height: 600,
        }
    }
}

/// [probe] 段：能力探测
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeSection {
    pub timeout_secs: u64,
    /// 为 false 时跳过 CDN 可达性检查
    pub check_network: bool,
    pub python: String,
}

impl Default for ProbeSection {
    fn default() -> Self {
        Self {
            timeout_secs: 3,
            check_network: true,
            python: "python3".to_string(),
        }
    }
}

/// [log] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// 应用具名环境变量；lookup 便于测试时注入
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("DEEPSEEK_API_KEY").or_else(|| get("OPENAI_API_KEY")) {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = get("DEFAULT_MODEL") {
            self.llm.model = model;
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.log.level = level;
        }
        if let Some(dir) = get("OUTPUT_DIR") {
            self.app.output_dir = PathBuf::from(dir);
        }
        if let Some(secs) = get("RENDER_TIMEOUT_SECS") {
            match secs.trim().parse() {
                Ok(v) => self.render.timeout_secs = v,
                Err(_) => tracing::warn!(value = %secs, "ignoring invalid RENDER_TIMEOUT_SECS"),
            }
        }
        if let Some(bytes) = get("MAX_ARTIFACT_BYTES") {
            match bytes.trim().parse() {
                Ok(v) => self.render.max_artifact_bytes = v,
                Err(_) => tracing::warn!(value = %bytes, "ignoring invalid MAX_ARTIFACT_BYTES"),
            }
        }
    }

    /// 启动前校验；失败为致命错误
    pub fn validate(&self) -> Result<(), ChartError> {
        let provider = self.llm.provider.to_ascii_lowercase();
        if !matches!(provider.as_str(), "deepseek" | "openai" | "mock") {
            return Err(ChartError::Config(format!(
                "unknown llm.provider '{}', expected deepseek, openai or mock",
                self.llm.provider
            )));
        }
        if provider != "mock" && self.llm.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(ChartError::Config(
                "missing API key: set DEEPSEEK_API_KEY (or OPENAI_API_KEY)".to_string(),
            ));
        }
        if self.render.timeout_secs == 0 {
            return Err(ChartError::Config("render.timeout_secs must be greater than 0".to_string()));
        }
        if self.probe.timeout_secs == 0 {
            return Err(ChartError::Config("probe.timeout_secs must be greater than 0".to_string()));
        }
        if self.render.max_artifact_bytes == 0 {
            return Err(ChartError::Config(
                "render.max_artifact_bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render.timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe.timeout_secs)
    }
}

/// 从 config 目录加载配置，环境变量 CHART__* 与具名环境变量可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 叠加环境变量 CHART__*（双下划线表示嵌套键）
/// 4. 应用 DEEPSEEK_API_KEY、DEFAULT_MODEL、LOG_LEVEL、OUTPUT_DIR、RENDER_TIMEOUT_SECS、MAX_ARTIFACT_BYTES
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        } else {
            tracing::warn!(path = %path.display(), "config file not found, skipped");
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("CHART")
            .separator("__")
            .try_parsing(true),
    );

    let mut cfg: AppConfig = builder.build()?.try_deserialize()?;
    cfg.apply_env_overrides(|key| std::env::var(key).ok());
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.llm.model, "deepseek-chat");
        assert_eq!(cfg.render.timeout_secs, 120);
        assert_eq!(cfg.render.max_artifact_bytes, 20 * 1024 * 1024);
        assert_eq!(cfg.probe.timeout_secs, 3);
        assert_eq!(cfg.log.level, "info");
        assert_eq!(cfg.app.output_dir, PathBuf::from("./output"));
    }

    #[test]
    fn test_named_env_overrides() {
        let mut cfg = AppConfig::default();
        cfg.apply_env_overrides(env(&[
            ("OPENAI_API_KEY", "sk-openai"),
            ("DEFAULT_MODEL", "deepseek/deepseek-chat"),
            ("LOG_LEVEL", "debug"),
            ("OUTPUT_DIR", "/tmp/charts"),
            ("RENDER_TIMEOUT_SECS", "30"),
            ("MAX_ARTIFACT_BYTES", "oops"),
        ]));
        assert_eq!(cfg.llm.api_key.as_deref(), Some("sk-openai"));
        assert_eq!(cfg.llm.model, "deepseek/deepseek-chat");
        assert_eq!(cfg.log.level, "debug");
        assert_eq!(cfg.app.output_dir, PathBuf::from("/tmp/charts"));
        assert_eq!(cfg.render.timeout_secs, 30);
        assert_eq!(cfg.render.max_artifact_bytes, 20 * 1024 * 1024);
    }

    #[test]
    fn test_deepseek_key_wins() {
        let mut cfg = AppConfig::default();
        cfg.apply_env_overrides(env(&[("OPENAI_API_KEY", "b"), ("DEEPSEEK_API_KEY", "a")]));
        assert_eq!(cfg.llm.api_key.as_deref(), Some("a"));
    }

    #[test]
    fn test_validate() {
        let mut cfg = AppConfig::default();
        let err = cfg.validate().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("DEEPSEEK_API_KEY"));

        cfg.llm.provider = "mock".into();
        assert!(cfg.validate().is_ok());

        cfg.render.timeout_secs = 0;
        assert!(cfg.validate().is_err());
        cfg.render.timeout_secs = 5;
        cfg.render.max_artifact_bytes = 0;
        assert!(cfg.validate().is_err());

        cfg.render.max_artifact_bytes = 1;
        cfg.llm.provider = "gemini".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.toml");
        std::fs::write(
            &path,
            "[llm]\nprovider = \"mock\"\n\n[render]\ntimeout_secs = 7\n\n[probe]\ncheck_network = false\n",
        )
        .unwrap();
        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.llm.provider, "mock");
        assert_eq!(cfg.render.timeout_secs, 7);
        assert!(!cfg.probe.check_network);
        assert_eq!(cfg.render.default_width, 800);
    }
}
