//! 错误类型与错误分类
//!
//! 探测与调用失败一律转为结构化结果（DependencyCheckResult / RenderResult），
//! 只有配置错误（如缺少 API Key）会终止进程。

use thiserror::Error;

/// 运行过程中可能出现的错误（依赖缺失、参数错误、渲染失败、超时、配置等）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    #[error("Tool '{tool}' unavailable: {}", reasons.join("; "))]
    DependencyUnsatisfied { tool: String, reasons: Vec<String> },

    #[error("Unknown or inactive tool: {0}")]
    UnknownTool(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Render failed ({tool}): {message}")]
    RenderFailed { tool: String, message: String },

    #[error("Render timeout ({tool}): no artifact after {secs:.1}s")]
    RenderTimeout { tool: String, secs: f64 },

    #[error("Artifact too large: {size} bytes exceeds limit of {limit} bytes")]
    ArtifactTooLarge { size: usize, limit: usize },

    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error("Router error: {0}")]
    Router(String),

    #[error("Config error: {0}")]
    Config(String),
}

/// 错误分类：决定失败是否致命、以何种状态呈现给调用方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// 依赖不满足：工具被排除，不致命
    DependencyUnsatisfied,
    /// 参数缺失 / 类型错误 / 未知工具：执行前拒绝
    BadRequest,
    /// 渲染例程报错或超时：不致命
    RenderFailure,
    /// 启动配置错误：致命，进程拒绝服务
    Config,
}

impl ChartError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ChartError::DependencyUnsatisfied { .. } => ErrorClass::DependencyUnsatisfied,
            ChartError::UnknownTool(_) | ChartError::BadRequest(_) => ErrorClass::BadRequest,
            ChartError::RenderFailed { .. }
            | ChartError::RenderTimeout { .. }
            | ChartError::ArtifactTooLarge { .. }
            | ChartError::Artifact(_)
            | ChartError::Router(_) => ErrorClass::RenderFailure,
            ChartError::Config(_) => ErrorClass::Config,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.class() == ErrorClass::Config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_config_is_fatal() {
        assert!(ChartError::Config("DEEPSEEK_API_KEY missing".into()).is_fatal());
        assert!(!ChartError::UnknownTool("x".into()).is_fatal());
        assert!(!ChartError::RenderTimeout { tool: "x".into(), secs: 1.0 }.is_fatal());
    }

    #[test]
    fn test_classification() {
        assert_eq!(ChartError::UnknownTool("x".into()).class(), ErrorClass::BadRequest);
        assert_eq!(
            ChartError::ArtifactTooLarge { size: 10, limit: 5 }.class(),
            ErrorClass::RenderFailure
        );
        let e = ChartError::DependencyUnsatisfied {
            tool: "graphviz_render".into(),
            reasons: vec!["executable 'dot' not found on PATH".into()],
        };
        assert_eq!(e.class(), ErrorClass::DependencyUnsatisfied);
        assert!(e.to_string().contains("dot"));
    }
}
