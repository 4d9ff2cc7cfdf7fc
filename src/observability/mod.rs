//! 可观测性：tracing 日志初始化
//!
//! 日志一律写 stderr；stdout 只留给命令行输出的 JSON。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 设置了 RUST_LOG 时以其为准，否则使用配置的级别；级别无法解析时退回 info
pub fn init(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(filter(level))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
