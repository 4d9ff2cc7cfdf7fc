//! Chart Coordinator - 依赖门控的图表渲染工具注册表
//!
//! 模块划分：
//! - **cli**: 命令行参数（clap）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误分类、运行时装配
//! - **coordinator**: 请求 → 路由 → 并发渲染 → 汇总回复
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **observability**: 日志初始化
//! - **router**: 工具选择边界（Router trait 与基于 LLM 的实现）
//! - **tools**: 工具描述、能力探测、注册表、渲染后端、调用适配器与内置目录

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod core;
pub mod llm;
pub mod observability;
pub mod router;
pub mod tools;

pub use coordinator::{Coordinator, CoordinatorReply};
pub use core::{ChartError, ErrorClass};
