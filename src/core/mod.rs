//! 核心层：错误分类与运行时装配

pub mod error;
pub mod runtime;

pub use error::{ChartError, ErrorClass};
pub use runtime::{build_runtime, create_llm_from_config, ChartRuntime, ChartRuntimeBuilder};
