//! 渲染后端：封闭的后端种类集合
//!
//! - Command：在临时目录里把代码写入输入文件，直接 exec 外部程序（无 shell），读回唯一的输出文件
//! - Html：把代码嵌入自包含的 HTML 页面（交互式文档）
//! - Routine：进程内渲染例程（嵌入方自定义、测试）
//!
//! 后端只负责产出字节；超时、大小上限与落盘由 InvocationAdapter 统一处理。
//! 参数模板中 {{input}} / {{output}} / {{dir}} / {{format}} / {{width}} / {{height}}
//! 替换为本次渲染的值，{{key}} 从校验后的参数中取 key。

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

use crate::tools::descriptor::ValidatedParams;
use crate::tools::dot;
use crate::tools::html::HtmlBackend;

/// 一次渲染所需的全部输入（参数已校验、格式已解析）
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub tool: String,
    pub code: String,
    pub format: String,
    pub title: String,
    pub width: u64,
    pub height: u64,
    pub params: ValidatedParams,
}

/// 进程内渲染例程：产出恰好一个产物的字节，或返回可区分的错误信息
#[async_trait]
pub trait RenderRoutine: Send + Sync {
    async fn render(&self, job: &RenderJob) -> Result<Vec<u8>, String>;
}

/// 后端种类（带标签的联合体）
#[derive(Clone)]
pub enum RenderBackend {
    Command(CommandBackend),
    Html(HtmlBackend),
    Routine(Arc<dyn RenderRoutine>),
}

impl fmt::Debug for RenderBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderBackend::Command(c) => f.debug_tuple("Command").field(&c.program).finish(),
            RenderBackend::Html(h) => f.debug_tuple("Html").field(h).finish(),
            RenderBackend::Routine(_) => f.write_str("Routine"),
        }
    }
}

impl RenderBackend {
    pub fn routine(routine: impl RenderRoutine + 'static) -> Self {
        RenderBackend::Routine(Arc::new(routine))
    }

    pub async fn render(&self, job: &RenderJob) -> Result<Vec<u8>, String> {
        match self {
            RenderBackend::Command(c) => c.run(job).await,
            RenderBackend::Html(h) => h.render(job),
            RenderBackend::Routine(r) => r.render(job).await,
        }
    }
}

/// 写入输入文件前对代码做的变换
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceTransform {
    Raw,
    /// DOT 预处理 + 结构校验
    Dot,
    /// 补全 @startuml / @enduml
    PlantUml,
    /// Python 脚本：前置环境准备，后置保存语句
    Python { epilogue: String },
}

const PYTHON_PRELUDE: &str = r#"import os
OUTPUT_PATH = os.environ["CHART_OUTPUT_PATH"]
OUTPUT_FORMAT = os.environ["CHART_OUTPUT_FORMAT"]
WIDTH = int(os.environ["CHART_WIDTH"])
HEIGHT = int(os.environ["CHART_HEIGHT"])
try:
    import matplotlib
    matplotlib.use("Agg")
except ImportError:
    pass
"#;

impl SourceTransform {
    pub fn apply(&self, code: &str) -> Result<String, String> {
        match self {
            SourceTransform::Raw => Ok(code.to_string()),
            SourceTransform::Dot => {
                let processed = dot::preprocess(code);
                dot::validate(&processed).map_err(|e| format!("DOT syntax error: {}", e))?;
                Ok(processed)
            }
            SourceTransform::PlantUml => {
                let mut s = code.trim().to_string();
                if !s.starts_with("@startuml") {
                    s = format!("@startuml\n{}", s);
                }
                if !s.ends_with("@enduml") {
                    s = format!("{}\n@enduml", s);
                }
                Ok(s)
            }
            SourceTransform::Python { epilogue } => {
                Ok(format!("{}\n{}\n\n{}\n", PYTHON_PRELUDE, code, epilogue))
            }
        }
    }
}

/// 外部程序后端
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: String,
    args_template: Vec<String>,
    input_file: String,
    output_file: String,
    transform: SourceTransform,
}

impl CommandBackend {
    /// output_file 可含 {{format}}，如 "output.{{format}}"
    pub fn new(program: &str, args_template: &[&str], input_file: &str, output_file: &str) -> Self {
        Self {
            program: program.to_string(),
            args_template: args_template.iter().map(|s| s.to_string()).collect(),
            input_file: input_file.to_string(),
            output_file: output_file.to_string(),
            transform: SourceTransform::Raw,
        }
    }

    /// Python 脚本后端：代码写入 chart.py，由 python 解释器执行，epilogue 负责保存到 OUTPUT_PATH
    pub fn python(python: &str, epilogue: &str) -> Self {
        Self::new(python, &["{{input}}"], "chart.py", "output.{{format}}").with_transform(
            SourceTransform::Python {
                epilogue: epilogue.to_string(),
            },
        )
    }

    pub fn with_transform(mut self, transform: SourceTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn placeholders(&self, job: &RenderJob, input: &Path, output: &Path, dir: &Path) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        for (k, v) in job.params.iter() {
            let val = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            vars.insert(k.clone(), val);
        }
        vars.insert("input".into(), input.to_string_lossy().to_string());
        vars.insert("output".into(), output.to_string_lossy().to_string());
        vars.insert("dir".into(), dir.to_string_lossy().to_string());
        vars.insert("format".into(), job.format.clone());
        vars.insert("width".into(), job.width.to_string());
        vars.insert("height".into(), job.height.to_string());
        vars
    }

    async fn run(&self, job: &RenderJob) -> Result<Vec<u8>, String> {
        let source = self.transform.apply(&job.code)?;
        let scratch = tempfile::tempdir().map_err(|e| format!("scratch dir: {}", e))?;
        let dir = scratch.path();

        let input = dir.join(&self.input_file);
        tokio::fs::write(&input, source)
            .await
            .map_err(|e| format!("write input: {}", e))?;
        let output = dir.join(self.output_file.replace("{{format}}", &job.format));

        let vars = self.placeholders(job, &input, &output, dir);
        let args: Vec<String> = self
            .args_template
            .iter()
            .map(|tpl| substitute(tpl, &vars))
            .collect();

        tracing::debug!(tool = %job.tool, program = %self.program, args = ?args, "render command");
        let child = Command::new(&self.program)
            .args(&args)
            .current_dir(dir)
            .env("CHART_OUTPUT_PATH", &output)
            .env("CHART_OUTPUT_FORMAT", &job.format)
            .env("CHART_WIDTH", job.width.to_string())
            .env("CHART_HEIGHT", job.height.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("{} spawn failed: {}", self.program, e))?;
        let out = child
            .wait_with_output()
            .await
            .map_err(|e| format!("{} wait failed: {}", self.program, e))?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(format!(
                "{} exited with {}: {}",
                self.program,
                out.status,
                truncate(stderr.trim(), 800)
            ));
        }
        tokio::fs::read(&output).await.map_err(|_| {
            format!(
                "{} finished but produced no output file '{}'",
                self.program,
                output.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default()
            )
        })
    }
}

/// 替换 {{key}} 占位符；未知占位符保持原样
pub fn substitute(template: &str, vars: &HashMap<String, String>) -> String {
    let mut s = template.to_string();
    for (k, v) in vars {
        let placeholder = format!("{{{{{}}}}}", k);
        if s.contains(&placeholder) {
            s = s.replace(&placeholder, v);
        }
    }
    s
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    } else {
        s.to_string()
    }
}
