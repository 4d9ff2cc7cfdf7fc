//! 能力探测：启动时检查每个工具的运行时依赖
//!
//! 依赖分四类：PATH 上的可执行文件、Python 模块、本地文件、网络端点。
//! 每项检查都有超时上限（默认 3 秒）；任何失败（找不到、超时、非零退出、网络错误）
//! 都记为「不满足」并附原因，绝不向上抛出，也不会中断整体启动流程。

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::core::ChartError;

/// 单项运行时依赖
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Requirement {
    /// PATH 上的可执行文件；version_args 非空时还会带参数运行一次并要求退出码为 0
    Executable {
        program: String,
        #[serde(default)]
        version_args: Vec<String>,
    },
    /// 可由 Python 解释器 import 的模块
    PythonModule { module: String },
    /// 本地文件（如 jar、离线脚本）
    File { path: PathBuf },
    /// 网络端点（如 CDN），GET 返回成功状态码即视为可达
    Endpoint { url: String },
}

impl Requirement {
    pub fn executable(program: &str) -> Self {
        Requirement::Executable {
            program: program.to_string(),
            version_args: Vec::new(),
        }
    }

    pub fn executable_with_version(program: &str, version_args: &[&str]) -> Self {
        Requirement::Executable {
            program: program.to_string(),
            version_args: version_args.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn python_module(module: &str) -> Self {
        Requirement::PythonModule {
            module: module.to_string(),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Requirement::File { path: path.into() }
    }

    pub fn endpoint(url: &str) -> Self {
        Requirement::Endpoint {
            url: url.to_string(),
        }
    }
}

/// 单个工具的探测结果；每次启动重新生成，不持久化
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyCheckResult {
    pub tool: String,
    pub satisfied: bool,
    /// 人类可读的缺失项说明
    pub missing: Vec<String>,
}

impl DependencyCheckResult {
    /// 不满足时给出对应的错误；满足时为 None
    pub fn error(&self) -> Option<ChartError> {
        (!self.satisfied).then(|| ChartError::DependencyUnsatisfied {
            tool: self.tool.clone(),
            reasons: self.missing.clone(),
        })
    }
}

/// 探测器：持有单项超时、Python 解释器名与是否检查网络
#[derive(Debug, Clone)]
pub struct CapabilityProbe {
    timeout: Duration,
    python: String,
    check_network: bool,
    /// 覆盖 PATH 的查找目录
    search_path: Option<OsString>,
}

impl Default for CapabilityProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

impl CapabilityProbe {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            python: "python3".to_string(),
            check_network: true,
            search_path: None,
        }
    }

    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    /// 关闭网络探测：Endpoint 依赖被跳过（离线环境或测试）
    pub fn with_network(mut self, check_network: bool) -> Self {
        self.check_network = check_network;
        self
    }

    /// 用给定目录列表代替进程的 PATH 查找可执行文件
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        match &self.search_path {
            Some(paths) => find_in_paths(program, paths),
            None => find_on_path(program),
        }
    }

    /// 检查一个工具的全部依赖，汇总为 DependencyCheckResult
    pub async fn check(&self, tool: &str, requirements: &[Requirement]) -> DependencyCheckResult {
        let mut missing = Vec::new();
        for req in requirements {
            if let Err(reason) = self.check_one(req).await {
                missing.push(reason);
            }
        }
        DependencyCheckResult {
            tool: tool.to_string(),
            satisfied: missing.is_empty(),
            missing,
        }
    }

    /// 单项检查；Err 为不满足原因
    pub async fn check_one(&self, req: &Requirement) -> Result<(), String> {
        match req {
            Requirement::Executable {
                program,
                version_args,
            } => {
                let path = self.locate(program)
                    .ok_or_else(|| format!("executable '{}' not found on PATH", program))?;
                if version_args.is_empty() {
                    return Ok(());
                }
                self.run_bounded(&path, version_args)
                    .await
                    .map_err(|e| format!("executable '{}' is not usable: {}", program, e))
            }
            Requirement::PythonModule { module } => {
                let python = self.locate(&self.python).ok_or_else(|| {
                    format!(
                        "python module '{}' unavailable: interpreter '{}' not found on PATH",
                        module, self.python
                    )
                })?;
                let args = vec!["-c".to_string(), format!("import {}", module)];
                self.run_bounded(&python, &args)
                    .await
                    .map_err(|e| format!("python module '{}' unavailable: {}", module, e))
            }
            Requirement::File { path } => {
                if path.is_file() {
                    Ok(())
                } else {
                    Err(format!("required file '{}' does not exist", path.display()))
                }
            }
            Requirement::Endpoint { url } => {
                if !self.check_network {
                    tracing::debug!(url = %url, "network probe skipped");
                    return Ok(());
                }
                self.reach(url)
                    .await
                    .map_err(|e| format!("endpoint '{}' unreachable: {}", url, e))
            }
        }
    }

    /// 带超时运行外部程序，丢弃输出，只看退出码
    async fn run_bounded(&self, program: &Path, args: &[String]) -> Result<(), String> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("spawn failed: {}", e))?;
        let status = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| format!("timed out after {:?}", self.timeout))?
            .map_err(|e| format!("wait failed: {}", e))?
            .status;
        if status.success() {
            Ok(())
        } else {
            Err(format!("exited with {}", status))
        }
    }

    async fn reach(&self, url: &str) -> Result<(), String> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| e.to_string())?;
        let describe = |e: reqwest::Error| {
            if e.is_timeout() {
                format!("timed out after {:?}", self.timeout)
            } else {
                e.to_string()
            }
        };
        // 先 HEAD，不支持 HEAD 的端点再退回 GET
        let mut resp = client.head(url).send().await.map_err(describe)?;
        if resp.status() == reqwest::StatusCode::METHOD_NOT_ALLOWED {
            resp = client.get(url).send().await.map_err(describe)?;
        }
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(format!("HTTP {}", resp.status()))
        }
    }
}

/// 在 PATH 中查找可执行文件；含路径分隔符的名字按路径直接检查
pub fn find_on_path(name: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH").unwrap_or_default();
    find_in_paths(name, &paths)
}

/// 在给定的目录列表（PATH 格式）中查找可执行文件
pub fn find_in_paths(name: &str, paths: &OsStr) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    let direct = Path::new(name);
    if direct.components().count() > 1 {
        return is_executable(direct).then(|| direct.to_path_buf());
    }
    for dir in std::env::split_paths(paths) {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Some(candidate);
        }
        #[cfg(windows)]
        {
            for ext in ["exe", "cmd", "bat"] {
                let candidate = dir.join(format!("{}.{}", name, ext));
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
    }
    None
}

fn is_executable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        true
    }
}
