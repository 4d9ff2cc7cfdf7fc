//! 渲染产物与调用结果
//!
//! RenderResult 归调用方所有；渲染例程返回字节后不再持有任何引用。
//! 产物只在例程成功、未超时且未超过大小上限时才落盘，失败时不暴露任何部分产物。

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::{ChartError, ErrorClass};

/// 已落盘的产物
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub format: String,
    pub mime_type: String,
    pub size: usize,
}

/// 调用状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStatus {
    Success,
    BadRequest,
    Failure,
}

/// 一次调用的结果：产物 + 状态 + 诊断信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderResult {
    pub request_id: String,
    pub tool: String,
    pub status: RenderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    /// 渲染失败时原样返回的图表代码，便于用户手动渲染
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_code: Option<String>,
}

impl RenderResult {
    pub fn success(request_id: &str, tool: &str, artifact: Artifact) -> Self {
        Self {
            request_id: request_id.to_string(),
            tool: tool.to_string(),
            status: RenderStatus::Success,
            artifact: Some(artifact),
            diagnostic: None,
            fallback_code: None,
        }
    }

    /// 由错误构造失败结果；状态按错误分类区分 BadRequest / Failure
    pub fn from_error(request_id: &str, tool: &str, err: &ChartError) -> Self {
        let status = match err.class() {
            ErrorClass::BadRequest => RenderStatus::BadRequest,
            _ => RenderStatus::Failure,
        };
        Self {
            request_id: request_id.to_string(),
            tool: tool.to_string(),
            status,
            artifact: None,
            diagnostic: Some(err.to_string()),
            fallback_code: None,
        }
    }

    pub fn with_fallback_code(mut self, code: Option<&str>) -> Self {
        self.fallback_code = code.map(String::from);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == RenderStatus::Success
    }
}

/// 按格式返回 MIME 类型
pub fn mime_type(format: &str) -> &'static str {
    match format.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "html" => "text/html",
        "json" => "application/json",
        "dot" => "text/vnd.graphviz",
        "ps" => "application/postscript",
        _ => "application/octet-stream",
    }
}

/// 标题转为安全文件名：空白转 `_`，路径分隔符与 `:` 转 `-`，空标题用 "chart"
pub fn safe_file_stem(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| match c {
            c if c.is_whitespace() => '_',
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c => c,
        })
        .collect();
    let stem = stem.trim_matches('.').to_string();
    if stem.is_empty() {
        "chart".to_string()
    } else {
        stem
    }
}

/// 产物目录：写入 `{stem}_{时间戳}_{短 id}.{ext}`
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn save(
        &self,
        title: &str,
        request_id: &str,
        format: &str,
        bytes: &[u8],
    ) -> Result<Artifact, ChartError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| ChartError::Artifact(format!("create {}: {}", self.root.display(), e)))?;
        let short_id: String = request_id.chars().filter(|c| *c != '-').take(8).collect();
        let file_name = format!(
            "{}_{}_{}.{}",
            safe_file_stem(title),
            chrono::Local::now().format("%Y%m%d%H%M%S"),
            short_id,
            format.to_ascii_lowercase()
        );
        let path = self.root.join(file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ChartError::Artifact(format!("write {}: {}", path.display(), e)))?;
        tracing::info!(path = %path.display(), size = bytes.len(), "artifact saved");
        Ok(Artifact {
            path,
            format: format.to_ascii_lowercase(),
            mime_type: mime_type(format).to_string(),
            size: bytes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_types() {
        assert_eq!(mime_type("PNG"), "image/png");
        assert_eq!(mime_type("dot"), "text/vnd.graphviz");
        assert_eq!(mime_type("html"), "text/html");
        assert_eq!(mime_type("xyz"), "application/octet-stream");
    }

    #[test]
    fn test_safe_file_stem() {
        assert_eq!(safe_file_stem("sales report: Q1"), "sales_report-_Q1");
        assert_eq!(safe_file_stem("../../etc/passwd"), "-..-etc-passwd");
        assert_eq!(safe_file_stem("   "), "chart");
    }

    #[test]
    fn test_bad_request_status_from_error() {
        let r = RenderResult::from_error("id", "x", &ChartError::UnknownTool("x".into()));
        assert_eq!(r.status, RenderStatus::BadRequest);
        assert!(r.artifact.is_none());
        let r = RenderResult::from_error(
            "id",
            "x",
            &ChartError::RenderTimeout { tool: "x".into(), secs: 2.0 },
        );
        assert_eq!(r.status, RenderStatus::Failure);
        assert!(r.diagnostic.unwrap().contains("timeout"));
    }

    #[tokio::test]
    async fn test_store_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("out"));
        let a = store
            .save("my chart", "0f1e2d3c-aaaa-bbbb", "SVG", b"<svg/>")
            .await
            .unwrap();
        assert!(a.path.starts_with(dir.path().join("out")));
        assert_eq!(a.format, "svg");
        assert_eq!(a.mime_type, "image/svg+xml");
        assert_eq!(a.size, 6);
        let name = a.path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("my_chart_"));
        assert!(name.ends_with("_0f1e2d3c.svg"));
        assert_eq!(std::fs::read(&a.path).unwrap(), b"<svg/>");
    }
}
