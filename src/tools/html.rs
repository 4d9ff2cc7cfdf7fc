//! 交互式文档后端：把图表代码嵌入自包含 HTML 页面，前端库从 CDN 加载

/// 代码嵌入方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeEmbedding {
    /// 作为 JavaScript 直接嵌入 <script>
    Script,
    /// 作为 JSON 字符串字面量嵌入（DSL / CSV 等非 JS 源码）
    JsonString,
}

/// HTML 模板后端
#[derive(Debug, Clone)]
pub struct HtmlBackend {
    library: String,
    head: String,
    body: String,
    embedding: CodeEmbedding,
}

impl HtmlBackend {
    /// head：<script>/<style> 片段；body：页面主体模板，含 {{code}}、{{width}}、{{height}}、{{title}}
    pub fn new(library: &str, head: &str, body: &str, embedding: CodeEmbedding) -> Self {
        Self {
            library: library.to_string(),
            head: head.to_string(),
            body: body.to_string(),
            embedding,
        }
    }

    pub fn library(&self) -> &str {
        &self.library
    }

    pub fn render(&self, job: &crate::tools::RenderJob) -> Result<Vec<u8>, String> {
        if !job.format.eq_ignore_ascii_case("html") {
            return Err(format!(
                "{} only produces html documents, not '{}'",
                self.library, job.format
            ));
        }
        if job.code.trim().is_empty() {
            return Err("chart code is empty".to_string());
        }
        let code = match self.embedding {
            CodeEmbedding::Script => job.code.replace("</script", "<\\/script"),
            CodeEmbedding::JsonString => serde_json::to_string(&job.code)
                .map_err(|e| e.to_string())?
                .replace("</", "<\\/"),
        };
        let title = escape_html(&job.title);
        let body = self
            .body
            .replace("{{width}}", &job.width.to_string())
            .replace("{{height}}", &job.height.to_string())
            .replace("{{title}}", &title)
            .replace("{{code}}", &code);
        let page = format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
             <title>{}</title>\n{}\n</head>\n<body>\n{}\n</body>\n</html>\n",
            title, self.head, body
        );
        Ok(page.into_bytes())
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
