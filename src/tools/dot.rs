//! DOT 源码预处理与结构校验
//!
//! LLM 生成的 DOT 经常缺少图声明或带上本机没有的字体；渲染前统一补全并清理。

use std::sync::OnceLock;

use regex::Regex;

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*(strict\s+)?(graph|digraph)\b").expect("valid regex"))
}

fn fontname_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)fontname\s*=\s*("[^"]*"|'[^']*'|[A-Za-z0-9_\-]+)"#).expect("valid regex")
    })
}

/// 补全图声明、去掉 fontname 属性并整理残留的逗号
pub fn preprocess(code: &str) -> String {
    let mut code = code.trim().to_string();
    if !header_re().is_match(&code) {
        code = if code.contains("->") {
            format!("digraph G {{\n{}\n}}", code)
        } else {
            format!("graph G {{\n{}\n}}", code)
        };
    }
    let code = fontname_re().replace_all(&code, "");
    code.replace("[,", "[")
        .replace(",,", ",")
        .replace(", ,", ",")
        .replace(",]", "]")
        .replace(", ]", "]")
}

/// 结构校验：以 graph / digraph / strict 开头，且大括号存在并配对
pub fn validate(code: &str) -> Result<(), String> {
    let trimmed = code.trim_start();
    if trimmed.is_empty() {
        return Err("source is empty".to_string());
    }
    let lower = trimmed.to_ascii_lowercase();
    if !(lower.starts_with("digraph") || lower.starts_with("graph") || lower.starts_with("strict")) {
        return Err("source must start with 'digraph', 'graph' or 'strict'".to_string());
    }
    let mut depth: i64 = 0;
    let mut opened = false;
    for c in trimmed.chars() {
        match c {
            '{' => {
                depth += 1;
                opened = true;
            }
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return Err("unbalanced braces".to_string());
                }
            }
            _ => {}
        }
    }
    if !opened {
        return Err("missing braces".to_string());
    }
    if depth != 0 {
        return Err("unbalanced braces".to_string());
    }
    Ok(())
}
