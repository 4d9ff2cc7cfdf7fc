//! Chart Coordinator
//!
//! 入口：加载 .env 与配置、初始化日志、校验配置、探测并启用工具；
//! `--probe` 时打印探测报告后退出，否则逐行读取 stdin 请求并输出 JSON 回复。

use anyhow::Context;
use chart_coordinator::{cli::CliArgs, config::load_config, core::build_runtime, observability};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();

    let cfg = load_config(args.config).context("Failed to load config")?;
    observability::init(&cfg.log.level);

    if let Err(e) = cfg.validate() {
        tracing::error!(error = %e, "invalid configuration");
        eprintln!("{}", e);
        std::process::exit(1);
    }

    let runtime = build_runtime(&cfg)
        .await
        .context("Failed to build runtime")?;
    tracing::info!(
        summary = %runtime.report.summary(),
        active = %runtime.active.names().join(","),
        "tool registry ready"
    );

    if args.probe {
        let report = serde_json::to_string_pretty(&runtime.report).context("serialize report")?;
        println!("{}", report);
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("read stdin")? {
        let request = line.trim();
        if request.is_empty() {
            continue;
        }
        let out = match runtime.coordinator.handle(request).await {
            Ok(reply) => serde_json::to_string(&reply).context("serialize reply")?,
            Err(e) => {
                tracing::warn!(error = %e, "request failed");
                serde_json::json!({ "error": e.to_string() }).to_string()
            }
        };
        println!("{}", out);
    }
    Ok(())
}
