//! 命令行集成测试：stdout 只输出 JSON，日志走 stderr

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::Path;
    use std::process::{Command, Stdio};

    use chart_coordinator::tools::{ActivationReport, BUILTIN_TOOL_NAMES};
    use chart_coordinator::CoordinatorReply;

    fn coordinator(workdir: &Path) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_chart-coordinator"));
        cmd.current_dir(workdir)
            .env_remove("RUST_LOG")
            .env("LOG_LEVEL", "info")
            .env("OUTPUT_DIR", workdir.join("out"))
            .env("CHART__LLM__PROVIDER", "mock")
            .env("CHART__PROBE__CHECK_NETWORK", "false")
            .env("CHART__PROBE__TIMEOUT_SECS", "1");
        cmd
    }

    #[test]
    fn test_activation_report_is_clean_json() {
        let dir = tempfile::tempdir().unwrap();
        let out = coordinator(dir.path()).arg("--probe").output().unwrap();
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

        let report: ActivationReport = serde_json::from_slice(&out.stdout)
            .unwrap_or_else(|e| panic!("stdout is not JSON ({e}): {}", String::from_utf8_lossy(&out.stdout)));
        assert_eq!(report.results.len(), BUILTIN_TOOL_NAMES.len());

        let stderr = String::from_utf8_lossy(&out.stderr);
        assert!(stderr.contains("tool registry ready"), "{stderr}");
    }

    #[test]
    fn test_request_loop_prints_one_json_reply_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut child = coordinator(dir.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        {
            let mut stdin = child.stdin.take().unwrap();
            stdin.write_all(b"draw a chart\n\nanother one\n").unwrap();
        }
        let out = child.wait_with_output().unwrap();
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

        let stdout = String::from_utf8(out.stdout).unwrap();
        let lines: Vec<&str> = stdout.lines().collect();
        assert_eq!(lines.len(), 2, "{stdout}");
        for line in lines {
            let reply: CoordinatorReply = serde_json::from_str(line).unwrap();
            assert!(reply.reply.is_some());
            assert!(reply.results.is_empty());
        }
    }

    #[test]
    fn test_unknown_argument_fails() {
        let dir = tempfile::tempdir().unwrap();
        let out = coordinator(dir.path()).arg("--bogus").output().unwrap();
        assert!(!out.status.success());
        assert!(out.stdout.is_empty());
    }
}
