//! 命令行参数

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "chart-coordinator",
    version,
    about = "Dependency-gated chart rendering tool registry",
    long_about = "Probes the runtime dependencies of every built-in chart renderer, activates the \
                  tools whose dependencies are present, then reads natural-language chart requests \
                  from stdin and prints one JSON reply per line."
)]
pub struct CliArgs {
    #[arg(long, help = "Print the dependency probe report as JSON and exit")]
    pub probe: bool,

    #[arg(long, value_name = "PATH", help = "Extra TOML config file layered over config/default.toml")]
    pub config: Option<PathBuf>,
}
