//! Personalize - 基于规则的内容个性化引擎
//!
//! 命令行入口：加载配置、初始化日志，然后执行子命令。

use anyhow::Result;
use clap::Parser;
use personalize::cli::{Cli, CommandRunner, Commands};
use personalize::storage::config::ConfigManager;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let manager = ConfigManager::new(cli.config.clone().unwrap_or_else(ConfigManager::default_path));
    let config = manager.load()?;

    // 初始化日志
    // 优先使用环境变量 RUST_LOG，其次命令行参数，最后是配置文件
    let level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Config { action } => CommandRunner::run_config(&manager, action, &mut out),
        command => {
            let mut runner = CommandRunner::from_config(&config)?;
            runner.run(command, &mut out)
        }
    }
}
