use std::path::Path;
use std::process::ExitCode;

use cellloc_config::{AppConfig, ConfigError};
use cellloc_frontend::cli::Cli;
use clap::Parser;
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let (config, config_error) = load_configuration(cli.config.as_deref());
    init_logging(cli.log_level.as_deref(), &config);
    if let Some(err) = config_error {
        report_config_error(&err);
    }

    match cellloc_frontend::run_command(&cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "命令执行失败");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// 日志初始化之前加载配置，错误留到订阅器就绪后再报告。
fn load_configuration(explicit: Option<&Path>) -> (AppConfig, Option<ConfigError>) {
    match AppConfig::load(explicit) {
        Ok(cfg) => (cfg, None),
        Err(err) => (AppConfig::default(), Some(err)),
    }
}

fn report_config_error(err: &ConfigError) {
    match err {
        ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
            warn!(path = %path.display(), error = %err, "加载配置失败，使用内建默认值");
        }
        ConfigError::Context { .. } => {
            warn!(error = %err, "加载配置失败，使用内建默认值");
        }
    }
}

fn init_logging(override_level: Option<&str>, config: &AppConfig) {
    let level = override_level.unwrap_or(&config.logging.level);
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
