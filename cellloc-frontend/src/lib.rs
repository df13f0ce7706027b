pub mod cli;
pub mod errors;
pub mod loader;

use std::io;

use cellloc_config::AppConfig;
use cli::Command;
use errors::FrontendError;
use tracing::info;

/// 以进程的标准输入输出执行一条子命令。
pub fn run_command(command: &Command, config: &AppConfig) -> Result<(), FrontendError> {
    info!(command = command.name(), "执行命令");
    let stdin = io::stdin().lock();
    let stdout = io::stdout().lock();
    cli::run(command, config, stdin, stdout)
}
