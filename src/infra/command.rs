//! 命令执行器
//!
//! 提供统一的命令执行接口，支持：
//! - 超时控制（超时后终止子进程）
//! - stdout/stderr 分离
//! - 非零退出码不视为错误，由调用方解释

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::domain::deploy::CommandResult;

/// 命令执行错误
///
/// 只表示环境问题；命令本身的失败体现在 `CommandResult::exit_code` 中
#[derive(Debug)]
pub enum CommandError {
    /// 空命令
    EmptyCommand,
    /// 工作目录不存在
    WorkdirMissing(PathBuf),
    /// 命令启动失败（可执行文件不存在等）
    SpawnFailed(std::io::Error),
    /// 等待命令完成失败
    WaitFailed(std::io::Error),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::EmptyCommand => write!(f, "Empty command"),
            CommandError::WorkdirMissing(dir) => {
                write!(f, "Working directory does not exist: {}", dir.display())
            }
            CommandError::SpawnFailed(e) => write!(f, "Failed to spawn command: {}", e),
            CommandError::WaitFailed(e) => write!(f, "Failed to wait for command: {}", e),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::SpawnFailed(e) | CommandError::WaitFailed(e) => Some(e),
            _ => None,
        }
    }
}

/// 外部命令执行接口
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// 在 `work_dir` 中执行 `command`（argv 形式，第一个元素为程序名）
    ///
    /// 超时返回 `timed_out = true` 的结果而不是错误
    async fn run(
        &self,
        command: &[String],
        work_dir: &Path,
        timeout: Option<Duration>,
    ) -> Result<CommandResult, CommandError>;
}

/// 基于 `tokio::process` 的命令执行器
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandRunner;

#[async_trait]
impl ProcessRunner for CommandRunner {
    async fn run(
        &self,
        command: &[String],
        work_dir: &Path,
        timeout: Option<Duration>,
    ) -> Result<CommandResult, CommandError> {
        let (program, args) = command.split_first().ok_or(CommandError::EmptyCommand)?;

        if !work_dir.is_dir() {
            return Err(CommandError::WorkdirMissing(work_dir.to_path_buf()));
        }

        // argv 可能包含带 token 的 URL，只记录程序名
        debug!(program = %program, work_dir = %work_dir.display(), "Running command");

        let child = Command::new(program)
            .args(args)
            .current_dir(work_dir)
            // git 不得交互式索要凭据
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(CommandError::SpawnFailed)?;

        let output = child.wait_with_output();
        let output = match timeout {
            Some(limit) => match tokio::time::timeout(limit, output).await {
                Ok(output) => output,
                Err(_) => {
                    // future 被丢弃时子进程随之被 kill
                    warn!(program = %program, "Command timed out after {:?}", limit);
                    return Ok(CommandResult::timed_out());
                }
            },
            None => output.await,
        }
        .map_err(CommandError::WaitFailed)?;

        let result = CommandResult::from_output(&output);
        debug!(program = %program, exit_code = result.exit_code, "Command finished");
        Ok(result)
    }
}

/// 将字符串切片转换为 argv
pub fn argv<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}
