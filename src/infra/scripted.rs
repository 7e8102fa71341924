//! 测试用脚本化命令执行器
//!
//! 按命令前缀返回预设结果，并记录所有调用

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::command::{CommandError, ProcessRunner};
use crate::domain::deploy::CommandResult;

#[derive(Clone)]
pub enum Reply {
    Done(CommandResult),
    SpawnError,
}

struct Rule {
    prefix: String,
    replies: VecDeque<Reply>,
}

/// A `ProcessRunner` that never spawns anything.
///
/// Commands are matched by the space-joined argv prefix; the first matching
/// rule answers. Queued replies are consumed in order and the last one
/// repeats. Unmatched commands succeed with empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, prefix: &str, reply: Reply) -> Self {
        {
            let mut rules = self.rules.lock().unwrap();
            match rules.iter_mut().find(|r| r.prefix == prefix) {
                Some(rule) => rule.replies.push_back(reply),
                None => rules.push(Rule {
                    prefix: prefix.to_string(),
                    replies: VecDeque::from([reply]),
                }),
            }
        }
        self
    }

    /// 已执行命令（空格拼接的 argv）
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }
}

pub fn ok(stdout: &str) -> Reply {
    Reply::Done(CommandResult {
        exit_code: 0,
        stdout: stdout.to_string(),
        stderr: String::new(),
        timed_out: false,
    })
}

pub fn fail(exit_code: i32, stderr: &str) -> Reply {
    Reply::Done(CommandResult {
        exit_code,
        stdout: String::new(),
        stderr: stderr.to_string(),
        timed_out: false,
    })
}

pub fn timeout() -> Reply {
    Reply::Done(CommandResult::timed_out())
}

pub fn spawn_error() -> Reply {
    Reply::SpawnError
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(
        &self,
        command: &[String],
        _work_dir: &Path,
        _timeout: Option<Duration>,
    ) -> Result<CommandResult, CommandError> {
        let line = command.join(" ");
        self.calls.lock().unwrap().push(line.clone());

        let reply = {
            let mut rules = self.rules.lock().unwrap();
            rules
                .iter_mut()
                .find(|r| line.starts_with(&r.prefix))
                .and_then(|rule| {
                    if rule.replies.len() > 1 {
                        rule.replies.pop_front()
                    } else {
                        rule.replies.front().cloned()
                    }
                })
        };

        match reply {
            Some(Reply::Done(result)) => Ok(result),
            Some(Reply::SpawnError) => Err(CommandError::SpawnFailed(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No such file or directory",
            ))),
            None => Ok(CommandResult {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
                timed_out: false,
            }),
        }
    }
}
