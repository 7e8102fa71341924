//! 基础设施模块
//!
//! 封装外部依赖（命令执行）

pub mod command;
#[cfg(test)]
pub mod scripted;

pub use command::{CommandError, CommandRunner, ProcessRunner};
