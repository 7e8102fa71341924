//! 应用状态

use std::sync::Arc;

use crate::config::EnvConfig;
use crate::infra::{CommandRunner, ProcessRunner};
use crate::services::Deployer;

/// 应用状态
///
/// 启动后只读，所有请求共享
pub struct AppState {
    /// 部署编排器
    pub deployer: Deployer,
}

impl AppState {
    /// 使用真实命令执行器创建状态
    pub fn new(config: &EnvConfig) -> Self {
        Self::with_runner(config, Arc::new(CommandRunner))
    }

    /// 使用指定的命令执行器创建状态
    pub fn with_runner(config: &EnvConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        let deployer = Deployer::new(runner, config.deploy.clone(), config.credentials.clone());
        Self { deployer }
    }
}
