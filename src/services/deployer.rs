//! 部署编排
//!
//! 组合源码同步与容器生命周期，生成统一的 `DeploymentOutcome`

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::DeploySettings;
use crate::domain::credentials::Credentials;
use crate::domain::deploy::{DeploymentOutcome, FailureKind};
use crate::infra::command::{CommandError, ProcessRunner};

use super::lifecycle::WorkloadLifecycle;
use super::status::{self, StatusError};
use super::sync::{SourceSync, SyncContext};

/// 部署编排器
///
/// 不加锁、不排队：并发触发会各自执行
pub struct Deployer {
    runner: Arc<dyn ProcessRunner>,
    settings: DeploySettings,
    credentials: Option<Credentials>,
    sync_engine: SourceSync,
}

impl Deployer {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        settings: DeploySettings,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            runner,
            settings,
            credentials,
            sync_engine: SourceSync::default(),
        }
    }

    /// 替换同步引擎（自定义回退规则）
    pub fn with_sync_engine(mut self, sync_engine: SourceSync) -> Self {
        self.sync_engine = sync_engine;
        self
    }

    /// 使用配置的工作目录、服务和凭据部署
    pub async fn deploy(&self) -> Result<DeploymentOutcome, CommandError> {
        self.deploy_in(
            &self.settings.work_dir,
            &self.settings.services,
            self.credentials.as_ref(),
        )
        .await
    }

    /// 同步源码，然后无条件重启服务
    ///
    /// 同步失败不会阻止重启；结果只由 `compose up` 决定
    pub async fn deploy_in(
        &self,
        work_dir: &Path,
        services: &[String],
        credentials: Option<&Credentials>,
    ) -> Result<DeploymentOutcome, CommandError> {
        info!(work_dir = %work_dir.display(), "Starting deployment");

        let cx = SyncContext {
            runner: self.runner.as_ref(),
            work_dir,
            remote: &self.settings.git_remote,
            known_hosts: &self.settings.known_hosts,
            credentials,
            timeout: self.settings.sync_timeout,
        };
        let sync = self.sync_engine.sync(&cx).await;
        if !sync.succeeded {
            warn!(
                attempts = sync.attempts.len(),
                "Source sync failed, deploying the current working tree"
            );
        }

        let lifecycle = self
            .lifecycle()
            .restart(work_dir, services, self.settings.build_timeout)
            .await?;

        let outcome = DeploymentOutcome::new(Some(sync), lifecycle);
        info!(
            succeeded = outcome.overall_succeeded,
            sync_succeeded = outcome.sync.as_ref().map(|s| s.succeeded).unwrap_or(false),
            "Deployment finished"
        );
        Ok(outcome)
    }

    pub async fn teardown(&self) -> Result<DeploymentOutcome, CommandError> {
        self.teardown_in(&self.settings.work_dir, &self.settings.services)
            .await
    }

    /// 停止并移除服务，不做同步
    pub async fn teardown_in(
        &self,
        work_dir: &Path,
        services: &[String],
    ) -> Result<DeploymentOutcome, CommandError> {
        let lifecycle = self.lifecycle().teardown(work_dir, services).await?;
        let outcome = DeploymentOutcome::new(None, lifecycle);
        info!(succeeded = outcome.overall_succeeded, "Teardown finished");
        Ok(outcome)
    }

    /// 查询配置服务的容器状态
    pub async fn status(&self) -> Result<String, StatusError> {
        status::query(
            self.runner.as_ref(),
            &self.settings.work_dir,
            &self.settings.services,
            self.settings.status_timeout,
        )
        .await
    }

    fn lifecycle(&self) -> WorkloadLifecycle<'_> {
        WorkloadLifecycle {
            runner: self.runner.as_ref(),
            compose_command: &self.settings.compose_command,
            teardown_timeout: self.settings.teardown_timeout,
        }
    }
}

/// 将编排结果映射为失败分类；成功时返回 None
pub fn classify(result: &Result<DeploymentOutcome, CommandError>) -> Option<FailureKind> {
    match result {
        Ok(outcome) => outcome.failure_kind(),
        Err(_) => Some(FailureKind::EnvironmentFailure),
    }
}
