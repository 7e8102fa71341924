//! 部署相关领域模型

use serde::Serialize;

/// 单次命令执行结果
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct CommandResult {
    /// 退出码（超时或被信号终止时为 -1）
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// 是否因超时而终止
    pub timed_out: bool,
}

impl CommandResult {
    /// 从 `std::process::Output` 构建
    pub fn from_output(output: &std::process::Output) -> Self {
        Self {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            timed_out: false,
        }
    }

    /// 超时结果
    pub fn timed_out() -> Self {
        Self {
            exit_code: -1,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: true,
        }
    }

    /// Stand-in for a best-effort step whose command never ran.
    pub fn not_run(reason: impl Into<String>) -> Self {
        Self {
            exit_code: -1,
            stdout: String::new(),
            stderr: reason.into(),
            timed_out: false,
        }
    }

    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }

    /// stderr followed by stdout, lowercased, for failure classification
    pub fn failure_text(&self) -> String {
        format!("{}\n{}", self.stderr, self.stdout).to_lowercase()
    }

    /// 替换输出中的敏感字符串
    pub fn scrub(&mut self, secret: &str, replacement: &str) {
        if secret.is_empty() {
            return;
        }
        if self.stdout.contains(secret) {
            self.stdout = self.stdout.replace(secret, replacement);
        }
        if self.stderr.contains(secret) {
            self.stderr = self.stderr.replace(secret, replacement);
        }
    }
}

/// 同步策略（回退链中的每一步）
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncStrategy {
    /// 直接 git pull
    Plain,
    /// 将工作目录加入 safe.directory 后重试
    TrustDirectory,
    /// SSH remote 改写为 HTTPS 后重试
    HttpsRewrite,
    /// 关闭 SSH host key 校验后重试
    SkipHostKeyCheck,
}

impl SyncStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStrategy::Plain => "plain",
            SyncStrategy::TrustDirectory => "trust_directory",
            SyncStrategy::HttpsRewrite => "https_rewrite",
            SyncStrategy::SkipHostKeyCheck => "skip_host_key_check",
        }
    }
}

/// 一次 pull 尝试
#[derive(Clone, Debug, Serialize)]
pub struct SyncAttempt {
    pub strategy: SyncStrategy,
    pub result: CommandResult,
}

/// 源码同步结果
#[derive(Clone, Debug, Default, Serialize)]
pub struct SyncOutcome {
    pub succeeded: bool,
    /// 按尝试顺序排列
    pub attempts: Vec<SyncAttempt>,
    /// 回退链结束后的 remote URL（token 已脱敏）
    pub final_remote_url: Option<String>,
}

impl SyncOutcome {
    pub fn record(&mut self, strategy: SyncStrategy, result: CommandResult) {
        self.succeeded = result.success();
        self.attempts.push(SyncAttempt { strategy, result });
    }

    pub fn last_attempt(&self) -> Option<&SyncAttempt> {
        self.attempts.last()
    }
}

/// 容器生命周期操作结果
#[derive(Clone, Debug, Serialize)]
pub struct LifecycleOutcome {
    pub succeeded: bool,
    /// `compose up --build` 的结果；teardown 时为 None
    pub build_result: Option<CommandResult>,
    /// 依次为 compose down、docker rm -f
    pub teardown_results: Vec<CommandResult>,
}

impl LifecycleOutcome {
    /// The result of the step that decides `succeeded`.
    pub fn significant_result(&self) -> Option<&CommandResult> {
        self.build_result
            .as_ref()
            .or_else(|| self.teardown_results.first())
    }
}

/// 面向边界的失败分类
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 超时，可重新触发
    Transient,
    /// 关键步骤非零退出
    BuildFailure,
    /// 可执行文件或目录缺失
    EnvironmentFailure,
}

/// 完整部署结果
#[derive(Clone, Debug, Serialize)]
pub struct DeploymentOutcome {
    /// teardown 时为 None
    pub sync: Option<SyncOutcome>,
    pub lifecycle: LifecycleOutcome,
    pub overall_succeeded: bool,
}

impl DeploymentOutcome {
    pub fn new(sync: Option<SyncOutcome>, lifecycle: LifecycleOutcome) -> Self {
        let overall_succeeded = lifecycle.succeeded;
        Self {
            sync,
            lifecycle,
            overall_succeeded,
        }
    }

    /// None when the operation succeeded.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        if self.overall_succeeded {
            return None;
        }
        match self.lifecycle.significant_result() {
            Some(result) if result.timed_out => Some(FailureKind::Transient),
            _ => Some(FailureKind::BuildFailure),
        }
    }
}
