//! Docker Compose workload lifecycle
//!
//! Stops and removes the named services, then rebuilds and starts them.
//! Teardown steps are best-effort; only the significant step of each
//! operation decides success.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::domain::deploy::{CommandResult, LifecycleOutcome};
use crate::infra::command::{argv, CommandError, ProcessRunner};

/// Workload lifecycle manager
pub struct WorkloadLifecycle<'a> {
    pub runner: &'a dyn ProcessRunner,
    /// e.g. `["docker", "compose"]`
    pub compose_command: &'a [String],
    /// bound for `compose down` and `docker rm -f`
    pub teardown_timeout: Duration,
}

impl WorkloadLifecycle<'_> {
    /// Tear down, force-remove, then `compose up -d --build`.
    ///
    /// `teardown_results` always holds the stop and force-remove results.
    /// Only a runner error on the build step is returned as `Err`.
    pub async fn restart(
        &self,
        work_dir: &Path,
        services: &[String],
        build_timeout: Duration,
    ) -> Result<LifecycleOutcome, CommandError> {
        info!(work_dir = %work_dir.display(), services = ?services, "Restarting workload");

        let stop = match self.compose_down(work_dir).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "compose down could not run, continuing");
                CommandResult::not_run(e.to_string())
            }
        };
        let remove = self.force_remove(work_dir, services).await;

        let started = Instant::now();
        let mut command = self.compose(["up", "-d", "--build"]);
        command.extend(services.iter().cloned());

        let build = self
            .runner
            .run(&command, work_dir, Some(build_timeout))
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to run compose up");
                e
            })?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if build.success() {
            info!(elapsed_ms, "compose up finished");
        } else if build.timed_out {
            error!(elapsed_ms, "compose up timed out after {:?}", build_timeout);
        } else {
            error!(exit_code = build.exit_code, elapsed_ms, stderr = %build.stderr.trim(), "compose up failed");
        }

        Ok(LifecycleOutcome {
            succeeded: build.success(),
            build_result: Some(build),
            teardown_results: vec![stop, remove],
        })
    }

    /// `compose down` then force-remove; success is decided by `compose down`.
    pub async fn teardown(
        &self,
        work_dir: &Path,
        services: &[String],
    ) -> Result<LifecycleOutcome, CommandError> {
        info!(work_dir = %work_dir.display(), services = ?services, "Tearing down workload");

        let stop = self.compose_down(work_dir).await.map_err(|e| {
            error!(error = %e, "Failed to run compose down");
            e
        })?;
        if !stop.success() {
            warn!(exit_code = stop.exit_code, timed_out = stop.timed_out, "compose down failed");
        }
        let remove = self.force_remove(work_dir, services).await;

        Ok(LifecycleOutcome {
            succeeded: stop.success(),
            build_result: None,
            teardown_results: vec![stop, remove],
        })
    }

    async fn compose_down(&self, work_dir: &Path) -> Result<CommandResult, CommandError> {
        let command = self.compose(["down", "--remove-orphans"]);
        self.runner
            .run(&command, work_dir, Some(self.teardown_timeout))
            .await
    }

    /// Removes containers by name even when compose no longer tracks them.
    /// Never fails.
    async fn force_remove(&self, work_dir: &Path, services: &[String]) -> CommandResult {
        if services.is_empty() {
            return CommandResult::not_run("no services configured");
        }

        let mut command = argv(["docker", "rm", "-f"]);
        command.extend(services.iter().cloned());

        match self
            .runner
            .run(&command, work_dir, Some(self.teardown_timeout))
            .await
        {
            Ok(result) => {
                // "No such container" is the common case here
                if !result.success() {
                    info!(exit_code = result.exit_code, "docker rm -f reported errors");
                }
                result
            }
            Err(e) => {
                warn!(error = %e, "docker rm -f could not run, continuing");
                CommandResult::not_run(e.to_string())
            }
        }
    }

    fn compose<const N: usize>(&self, args: [&str; N]) -> Vec<String> {
        let mut command = self.compose_command.to_vec();
        command.extend(args.iter().map(|a| a.to_string()));
        command
    }
}
