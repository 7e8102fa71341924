//! Container status query (read-only)

use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::infra::command::{argv, CommandError, ProcessRunner};

/// `docker ps` table columns
const STATUS_FORMAT: &str = "table {{.Names}}\t{{.Status}}\t{{.Ports}}";

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("{0}")]
    Command(#[from] CommandError),

    #[error("docker ps timed out")]
    Timeout,

    #[error("docker ps exited with {exit_code}: {stderr}")]
    Failed { exit_code: i32, stderr: String },
}

/// Returns the raw `docker ps -a` table for the named services.
pub async fn query(
    runner: &dyn ProcessRunner,
    work_dir: &Path,
    services: &[String],
    timeout: Duration,
) -> Result<String, StatusError> {
    let mut command = argv(["docker", "ps", "-a"]);
    for service in services {
        command.push("--filter".to_string());
        command.push(format!("name={}", service));
    }
    command.push("--format".to_string());
    command.push(STATUS_FORMAT.to_string());

    let result = runner.run(&command, work_dir, Some(timeout)).await?;
    if result.timed_out {
        warn!("docker ps timed out after {:?}", timeout);
        return Err(StatusError::Timeout);
    }
    if !result.success() {
        return Err(StatusError::Failed {
            exit_code: result.exit_code,
            stderr: result.stderr.trim().to_string(),
        });
    }

    Ok(result.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::scripted::{fail, ok, spawn_error, timeout, ScriptedRunner};

    const TABLE: &str = "NAMES      STATUS         PORTS\nfrontend   Up 2 minutes   0.0.0.0:80->80/tcp\n";

    #[tokio::test]
    async fn test_query_builds_filters() {
        let runner = ScriptedRunner::new().on("docker ps", ok(TABLE));
        let report = query(
            &runner,
            Path::new("/srv"),
            &argv(["frontend", "app"]),
            Duration::from_secs(30),
        )
        .await
        .unwrap();

        assert_eq!(report, TABLE);
        assert_eq!(
            runner.calls(),
            vec![format!(
                "docker ps -a --filter name=frontend --filter name=app --format {}",
                STATUS_FORMAT
            )]
        );
    }

    #[tokio::test]
    async fn test_query_failures() {
        let services = argv(["app"]);
        let path = Path::new("/srv");
        let limit = Duration::from_secs(30);

        let runner = ScriptedRunner::new().on("docker ps", fail(1, "Cannot connect to the Docker daemon"));
        let err = query(&runner, path, &services, limit).await.unwrap_err();
        assert!(matches!(err, StatusError::Failed { exit_code: 1, .. }));
        assert!(err.to_string().contains("Docker daemon"));

        let runner = ScriptedRunner::new().on("docker ps", timeout());
        let err = query(&runner, path, &services, limit).await.unwrap_err();
        assert!(matches!(err, StatusError::Timeout));

        let runner = ScriptedRunner::new().on("docker ps", spawn_error());
        let err = query(&runner, path, &services, limit).await.unwrap_err();
        assert!(matches!(err, StatusError::Command(CommandError::SpawnFailed(_))));
    }
}
