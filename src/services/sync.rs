//! Source sync with a bounded fallback chain
//!
//! A plain `git pull` is tried first. When it fails, the failure text is
//! matched against an ordered list of recovery rules; the first rule that
//! matches prepares the working tree and the pull is retried exactly once.
//! Sync never aborts a deployment: callers inspect `SyncOutcome::succeeded`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};
use url::Url;

use crate::domain::credentials::Credentials;
use crate::domain::deploy::{CommandResult, SyncOutcome, SyncStrategy};
use crate::infra::command::{argv, ProcessRunner};

/// Placeholder written in place of a token.
pub const REDACTED: &str = "***";

/// Tokens shorter than this are only scrubbed in URL userinfo position
const MIN_BARE_SCRUB_LEN: usize = 8;

/// SSH options used when host keys cannot be verified non-interactively
const INSECURE_SSH_COMMAND: &str = "ssh -o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null";

/// Everything a sync run needs, borrowed from the caller.
pub struct SyncContext<'a> {
    pub runner: &'a dyn ProcessRunner,
    pub work_dir: &'a Path,
    /// remote whose URL may be rewritten
    pub remote: &'a str,
    /// hosts eligible for the SSH -> HTTPS rewrite
    pub known_hosts: &'a [String],
    pub credentials: Option<&'a Credentials>,
    /// per git command
    pub timeout: Duration,
}

impl SyncContext<'_> {
    /// Runs a git command; a runner error becomes a failed result.
    async fn git(&self, args: &[&str]) -> CommandResult {
        let mut command = argv(["git"]);
        command.extend(args.iter().map(|a| a.to_string()));

        match self.runner.run(&command, self.work_dir, Some(self.timeout)).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Failed to run git");
                CommandResult::not_run(e.to_string())
            }
        }
    }

    async fn pull(&self) -> CommandResult {
        self.git(&["pull"]).await
    }
}

/// What a recovery rule did before the retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    /// label for the retry attempt
    pub strategy: SyncStrategy,
    /// remote URL after preparation, if it was read
    pub remote_url: Option<String>,
}

/// One entry of the fallback chain: a failure predicate and its recovery.
#[async_trait]
pub trait SyncRecovery: Send + Sync {
    /// `failure` is already lowercased
    fn matches(&self, failure: &str) -> bool;

    /// Prepares the working tree for a single retry. Failures here are
    /// logged, never returned: the retry happens regardless.
    async fn prepare(&self, cx: &SyncContext<'_>) -> Prepared;
}

/// git refuses to operate in a directory owned by another user.
pub struct UntrustedDirectory;

#[async_trait]
impl SyncRecovery for UntrustedDirectory {
    fn matches(&self, failure: &str) -> bool {
        failure.contains("safe.directory") || failure.contains("dubious ownership")
    }

    async fn prepare(&self, cx: &SyncContext<'_>) -> Prepared {
        let work_dir = cx.work_dir.to_string_lossy().into_owned();
        info!(work_dir = %work_dir, "Marking working tree as safe.directory");

        let result = cx
            .git(&["config", "--global", "--add", "safe.directory", work_dir.as_str()])
            .await;
        if !result.success() {
            warn!(exit_code = result.exit_code, stderr = %result.stderr.trim(), "git config safe.directory failed");
        }

        Prepared {
            strategy: SyncStrategy::TrustDirectory,
            remote_url: None,
        }
    }
}

/// SSH host key could not be verified, or the key was rejected.
pub struct HostKeyRejected;

#[async_trait]
impl SyncRecovery for HostKeyRejected {
    fn matches(&self, failure: &str) -> bool {
        failure.contains("host key verification failed")
            || failure.contains("permission denied (publickey")
            || failure.contains("no matching host key")
    }

    async fn prepare(&self, cx: &SyncContext<'_>) -> Prepared {
        let current = cx.git(&["remote", "get-url", cx.remote]).await;
        let current_url = if current.success() {
            Some(current.stdout.trim().to_string()).filter(|u| !u.is_empty())
        } else {
            warn!(remote = cx.remote, stderr = %current.stderr.trim(), "Could not read remote URL");
            None
        };

        // 无凭据时走 core.sshCommand 分支
        let rewritten = match (current_url.as_deref(), cx.credentials) {
            (Some(url), Some(creds)) => rewrite_to_https(url, cx.known_hosts, creds),
            _ => None,
        };

        if let Some(https_url) = rewritten {
            info!(
                remote = cx.remote,
                url = %redact_url(&https_url),
                "Switching remote to HTTPS"
            );
            configure_identity(cx).await;

            let set = cx.git(&["remote", "set-url", cx.remote, https_url.as_str()]).await;
            if set.success() {
                return Prepared {
                    strategy: SyncStrategy::HttpsRewrite,
                    remote_url: Some(https_url),
                };
            }
            warn!(exit_code = set.exit_code, "git remote set-url failed");
            return Prepared {
                strategy: SyncStrategy::HttpsRewrite,
                remote_url: current_url,
            };
        }

        info!(remote = cx.remote, "Disabling SSH host key verification for this repository");
        let result = cx.git(&["config", "core.sshCommand", INSECURE_SSH_COMMAND]).await;
        if !result.success() {
            warn!(exit_code = result.exit_code, stderr = %result.stderr.trim(), "git config core.sshCommand failed");
        }

        Prepared {
            strategy: SyncStrategy::SkipHostKeyCheck,
            remote_url: current_url,
        }
    }
}

/// Sets a local commit identity so merge commits created by the pull succeed.
async fn configure_identity(cx: &SyncContext<'_>) {
    let Some(creds) = cx.credentials else {
        return;
    };
    let Some(email) = creds.email.as_deref() else {
        return;
    };

    for (key, value) in [("user.name", creds.username.as_str()), ("user.email", email)] {
        let result = cx.git(&["config", key, value]).await;
        if !result.success() {
            warn!(key = key, exit_code = result.exit_code, "git config failed");
        }
    }
}

/// Source sync engine.
pub struct SourceSync {
    rules: Vec<Box<dyn SyncRecovery>>,
}

impl Default for SourceSync {
    fn default() -> Self {
        Self {
            rules: vec![Box::new(UntrustedDirectory), Box::new(HostKeyRejected)],
        }
    }
}

impl SourceSync {
    /// An engine with no recovery rules: a failed pull is terminal.
    pub fn without_rules() -> Self {
        Self { rules: Vec::new() }
    }

    /// Appends a rule; earlier rules take priority.
    pub fn with_rule(mut self, rule: impl SyncRecovery + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub async fn sync(&self, cx: &SyncContext<'_>) -> SyncOutcome {
        let mut outcome = SyncOutcome::default();

        let first = cx.pull().await;
        outcome.record(SyncStrategy::Plain, first);
        if outcome.succeeded {
            info!(work_dir = %cx.work_dir.display(), "Source sync succeeded");
            return finish(outcome, cx.credentials);
        }

        let failure = outcome
            .last_attempt()
            .map(|a| a.result.failure_text())
            .unwrap_or_default();

        let Some(rule) = self.rules.iter().find(|rule| rule.matches(&failure)) else {
            warn!(
                work_dir = %cx.work_dir.display(),
                "git pull failed with an unrecoverable error, continuing with current tree"
            );
            return finish(outcome, cx.credentials);
        };

        let prepared = rule.prepare(cx).await;
        outcome.final_remote_url = prepared.remote_url;

        let retry = cx.pull().await;
        outcome.record(prepared.strategy, retry);

        if outcome.succeeded {
            info!(strategy = prepared.strategy.as_str(), "Source sync succeeded after recovery");
        } else {
            warn!(
                strategy = prepared.strategy.as_str(),
                "Source sync failed after recovery, continuing with current tree"
            );
        }

        finish(outcome, cx.credentials)
    }
}

/// Strips the token from every surfaced field.
fn finish(mut outcome: SyncOutcome, credentials: Option<&Credentials>) -> SyncOutcome {
    outcome.final_remote_url = outcome.final_remote_url.as_deref().map(redact_url);

    if let Some(creds) = credentials {
        let mut forms = vec![creds.token.clone()];
        if let Some(encoded) = encoded_password(&creds.token) {
            forms.push(encoded);
        }

        for attempt in &mut outcome.attempts {
            for form in &forms {
                scrub_token(&mut attempt.result, form);
            }
        }
    }

    outcome
}

/// Replaces a token in command output.
///
/// The `:token@` userinfo form is always replaced. A bare occurrence is
/// replaced only for tokens long enough not to collide with ordinary text.
fn scrub_token(result: &mut CommandResult, token: &str) {
    result.scrub(&format!(":{}@", token), &format!(":{}@", REDACTED));
    if token.chars().count() >= MIN_BARE_SCRUB_LEN {
        result.scrub(token, REDACTED);
    }
}

/// Percent-encoded form of a token as it appears inside a URL.
fn encoded_password(token: &str) -> Option<String> {
    let mut url = Url::parse("https://host").ok()?;
    url.set_password(Some(token)).ok()?;
    url.password()
        .filter(|encoded| *encoded != token)
        .map(str::to_string)
}

/// Rewrites a key-based remote on a known host to an authenticated HTTPS URL.
///
/// Accepts scp-like (`git@github.com:owner/repo.git`) and `ssh://` URLs.
/// Returns `None` for any other scheme or an unknown host.
pub fn rewrite_to_https(
    remote: &str,
    known_hosts: &[String],
    credentials: &Credentials,
) -> Option<String> {
    let (host, path) = split_ssh_remote(remote)?;

    if !known_hosts.iter().any(|known| known.eq_ignore_ascii_case(&host)) {
        return None;
    }

    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return None;
    }

    let mut url = Url::parse(&format!("https://{}/{}", host, path)).ok()?;
    url.set_username(&credentials.username).ok()?;
    url.set_password(Some(&credentials.token)).ok()?;
    Some(url.to_string())
}

fn split_ssh_remote(remote: &str) -> Option<(String, String)> {
    let remote = remote.trim();

    if remote.contains("://") {
        let url = Url::parse(remote).ok()?;
        if !matches!(url.scheme(), "ssh" | "git+ssh" | "ssh+git") {
            return None;
        }
        let host = url.host_str()?.to_lowercase();
        return Some((host, url.path().to_string()));
    }

    // scp-like syntax: [user@]host:path
    let (authority, path) = remote.split_once(':')?;
    if authority.contains('/') || path.starts_with("//") {
        return None;
    }
    let host = authority.rsplit('@').next()?.to_lowercase();
    if host.is_empty() {
        return None;
    }
    Some((host, path.to_string()))
}

/// Replaces the password component of a URL, if any.
pub fn redact_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            if url.set_password(Some(REDACTED)).is_ok() {
                url.to_string()
            } else {
                raw.to_string()
            }
        }
        _ => raw.to_string(),
    }
}
