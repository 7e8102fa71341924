//! 环境变量配置加载

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::domain::credentials::Credentials;

/// 环境配置
#[derive(Clone, Debug)]
pub struct EnvConfig {
    /// 监听地址
    pub host: String,
    /// 服务监听端口
    pub port: u16,
    /// 部署相关配置
    pub deploy: DeploySettings,
    /// 仓库凭据（用户名和 token 都存在时才有值）
    pub credentials: Option<Credentials>,
}

/// 部署配置
#[derive(Clone, Debug)]
pub struct DeploySettings {
    /// 挂载的工作目录（包含 docker-compose.yml 的 git 仓库）
    pub work_dir: PathBuf,
    /// 需要管理的服务（容器）名称
    pub services: Vec<String>,
    /// compose 调用方式，如 `docker compose` 或 `docker-compose`
    pub compose_command: Vec<String>,
    /// 同步使用的 git remote
    pub git_remote: String,
    /// 允许将 SSH remote 改写为 HTTPS 的主机
    pub known_hosts: Vec<String>,
    /// `compose up --build` 超时
    pub build_timeout: Duration,
    /// `compose down` 超时
    pub teardown_timeout: Duration,
    /// 单条 git 命令超时
    pub sync_timeout: Duration,
    /// 状态查询超时
    pub status_timeout: Duration,
}

impl Default for DeploySettings {
    fn default() -> Self {
        use constants::*;

        Self {
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            services: parse_list(DEFAULT_SERVICES),
            compose_command: parse_words(DEFAULT_COMPOSE_COMMAND),
            git_remote: DEFAULT_GIT_REMOTE.to_string(),
            known_hosts: parse_list(DEFAULT_KNOWN_HOSTS),
            build_timeout: Duration::from_secs(BUILD_TIMEOUT_SECS),
            teardown_timeout: Duration::from_secs(TEARDOWN_TIMEOUT_SECS),
            sync_timeout: Duration::from_secs(SYNC_TIMEOUT_SECS),
            status_timeout: Duration::from_secs(STATUS_TIMEOUT_SECS),
        }
    }
}

impl EnvConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意 key/value 来源加载配置
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = DeploySettings::default();

        let host = lookup("HOST").unwrap_or_else(|| constants::DEFAULT_HOST.to_string());
        let port = parse_or("PORT", &lookup, constants::DEFAULT_PORT);

        let services = lookup("DEPLOY_SERVICES")
            .map(|v| parse_list(&v))
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.services);

        let compose_command = lookup("COMPOSE_COMMAND")
            .map(|v| parse_words(&v))
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.compose_command);

        let known_hosts = lookup("GIT_KNOWN_HOSTS")
            .map(|v| parse_list(&v))
            .unwrap_or(defaults.known_hosts);

        let deploy = DeploySettings {
            work_dir: lookup("DEPLOY_WORKDIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            services,
            compose_command,
            git_remote: lookup("GIT_REMOTE")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.git_remote),
            known_hosts,
            build_timeout: secs_or("BUILD_TIMEOUT_SECS", &lookup, defaults.build_timeout),
            teardown_timeout: secs_or("TEARDOWN_TIMEOUT_SECS", &lookup, defaults.teardown_timeout),
            sync_timeout: secs_or("SYNC_TIMEOUT_SECS", &lookup, defaults.sync_timeout),
            status_timeout: secs_or("STATUS_TIMEOUT_SECS", &lookup, defaults.status_timeout),
        };

        let credentials = load_credentials(&lookup);

        Self {
            host,
            port,
            deploy,
            credentials,
        }
    }
}

/// 读取仓库凭据，支持 GITHUB_* 旧名称
fn load_credentials<F>(lookup: &F) -> Option<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    let username = load_with_fallback(lookup, "GIT_USERNAME", "GITHUB_USERNAME");
    let token = load_with_fallback(lookup, "GIT_TOKEN", "GITHUB_TOKEN");

    match (username, token) {
        (Some(username), Some(token)) => {
            let email = load_with_fallback(lookup, "GIT_EMAIL", "GITHUB_EMAIL");
            let creds = Credentials::new(username, token)?;
            Some(match email {
                Some(email) => creds.with_email(email),
                None => creds,
            })
        }
        (Some(_), None) | (None, Some(_)) => {
            warn!("Only one of GIT_USERNAME / GIT_TOKEN is set, HTTPS remote fallback will run without credentials");
            None
        }
        (None, None) => None,
    }
}

/// 加载环境变量，支持 fallback
fn load_with_fallback<F>(lookup: &F, primary: &str, fallback: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(primary)
        .filter(|v| !v.is_empty())
        .or_else(|| lookup(fallback).filter(|v| !v.is_empty()))
}

fn parse_or<F, T>(key: &str, lookup: &F, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key = key, value = %raw, "Invalid value, using default");
            default
        }),
        None => default,
    }
}

fn secs_or<F>(key: &str, lookup: &F, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    match parse_or::<F, u64>(key, lookup, 0) {
        0 => default,
        secs => Duration::from_secs(secs),
    }
}

/// 逗号分隔列表，去空去重并保持顺序
pub fn parse_list(raw: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !items.iter().any(|existing| existing == item) {
            items.push(item.to_string());
        }
    }
    items
}

fn parse_words(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

/// 常量
pub mod constants {
    pub const DEFAULT_HOST: &str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 8000;

    /// 宿主机项目目录在容器内的挂载点
    pub const DEFAULT_WORK_DIR: &str = "/app/parent";
    pub const DEFAULT_SERVICES: &str = "frontend,app";
    pub const DEFAULT_COMPOSE_COMMAND: &str = "docker compose";
    pub const DEFAULT_GIT_REMOTE: &str = "origin";
    pub const DEFAULT_KNOWN_HOSTS: &str = "github.com,gitlab.com,bitbucket.org";

    /// 构建并启动超时（秒）
    pub const BUILD_TIMEOUT_SECS: u64 = 300; // 5 分钟
    pub const TEARDOWN_TIMEOUT_SECS: u64 = 60;
    pub const SYNC_TIMEOUT_SECS: u64 = 120;
    pub const STATUS_TIMEOUT_SECS: u64 = 30;

    /// 版本号
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_load_with_fallback() {
        let lookup = lookup_from(&[("TEST_PRIMARY", "primary_value"), ("TEST_FALLBACK", "fallback_value")]);
        assert_eq!(
            load_with_fallback(&lookup, "TEST_PRIMARY", "TEST_FALLBACK"),
            Some("primary_value".to_string())
        );

        let lookup = lookup_from(&[("TEST_PRIMARY", ""), ("TEST_FALLBACK", "fallback_value")]);
        assert_eq!(
            load_with_fallback(&lookup, "TEST_PRIMARY", "TEST_FALLBACK"),
            Some("fallback_value".to_string())
        );

        let lookup = lookup_from(&[]);
        assert_eq!(load_with_fallback(&lookup, "TEST_PRIMARY", "TEST_FALLBACK"), None);
    }

    #[test]
    fn test_defaults() {
        let config = EnvConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.port, 8000);
        assert_eq!(config.deploy.work_dir, PathBuf::from("/app/parent"));
        assert_eq!(config.deploy.services, vec!["frontend", "app"]);
        assert_eq!(config.deploy.compose_command, vec!["docker", "compose"]);
        assert_eq!(config.deploy.build_timeout, Duration::from_secs(300));
        assert_eq!(config.deploy.teardown_timeout, Duration::from_secs(60));
        assert!(config.credentials.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = EnvConfig::from_lookup(lookup_from(&[
            ("PORT", "9000"),
            ("DEPLOY_WORKDIR", "/srv/app"),
            ("DEPLOY_SERVICES", "web, worker,web"),
            ("COMPOSE_COMMAND", "docker-compose"),
            ("BUILD_TIMEOUT_SECS", "600"),
            ("SYNC_TIMEOUT_SECS", "not-a-number"),
        ]));
        assert_eq!(config.port, 9000);
        assert_eq!(config.deploy.work_dir, PathBuf::from("/srv/app"));
        assert_eq!(config.deploy.services, vec!["web", "worker"]);
        assert_eq!(config.deploy.compose_command, vec!["docker-compose"]);
        assert_eq!(config.deploy.build_timeout, Duration::from_secs(600));
        assert_eq!(config.deploy.sync_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_credentials_require_username_and_token() {
        let config = EnvConfig::from_lookup(lookup_from(&[("GIT_USERNAME", "bob")]));
        assert!(config.credentials.is_none());

        let config = EnvConfig::from_lookup(lookup_from(&[
            ("GITHUB_USERNAME", "bob"),
            ("GIT_TOKEN", "tok"),
            ("GIT_EMAIL", "bob@example.com"),
        ]));
        let creds = config.credentials.expect("credentials");
        assert_eq!(creds.username, "bob");
        assert_eq!(creds.token, "tok");
        assert_eq!(creds.email.as_deref(), Some("bob@example.com"));
    }
}
