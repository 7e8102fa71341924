//! 代码仓库凭据

use std::fmt;

/// 用于 HTTPS remote 的仓库凭据
///
/// 启动时从环境变量读取一次，之后只读。`Debug` 输出不包含 token。
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub token: String,
    pub email: Option<String>,
}

impl Credentials {
    /// 用户名或 token 为空时返回 None
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Option<Self> {
        let username = username.into();
        let token = token.into();
        if username.trim().is_empty() || token.trim().is_empty() {
            return None;
        }
        Some(Self {
            username,
            token,
            email: None,
        })
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        let email = email.into();
        self.email = if email.trim().is_empty() { None } else { Some(email) };
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &"***REDACTED***")
            .field("email", &self.email)
            .finish()
    }
}
