//! 领域模型模块
//!
//! 纯数据结构，不依赖 axum/tokio

pub mod credentials;
pub mod deploy;

// Re-exports for convenience
pub use credentials::Credentials;
pub use deploy::{
    CommandResult, DeploymentOutcome, FailureKind, LifecycleOutcome, SyncAttempt, SyncOutcome,
    SyncStrategy,
};
