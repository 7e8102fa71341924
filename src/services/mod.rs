//! 业务服务模块
//!
//! 源码同步、容器生命周期、部署编排与状态查询

pub mod deployer;
pub mod lifecycle;
pub mod status;
pub mod sync;

pub use deployer::Deployer;
pub use lifecycle::WorkloadLifecycle;
pub use sync::{SourceSync, SyncContext, SyncRecovery};
