//! syncplan:双边文件同步的规划引擎
//!
//! 只产出决策,不搬运字节。一次规划分三步:
//! 1. 按过滤配置分别展开左右两侧的候选文件;
//! 2. 结合缓存快照对每个相对路径做状态分类;
//! 3. 按优先级规则裁定结果,映射到配置的动作。

pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod logging;
pub mod storage;

pub use crate::config::{Action, AppConfig, ComparisonConfig, SyncJobConfig};
pub use crate::core::{
    ComparisonEngine, Decision, FilterEngine, Outcome, PlanStatus, SyncPlan, SyncPlanner,
};
pub use crate::db::CacheStore;
pub use crate::error::PlanError;
pub use crate::storage::{create_storage, FileInfo, Storage};
