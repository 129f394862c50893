use thiserror::Error;

use crate::core::comparator::SideState;

/// 规划过程中的错误分类
#[derive(Debug, Error)]
pub enum PlanError {
    /// 配置错误,在任何扫描开始前拒绝
    #[error("配置无效: {0}")]
    Config(String),

    /// glob 模式不合法(如 `**` 未独占一个路径段)
    #[error("glob 模式 '{pattern}' 不合法: {reason}")]
    Pattern { pattern: String, reason: String },

    /// 过滤或比较所需的属性在该后端不可用
    #[error("存储 '{storage}' 的 '{path}' 缺少属性 '{property}'")]
    PropertyUnavailable {
        storage: String,
        path: String,
        property: &'static str,
    },

    /// 两侧状态组合不满足任何判定规则,该路径被跳过
    #[error("路径 '{path}' 两侧状态不一致: left={left:?}, right={right:?}")]
    InvariantViolation {
        path: String,
        left: SideState,
        right: SideState,
    },

    /// 双方时间戳相同且冲突策略为中止同步
    #[error("路径 '{path}' 双方时间戳相同,按配置中止同步")]
    Conflict { path: String },

    /// 缓存数据库访问失败
    #[error("缓存数据库错误: {0}")]
    Cache(#[from] sqlx::Error),

    /// 扫描被协作式取消
    #[error("规划已取消")]
    Cancelled,

    /// 后端 IO 错误(NotFound 之外)
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl PlanError {
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }
}
