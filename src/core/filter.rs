//! 过滤引擎
//!
//! 对一侧存储执行 include 并集减 exclude 路径集合的展开,
//! 属性约束(大小、日期、扩展名)在条目产出时逐个求值。
//! 相对时长一律对照规划开始时捕获的 now,保证单次运行内确定。

use futures::StreamExt;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::debug;

use crate::config::{DateBound, FilterSpec, FiltersSpec};
use crate::core::matcher;
use crate::error::PlanError;
use crate::storage::{FileInfo, Storage};

/// 过滤结果的通道缓冲
const FILTER_CHANNEL_CAPACITY: usize = 256;
/// 每侧并发展开的路径根数量上限
const DEFAULT_MAX_CONCURRENT: usize = 8;

/// 拼接路径组件,None 与空串被忽略;全部缺省时返回 None
pub fn assemble_paths(components: &[Option<&str>]) -> Option<String> {
    let parts: Vec<&str> = components
        .iter()
        .flatten()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

// ============ 属性约束 ============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyName {
    Size,
    Created,
    Modified,
}

impl PropertyName {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyName::Size => "size",
            PropertyName::Created => "created",
            PropertyName::Modified => "modified",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Direction {
    GreaterThan,
    LessThan,
}

#[derive(Debug, Clone, Copy)]
pub enum ConstraintValue {
    Number(u64),
    Date(DateBound),
}

/// 一条可求值的属性约束
#[derive(Debug, Clone, Copy)]
pub struct PropertyConstraint {
    pub name: PropertyName,
    pub direction: Direction,
    pub value: ConstraintValue,
}

/// 把过滤规则的字段翻译成约束列表
pub fn constraints_of(spec: &FilterSpec) -> Vec<PropertyConstraint> {
    let mut constraints = Vec::new();
    if let Some(max) = spec.max_size {
        constraints.push(PropertyConstraint {
            name: PropertyName::Size,
            direction: Direction::LessThan,
            value: ConstraintValue::Number(max),
        });
    }
    if let Some(min) = spec.min_size {
        constraints.push(PropertyConstraint {
            name: PropertyName::Size,
            direction: Direction::GreaterThan,
            value: ConstraintValue::Number(min),
        });
    }
    let date_fields = [
        (PropertyName::Created, Direction::GreaterThan, spec.created_after),
        (PropertyName::Created, Direction::LessThan, spec.created_before),
        (PropertyName::Modified, Direction::GreaterThan, spec.modified_after),
        (PropertyName::Modified, Direction::LessThan, spec.modified_before),
    ];
    for (name, direction, bound) in date_fields {
        if let Some(bound) = bound {
            constraints.push(PropertyConstraint {
                name,
                direction,
                value: ConstraintValue::Date(bound),
            });
        }
    }
    constraints
}

/// 求值全部约束(逻辑与)加扩展名白名单
///
/// 约束点名的属性在元数据里缺失时是后端与过滤器不兼容,
/// 以 PropertyUnavailable 上抛而不是静默当真或当假。
pub fn meets_constraints(
    info: &FileInfo,
    constraints: &[PropertyConstraint],
    extensions: Option<&[String]>,
    now: i64,
    storage_name: &str,
) -> Result<bool, PlanError> {
    for constraint in constraints {
        let pass = match constraint.name {
            PropertyName::Size => compare_numerical(info.size, constraint),
            PropertyName::Created => {
                let t = info.created_time.ok_or_else(|| PlanError::PropertyUnavailable {
                    storage: storage_name.to_string(),
                    path: info.path.clone(),
                    property: "created",
                })?;
                compare_datetime(t, constraint, now)
            }
            PropertyName::Modified => {
                let t = info.modified_time.ok_or_else(|| PlanError::PropertyUnavailable {
                    storage: storage_name.to_string(),
                    path: info.path.clone(),
                    property: "modified",
                })?;
                compare_datetime(t, constraint, now)
            }
        };
        if !pass {
            return Ok(false);
        }
    }

    if let Some(exts) = extensions {
        let ext = std::path::Path::new(&info.path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        if !exts.iter().any(|e| e == ext) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn compare_numerical(value: u64, constraint: &PropertyConstraint) -> bool {
    let bound = match constraint.value {
        ConstraintValue::Number(n) => n,
        ConstraintValue::Date(_) => return true,
    };
    match constraint.direction {
        Direction::GreaterThan => value >= bound,
        Direction::LessThan => value <= bound,
    }
}

fn compare_datetime(value: i64, constraint: &PropertyConstraint, now: i64) -> bool {
    let bound = match constraint.value {
        ConstraintValue::Date(d) => d,
        ConstraintValue::Number(_) => return true,
    };
    match (constraint.direction, bound) {
        // 绝对边界做普通比较
        (Direction::GreaterThan, DateBound::Absolute(b)) => value >= b,
        (Direction::LessThan, DateBound::Absolute(b)) => value <= b,
        // 相对时长对照 now:after 表示在最近 d 秒内
        (Direction::GreaterThan, DateBound::Relative(d)) => now - value < d,
        (Direction::LessThan, DateBound::Relative(d)) => now - value > d,
    }
}

// ============ 引擎 ============

/// 一侧存储的过滤引擎
pub struct FilterEngine {
    storage: Arc<dyn Storage>,
    filters: FiltersSpec,
    now: i64,
    max_concurrent: usize,
    cancel: Arc<AtomicBool>,
}

impl FilterEngine {
    pub fn new(storage: Arc<dyn Storage>, filters: FiltersSpec, cancel: Arc<AtomicBool>) -> Self {
        Self {
            storage,
            filters,
            now: chrono::Utc::now().timestamp(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            cancel,
        }
    }

    /// 固定相对时长的求值基准时刻
    pub fn with_now(mut self, now: i64) -> Self {
        self.now = now;
        self
    }

    /// 展开两组过滤器并做路径减法,键按字典序排好
    pub async fn walk(&self) -> Result<BTreeMap<String, FileInfo>, PlanError> {
        let mut included = self.expand(&self.filters.include).await?;
        debug!("{} 命中 include {} 项", self.storage.name(), included.len());

        if let Some(exclude) = &self.filters.exclude {
            // 排除只看路径,不再检查被排除条目的元数据
            let excluded = self.expand(exclude).await?;
            included.retain(|path, _| !excluded.contains_key(path));
            debug!(
                "{} 排除后剩余 {} 项",
                self.storage.name(),
                included.len()
            );
        }
        Ok(included)
    }

    /// 一组过滤规则的并集,按路径去重
    async fn expand(&self, specs: &[FilterSpec]) -> Result<BTreeMap<String, FileInfo>, PlanError> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let (tx, mut rx) =
            mpsc::channel::<Result<FileInfo, PlanError>>(FILTER_CHANNEL_CAPACITY);
        let mut handles = Vec::new();

        for spec in specs {
            let prefix = spec.path_prefix.clone();
            let mut plans = Vec::new();
            for path in &spec.paths {
                let full =
                    assemble_paths(&[prefix.as_deref(), Some(path)]).unwrap_or_default();
                plans.push(matcher::plan_literal(full));
            }
            for pattern in &spec.pattern_paths {
                let full =
                    assemble_paths(&[prefix.as_deref(), Some(pattern)]).unwrap_or_default();
                plans.push(matcher::plan_pattern(&full, spec.max_depth)?);
            }

            let constraints = Arc::new(constraints_of(spec));
            let extensions = Arc::new(spec.extensions.clone());
            for plan in plans {
                let storage = self.storage.clone();
                let constraints = constraints.clone();
                let extensions = extensions.clone();
                let semaphore = semaphore.clone();
                let cancel = self.cancel.clone();
                let tx = tx.clone();
                let now = self.now;
                let max_depth = spec.max_depth;

                handles.push(tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return;
                    };
                    let mut stream =
                        match matcher::expand_plan(storage.clone(), plan, true, max_depth).await {
                            Ok(s) => s,
                            Err(e) => {
                                let _ = tx.send(Err(PlanError::Storage(e))).await;
                                return;
                            }
                        };
                    while let Some(item) = stream.next().await {
                        if cancel.load(Ordering::Relaxed) {
                            let _ = tx.send(Err(PlanError::Cancelled)).await;
                            return;
                        }
                        let info = match item {
                            Ok(info) => info,
                            Err(e) => {
                                let _ = tx.send(Err(PlanError::Storage(e))).await;
                                return;
                            }
                        };
                        match meets_constraints(
                            &info,
                            &constraints,
                            extensions.as_deref(),
                            now,
                            storage.name(),
                        ) {
                            Ok(true) => {
                                if tx.send(Ok(info)).await.is_err() {
                                    return;
                                }
                            }
                            Ok(false) => {}
                            Err(e) => {
                                let _ = tx.send(Err(e)).await;
                                return;
                            }
                        }
                    }
                }));
            }
        }
        drop(tx);

        let mut map = BTreeMap::new();
        let mut first_err: Option<PlanError> = None;
        while let Some(item) = rx.recv().await {
            match item {
                Ok(info) => {
                    map.entry(info.path.clone()).or_insert(info);
                }
                // 记录首个错误,继续排空通道让任务退出
                Err(e) => {
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }
        for handle in handles {
            let _ = handle.await;
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(map),
        }
    }
}
