//! 同步规划器
//!
//! 驱动一个任务的完整规划:能力预检,左右两侧并发展开过滤器,
//! 按相对路径做字典序连接,逐路径交给比较引擎裁定,产出决策流
//! 与运行报告。全程只读,取消随时生效且不会留下半成品状态。

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::SyncJobConfig;
use crate::core::comparator::{ComparisonEngine, Decision, Verdict};
use crate::core::filter::FilterEngine;
use crate::db::{CacheRecord, CacheStore};
use crate::error::PlanError;
use crate::storage::{FileInfo, Storage};

/// 运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Completed,
    Cancelled,
    Failed,
}

/// 运行统计
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanSummary {
    pub files_left: u64,
    pub files_right: u64,
    pub decisions: u64,
    /// 每种动作的决策数
    pub actions: BTreeMap<String, u64>,
    pub ambiguous_warnings: u64,
    pub invariant_violations: u64,
}

/// 一次规划的完整产出
#[derive(Debug, Serialize)]
pub struct SyncPlan {
    pub run_id: Uuid,
    pub job: String,
    pub status: PlanStatus,
    pub started_at: i64,
    pub finished_at: i64,
    /// 按路径字典序
    pub decisions: Vec<Decision>,
    pub summary: PlanSummary,
}

/// 同步规划器
pub struct SyncPlanner {
    job: SyncJobConfig,
    left: Arc<dyn Storage>,
    right: Arc<dyn Storage>,
    cache: Option<CacheStore>,
    cancelled: Arc<AtomicBool>,
}

impl SyncPlanner {
    pub fn new(
        job: SyncJobConfig,
        left: Arc<dyn Storage>,
        right: Arc<dyn Storage>,
        cache: Option<CacheStore>,
    ) -> Self {
        Self {
            job,
            left,
            right,
            cache,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 协作式取消:走到下一个检查点即停止
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// 能力预检:过滤/比较所需而后端给不出的属性在开工前拒绝
    fn preflight(&self) -> Result<(), PlanError> {
        let sides = [("left", &self.left), ("right", &self.right)];
        let needs_mtime = matches!(
            self.job.comparison,
            crate::config::ComparisonConfig::DatetimeSize(_)
        ) || self.job.filters.uses_modified();

        for (side, storage) in &sides {
            let caps = storage.capabilities();
            if needs_mtime && !caps.modified_time {
                return Err(PlanError::config(format!(
                    "任务 '{}':{} 侧后端 {} 不提供修改时间,无法做 datetime 过滤/比较",
                    self.job.name,
                    side,
                    storage.name()
                )));
            }
            if self.job.filters.uses_created() && !caps.created_time {
                return Err(PlanError::config(format!(
                    "任务 '{}':{} 侧后端 {} 不提供创建时间",
                    self.job.name,
                    side,
                    storage.name()
                )));
            }
        }

        if matches!(
            self.job.comparison,
            crate::config::ComparisonConfig::Content(_)
        ) {
            let lk = self.left.capabilities().content_hash;
            let rk = self.right.capabilities().content_hash;
            match (lk, rk) {
                (Some(a), Some(b)) if a == b => {}
                (Some(_), Some(_)) => {
                    return Err(PlanError::config(format!(
                        "任务 '{}':两侧校验和种类不同,无法做内容比较",
                        self.job.name
                    )))
                }
                _ => {
                    return Err(PlanError::config(format!(
                        "任务 '{}':有一侧后端不提供内容校验和",
                        self.job.name
                    )))
                }
            }
        }
        Ok(())
    }

    /// 执行规划
    ///
    /// 决策按路径字典序依次送入可选的 `decision_tx`,同时收集在
    /// 返回的 SyncPlan 里。运行级致命错误以 Err 上抛;取消与冲突
    /// 中止体现在 status 上。
    pub async fn plan(
        &self,
        decision_tx: Option<mpsc::Sender<Decision>>,
    ) -> Result<SyncPlan, PlanError> {
        let run_id = Uuid::new_v4();
        let started_at = chrono::Utc::now().timestamp();
        info!("开始规划任务 '{}' (run {})", self.job.name, run_id);

        self.preflight()?;
        let engine = ComparisonEngine::new(
            &self.job.comparison,
            &self.job.synchronisation.conflict_handling,
        )?;

        let finish = |status: PlanStatus, decisions: Vec<Decision>, summary: PlanSummary| {
            SyncPlan {
                run_id,
                job: self.job.name.clone(),
                status,
                started_at,
                finished_at: chrono::Utc::now().timestamp(),
                decisions,
                summary,
            }
        };

        // 相对时长统一对照本次运行捕获的 now
        let now = started_at;
        let left_engine = FilterEngine::new(
            self.left.clone(),
            self.job.filters.clone(),
            self.cancelled.clone(),
        )
        .with_now(now);
        let right_engine = FilterEngine::new(
            self.right.clone(),
            self.job.filters.clone(),
            self.cancelled.clone(),
        )
        .with_now(now);

        let (left_files, right_files) = tokio::join!(left_engine.walk(), right_engine.walk());
        let (left_files, right_files) = match (left_files, right_files) {
            (Err(PlanError::Cancelled), _) | (_, Err(PlanError::Cancelled)) => {
                warn!("任务 '{}' 在扫描阶段被取消", self.job.name);
                return Ok(finish(PlanStatus::Cancelled, Vec::new(), PlanSummary::default()));
            }
            (Err(e), _) | (_, Err(e)) => return Err(e),
            (Ok(l), Ok(r)) => (l, r),
        };

        let (left_cache, right_cache) = if engine.needs_cache() {
            let store = self.cache.as_ref().ok_or_else(|| {
                PlanError::config(format!("任务 '{}' 启用了缓存但未提供缓存库", self.job.name))
            })?;
            (
                store.get_all(&self.job.left.storage_id).await?,
                store.get_all(&self.job.right.storage_id).await?,
            )
        } else {
            (HashMap::new(), HashMap::new())
        };

        let mut summary = PlanSummary {
            files_left: left_files.len() as u64,
            files_right: right_files.len() as u64,
            ..Default::default()
        };

        // 字典序连接两侧路径
        let mut paths: BTreeSet<&String> = left_files.keys().collect();
        paths.extend(right_files.keys());

        let mut decisions = Vec::new();
        let mut status = PlanStatus::Completed;

        for path in paths {
            if self.cancelled.load(Ordering::Relaxed) {
                warn!("任务 '{}' 在比较阶段被取消", self.job.name);
                status = PlanStatus::Cancelled;
                break;
            }

            let left_obs = self
                .observation(&self.left, left_files.get(path), path, &engine)
                .await?;
            let right_obs = self
                .observation(&self.right, right_files.get(path), path, &engine)
                .await?;

            let verdict = engine.decide(
                path,
                left_obs.as_ref(),
                right_obs.as_ref(),
                left_cache.get(path.as_str()),
                right_cache.get(path.as_str()),
            );
            match verdict {
                Ok(Verdict::Decision(decision)) => {
                    summary.decisions += 1;
                    *summary
                        .actions
                        .entry(decision.action.as_str().to_string())
                        .or_default() += 1;
                    if let Some(tx) = &decision_tx {
                        let _ = tx.send(decision.clone()).await;
                    }
                    decisions.push(decision);
                }
                Ok(Verdict::NoAction) => {}
                Ok(Verdict::AmbiguousEqual) => summary.ambiguous_warnings += 1,
                Err(PlanError::InvariantViolation { path, left, right }) => {
                    // 单路径跳过,运行继续,但必须显著暴露
                    error!(
                        "任务 '{}' 路径 '{}' 的状态组合不满足任何判定规则: \
                         left={:?}, right={:?}。该路径已跳过,这通常意味着逻辑或后端异常,请提交问题报告",
                        self.job.name, path, left, right
                    );
                    summary.invariant_violations += 1;
                }
                Err(PlanError::Conflict { path }) => {
                    error!(
                        "任务 '{}' 路径 '{}' 双方时间戳相同,按配置中止整个任务",
                        self.job.name, path
                    );
                    return Ok(finish(PlanStatus::Failed, decisions, summary));
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "任务 '{}' 规划结束: 状态 {:?},左 {} 项 / 右 {} 项,决策 {} 条,歧义 {},不变式违例 {}",
            self.job.name,
            status,
            summary.files_left,
            summary.files_right,
            summary.decisions,
            summary.ambiguous_warnings,
            summary.invariant_violations
        );
        Ok(finish(status, decisions, summary))
    }

    /// 补全单侧观察值;content 策略下列表没给校验和时现算
    async fn observation(
        &self,
        storage: &Arc<dyn Storage>,
        listed: Option<&FileInfo>,
        path: &str,
        engine: &ComparisonEngine,
    ) -> Result<Option<FileInfo>, PlanError> {
        let Some(info) = listed else {
            return Ok(None);
        };
        let mut info = info.clone();
        if engine.needs_content_hash() && info.checksum.is_none() {
            info.checksum = storage
                .content_hash(path)
                .await
                .map_err(PlanError::Storage)?;
        }
        Ok(Some(info))
    }
}

/// 外部执行器写回缓存快照时使用的构造助手
///
/// 规划本身不写缓存;动作成功执行后应至少调用一次 upsert。
pub fn snapshot_of(storage_id: &str, info: &FileInfo) -> Option<CacheRecord> {
    info.modified_time.map(|mtime| {
        CacheRecord::new(
            storage_id,
            info.path.clone(),
            mtime,
            info.size as i64,
            info.checksum.clone(),
        )
    })
}
