//! 比较引擎
//!
//! 缓存启用时先独立判定每侧相对缓存快照的状态,再按固定优先级
//! 合成一个对账结果;无缓存策略直接对比当前观察值。结果最后经
//! 配置的动作表映射为 (路径, 结果, 动作) 决策。

use serde::Serialize;
use tracing::warn;

use crate::config::{
    parse_tz_shift, Action, CachedActions, ComparisonConfig, ConflictHandling, ConflictKeyword,
    DateTimeSizeComparison, DirectActions, DirectDateTimeActions, SideName,
};
use crate::db::CacheRecord;
use crate::error::PlanError;
use crate::storage::FileInfo;

/// 单侧相对缓存快照的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SideState {
    Created,
    Deleted,
    Updated,
    Untouched,
    NotExisting,
}

/// 单侧判定结果
#[derive(Debug, Clone, Copy)]
pub struct SideClassification {
    pub state: SideState,
    /// 当前文件比缓存记录旧,疑似被旧版本覆盖
    pub rollback_warning: bool,
}

/// 按 (当前观察值, 缓存记录) 判定单侧状态
pub fn classify(
    path: &str,
    side: &str,
    observation: Option<&FileInfo>,
    cache: Option<&CacheRecord>,
) -> Result<SideClassification, PlanError> {
    let plain = |state| SideClassification {
        state,
        rollback_warning: false,
    };
    match (observation, cache) {
        (None, None) => Ok(plain(SideState::NotExisting)),
        (None, Some(_)) => Ok(plain(SideState::Deleted)),
        (Some(_), None) => Ok(plain(SideState::Created)),
        (Some(info), Some(record)) => {
            let mtime = observed_mtime(info, path, side)?;
            if mtime > record.modified_time {
                Ok(plain(SideState::Updated))
            } else if mtime == record.modified_time {
                Ok(plain(SideState::Untouched))
            } else {
                warn!(
                    "{} 侧 '{}' 比缓存记录更旧(文件 {} < 缓存 {}),可能被旧版本覆盖",
                    side, path, mtime, record.modified_time
                );
                Ok(SideClassification {
                    state: SideState::Updated,
                    rollback_warning: true,
                })
            }
        }
    }
}

fn observed_mtime(info: &FileInfo, path: &str, side: &str) -> Result<i64, PlanError> {
    info.modified_time
        .ok_or_else(|| PlanError::PropertyUnavailable {
            storage: side.to_string(),
            path: path.to_string(),
            property: "modified",
        })
}

/// 对账结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    CreatedLeft,
    CreatedRight,
    MoreRecentLeft,
    MoreRecentRight,
    RemovedLeft,
    RemovedRight,
    OnlyExistLeft,
    OnlyExistRight,
    FileIsDifferent,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::CreatedLeft => "created_left",
            Outcome::CreatedRight => "created_right",
            Outcome::MoreRecentLeft => "more_recent_left",
            Outcome::MoreRecentRight => "more_recent_right",
            Outcome::RemovedLeft => "removed_left",
            Outcome::RemovedRight => "removed_right",
            Outcome::OnlyExistLeft => "only_exist_left",
            Outcome::OnlyExistRight => "only_exist_right",
            Outcome::FileIsDifferent => "file_is_different",
        }
    }
}

/// 一条最终决策
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub path: String,
    pub outcome: Outcome,
    pub action: Action,
}

/// 单个路径比较的裁定
#[derive(Debug)]
pub enum Verdict {
    Decision(Decision),
    /// 无需动作(含双侧 UNTOUCHED、无缓存下完全一致)
    NoAction,
    /// 双方时间戳相同的歧义,已告警,不查动作表
    AmbiguousEqual,
}

enum Strategy {
    Cached(CachedActions),
    DirectDateTime(DirectDateTimeActions),
    Content(DirectActions),
    Size(DirectActions),
}

/// 比较引擎,持有策略、时区补偿与冲突策略
pub struct ComparisonEngine {
    strategy: Strategy,
    /// 比较前加在右侧观察时间上的秒数
    tz_shift: i64,
    conflict: ConflictHandling,
}

impl ComparisonEngine {
    pub fn new(
        comparison: &ComparisonConfig,
        conflict: &ConflictHandling,
    ) -> Result<Self, PlanError> {
        let (strategy, tz_shift) = match comparison {
            ComparisonConfig::Content(c) => (Strategy::Content(c.actions.clone()), 0),
            ComparisonConfig::Size(c) => (Strategy::Size(c.actions.clone()), 0),
            ComparisonConfig::DatetimeSize(dt) => {
                let shift = parse_tz_shift(dt.time_zone_shift()).map_err(PlanError::Config)?;
                let strategy = match dt {
                    DateTimeSizeComparison::Enabled { actions, .. } => {
                        Strategy::Cached(actions.clone())
                    }
                    DateTimeSizeComparison::Disabled { actions, .. } => {
                        Strategy::DirectDateTime(actions.clone())
                    }
                };
                (strategy, shift)
            }
        };
        Ok(Self {
            strategy,
            tz_shift,
            conflict: conflict.clone(),
        })
    }

    /// 是否需要缓存快照
    pub fn needs_cache(&self) -> bool {
        matches!(self.strategy, Strategy::Cached(_))
    }

    /// 是否需要内容校验和
    pub fn needs_content_hash(&self) -> bool {
        matches!(self.strategy, Strategy::Content(_))
    }

    /// 对一个路径做完整裁定
    pub fn decide(
        &self,
        path: &str,
        left: Option<&FileInfo>,
        right: Option<&FileInfo>,
        left_cache: Option<&CacheRecord>,
        right_cache: Option<&CacheRecord>,
    ) -> Result<Verdict, PlanError> {
        match &self.strategy {
            Strategy::Cached(_) => self.decide_cached(path, left, right, left_cache, right_cache),
            Strategy::DirectDateTime(_) => self.decide_direct_datetime(path, left, right),
            Strategy::Content(_) => {
                self.decide_direct(path, left, right, |l, r| match (&l.checksum, &r.checksum) {
                    (Some(a), Some(b)) => Ok(a != b),
                    (None, _) => Err(PlanError::PropertyUnavailable {
                        storage: "left".to_string(),
                        path: path.to_string(),
                        property: "content_hash",
                    }),
                    (_, None) => Err(PlanError::PropertyUnavailable {
                        storage: "right".to_string(),
                        path: path.to_string(),
                        property: "content_hash",
                    }),
                })
            }
            Strategy::Size(_) => self.decide_direct(path, left, right, |l, r| Ok(l.size != r.size)),
        }
    }

    /// 缓存启用的 datetime_size 策略,按优先级逐条匹配
    fn decide_cached(
        &self,
        path: &str,
        left: Option<&FileInfo>,
        right: Option<&FileInfo>,
        left_cache: Option<&CacheRecord>,
        right_cache: Option<&CacheRecord>,
    ) -> Result<Verdict, PlanError> {
        let left_class = classify(path, "left", left, left_cache)?;
        let right_class = classify(path, "right", right, right_cache)?;

        use SideState::*;
        let fixed = match (left_class.state, right_class.state) {
            (Created, NotExisting) => Some(Outcome::CreatedLeft),
            (NotExisting, Created) => Some(Outcome::CreatedRight),
            (Deleted, Untouched) => Some(Outcome::RemovedLeft),
            (Untouched, Deleted) => Some(Outcome::RemovedRight),
            (Untouched, Untouched) => return Ok(Verdict::NoAction),
            _ => None,
        };
        if let Some(outcome) = fixed {
            return self.decision(path, outcome);
        }

        // 兜不住的组合里,双方都有当前观察值时直接比较修改时间
        if let (Some(l), Some(r)) = (left, right) {
            let lm = observed_mtime(l, path, "left")?;
            let rm = observed_mtime(r, path, "right")? + self.tz_shift;
            return match lm.cmp(&rm) {
                std::cmp::Ordering::Greater => self.decision(path, Outcome::MoreRecentLeft),
                std::cmp::Ordering::Less => self.decision(path, Outcome::MoreRecentRight),
                std::cmp::Ordering::Equal => self.ambiguous_equal(path),
            };
        }

        // 剩余组合违反状态机不变式,上抛由调用方记录并跳过该路径
        Err(PlanError::InvariantViolation {
            path: path.to_string(),
            left: left_class.state,
            right: right_class.state,
        })
    }

    /// 无缓存的 datetime_size 策略
    fn decide_direct_datetime(
        &self,
        path: &str,
        left: Option<&FileInfo>,
        right: Option<&FileInfo>,
    ) -> Result<Verdict, PlanError> {
        match (left, right) {
            (None, None) => Ok(Verdict::NoAction),
            (Some(_), None) => self.decision(path, Outcome::OnlyExistLeft),
            (None, Some(_)) => self.decision(path, Outcome::OnlyExistRight),
            (Some(l), Some(r)) => {
                let lm = observed_mtime(l, path, "left")?;
                let rm = observed_mtime(r, path, "right")? + self.tz_shift;
                match lm.cmp(&rm) {
                    std::cmp::Ordering::Greater => self.decision(path, Outcome::MoreRecentLeft),
                    std::cmp::Ordering::Less => self.decision(path, Outcome::MoreRecentRight),
                    std::cmp::Ordering::Equal => Ok(Verdict::NoAction),
                }
            }
        }
    }

    /// content / size 策略,差异判定由闭包给出
    fn decide_direct<F>(
        &self,
        path: &str,
        left: Option<&FileInfo>,
        right: Option<&FileInfo>,
        differs: F,
    ) -> Result<Verdict, PlanError>
    where
        F: Fn(&FileInfo, &FileInfo) -> Result<bool, PlanError>,
    {
        match (left, right) {
            (None, None) => Ok(Verdict::NoAction),
            (Some(_), None) => self.decision(path, Outcome::OnlyExistLeft),
            (None, Some(_)) => self.decision(path, Outcome::OnlyExistRight),
            (Some(l), Some(r)) => {
                if differs(l, r)? {
                    self.decision(path, Outcome::FileIsDifferent)
                } else {
                    Ok(Verdict::NoAction)
                }
            }
        }
    }

    /// 双方时间戳完全相同:按冲突策略处理
    fn ambiguous_equal(&self, path: &str) -> Result<Verdict, PlanError> {
        match &self.conflict {
            ConflictHandling::Named(ConflictKeyword::Warn) => {
                warn!(
                    "'{}' 两侧都有改动但时间戳完全相同,无法推断方向,跳过",
                    path
                );
                Ok(Verdict::AmbiguousEqual)
            }
            ConflictHandling::Named(ConflictKeyword::CancelSynchronisation) => {
                Err(PlanError::Conflict {
                    path: path.to_string(),
                })
            }
            ConflictHandling::Force { force } => {
                let outcome = match force.truth {
                    SideName::Left => Outcome::MoreRecentLeft,
                    SideName::Right => Outcome::MoreRecentRight,
                };
                self.decision(path, outcome)
            }
            // validate 已拒绝,只为穷尽匹配
            ConflictHandling::Versioned { .. } => {
                Err(PlanError::config("versioned 冲突处理不受规划器支持"))
            }
        }
    }

    fn decision(&self, path: &str, outcome: Outcome) -> Result<Verdict, PlanError> {
        let action = self.action_for(outcome).ok_or_else(|| {
            PlanError::config(format!("动作表缺少结果 '{}' 对应的键", outcome.as_str()))
        })?;
        Ok(Verdict::Decision(Decision {
            path: path.to_string(),
            outcome,
            action,
        }))
    }

    fn action_for(&self, outcome: Outcome) -> Option<Action> {
        match (&self.strategy, outcome) {
            (Strategy::Cached(a), Outcome::CreatedLeft) => Some(a.created_left),
            (Strategy::Cached(a), Outcome::CreatedRight) => Some(a.created_right),
            (Strategy::Cached(a), Outcome::MoreRecentLeft) => Some(a.more_recent_left),
            (Strategy::Cached(a), Outcome::MoreRecentRight) => Some(a.more_recent_right),
            (Strategy::Cached(a), Outcome::RemovedLeft) => Some(a.removed_left),
            (Strategy::Cached(a), Outcome::RemovedRight) => Some(a.removed_right),
            (Strategy::DirectDateTime(a), Outcome::OnlyExistLeft) => Some(a.only_exist_left),
            (Strategy::DirectDateTime(a), Outcome::OnlyExistRight) => Some(a.only_exist_right),
            (Strategy::DirectDateTime(a), Outcome::MoreRecentLeft) => Some(a.more_recent_left),
            (Strategy::DirectDateTime(a), Outcome::MoreRecentRight) => Some(a.more_recent_right),
            (Strategy::Content(a) | Strategy::Size(a), Outcome::OnlyExistLeft) => {
                Some(a.only_exist_left)
            }
            (Strategy::Content(a) | Strategy::Size(a), Outcome::OnlyExistRight) => {
                Some(a.only_exist_right)
            }
            (Strategy::Content(a) | Strategy::Size(a), Outcome::FileIsDifferent) => {
                Some(a.file_is_different)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheEngine, DatabaseCacheEngine, EngineOptions, ForceResolve};

    fn obs(mtime: Option<i64>) -> FileInfo {
        FileInfo {
            path: "p.txt".to_string(),
            size: 10,
            modified_time: mtime,
            created_time: None,
            is_dir: false,
            checksum: None,
        }
    }

    fn obs_with(size: u64, checksum: Option<&str>) -> FileInfo {
        FileInfo {
            path: "p.txt".to_string(),
            size,
            modified_time: Some(1000),
            created_time: None,
            is_dir: false,
            checksum: checksum.map(String::from),
        }
    }

    fn record(mtime: i64) -> CacheRecord {
        CacheRecord::new("s", "p.txt", mtime, 10, None)
    }

    fn cached_actions() -> CachedActions {
        CachedActions {
            created_left: Action::CopyToRight,
            created_right: Action::CopyToLeft,
            more_recent_left: Action::UpdateInRight,
            more_recent_right: Action::UpdateInLeft,
            removed_left: Action::RemoveInRight,
            removed_right: Action::RemoveInLeft,
        }
    }

    fn cached_engine(shift: &str, conflict: ConflictHandling) -> ComparisonEngine {
        let config = ComparisonConfig::DatetimeSize(DateTimeSizeComparison::Enabled {
            time_zone_shift: shift.to_string(),
            cache_engine: CacheEngine::Database(DatabaseCacheEngine {
                engine_url: "sqlite::memory:".to_string(),
                engine_options: EngineOptions::default(),
            }),
            actions: cached_actions(),
        });
        ComparisonEngine::new(&config, &conflict).unwrap()
    }

    fn default_cached_engine() -> ComparisonEngine {
        cached_engine("+00:00", ConflictHandling::default())
    }

    #[test]
    fn test_side_classification_table() {
        let check = |o: Option<&FileInfo>, c: Option<&CacheRecord>, expected| {
            let got = classify("p.txt", "left", o, c).unwrap();
            assert_eq!(got.state, expected);
            got
        };
        check(None, None, SideState::NotExisting);
        check(None, Some(&record(1000)), SideState::Deleted);
        check(Some(&obs(Some(1000))), None, SideState::Created);
        // 边界:恰好相等 → UNTOUCHED;晚一秒 → UPDATED 无警告;早一秒 → UPDATED 带警告
        let c = check(Some(&obs(Some(1000))), Some(&record(1000)), SideState::Untouched);
        assert!(!c.rollback_warning);
        let c = check(Some(&obs(Some(1001))), Some(&record(1000)), SideState::Updated);
        assert!(!c.rollback_warning);
        let c = check(Some(&obs(Some(999))), Some(&record(1000)), SideState::Updated);
        assert!(c.rollback_warning);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let o = obs(Some(1234));
        let c = record(1000);
        let a = classify("p.txt", "left", Some(&o), Some(&c)).unwrap();
        let b = classify("p.txt", "left", Some(&o), Some(&c)).unwrap();
        assert_eq!(a.state, b.state);
        assert_eq!(a.rollback_warning, b.rollback_warning);
    }

    #[test]
    fn test_missing_mtime_is_property_unavailable() {
        let o = obs(None);
        let err = classify("p.txt", "right", Some(&o), Some(&record(5))).unwrap_err();
        assert!(matches!(err, PlanError::PropertyUnavailable { .. }));
    }

    #[test]
    fn test_created_left_maps_to_configured_action() {
        let engine = default_cached_engine();
        let left = obs(Some(1000));
        match engine.decide("p.txt", Some(&left), None, None, None).unwrap() {
            Verdict::Decision(d) => {
                assert_eq!(d.outcome, Outcome::CreatedLeft);
                assert_eq!(d.action, Action::CopyToRight);
            }
            other => panic!("意外裁定: {:?}", other),
        }
    }

    #[test]
    fn test_removed_left_from_stale_cache() {
        let engine = default_cached_engine();
        // 左侧缓存尚在但文件消失;右侧保持不变
        let right = obs(Some(1000));
        let verdict = engine
            .decide(
                "p.txt",
                None,
                Some(&right),
                Some(&record(1000)),
                Some(&record(1000)),
            )
            .unwrap();
        match verdict {
            Verdict::Decision(d) => {
                assert_eq!(d.outcome, Outcome::RemovedLeft);
                assert_eq!(d.action, Action::RemoveInRight);
            }
            other => panic!("意外裁定: {:?}", other),
        }
    }

    #[test]
    fn test_untouched_both_sides_is_idempotent() {
        let engine = default_cached_engine();
        let l = obs(Some(1000));
        let r = obs(Some(1000));
        for _ in 0..2 {
            let verdict = engine
                .decide(
                    "p.txt",
                    Some(&l),
                    Some(&r),
                    Some(&record(1000)),
                    Some(&record(1000)),
                )
                .unwrap();
            assert!(matches!(verdict, Verdict::NoAction));
        }
    }

    #[test]
    fn test_both_updated_falls_back_to_mtime() {
        let engine = default_cached_engine();
        let l = obs(Some(2000));
        let r = obs(Some(1500));
        let verdict = engine
            .decide(
                "p.txt",
                Some(&l),
                Some(&r),
                Some(&record(1000)),
                Some(&record(1000)),
            )
            .unwrap();
        match verdict {
            Verdict::Decision(d) => {
                assert_eq!(d.outcome, Outcome::MoreRecentLeft);
                assert_eq!(d.action, Action::UpdateInRight);
            }
            other => panic!("意外裁定: {:?}", other),
        }
    }

    #[test]
    fn test_equal_timestamps_are_ambiguous() {
        let engine = default_cached_engine();
        let l = obs(Some(2000));
        let r = obs(Some(2000));
        let verdict = engine
            .decide(
                "p.txt",
                Some(&l),
                Some(&r),
                Some(&record(1000)),
                Some(&record(1000)),
            )
            .unwrap();
        assert!(matches!(verdict, Verdict::AmbiguousEqual));
    }

    #[test]
    fn test_conflict_cancel_aborts() {
        let engine = cached_engine(
            "+00:00",
            ConflictHandling::Named(ConflictKeyword::CancelSynchronisation),
        );
        let l = obs(Some(2000));
        let r = obs(Some(2000));
        let err = engine
            .decide(
                "p.txt",
                Some(&l),
                Some(&r),
                Some(&record(1000)),
                Some(&record(1000)),
            )
            .unwrap_err();
        assert!(matches!(err, PlanError::Conflict { .. }));
    }

    #[test]
    fn test_conflict_force_picks_truth_side() {
        let engine = cached_engine(
            "+00:00",
            ConflictHandling::Force {
                force: ForceResolve {
                    truth: SideName::Right,
                },
            },
        );
        let l = obs(Some(2000));
        let r = obs(Some(2000));
        match engine
            .decide(
                "p.txt",
                Some(&l),
                Some(&r),
                Some(&record(1000)),
                Some(&record(1000)),
            )
            .unwrap()
        {
            Verdict::Decision(d) => assert_eq!(d.outcome, Outcome::MoreRecentRight),
            other => panic!("意外裁定: {:?}", other),
        }
    }

    #[test]
    fn test_tz_shift_applies_to_right_side() {
        // 右侧钟快一小时:补偿 -01:00 后双方打平 → 歧义
        let engine = cached_engine("-01:00", ConflictHandling::default());
        let l = obs(Some(10_000));
        let r = obs(Some(13_600));
        let verdict = engine
            .decide(
                "p.txt",
                Some(&l),
                Some(&r),
                Some(&record(1000)),
                Some(&record(1000)),
            )
            .unwrap();
        assert!(matches!(verdict, Verdict::AmbiguousEqual));
    }

    #[test]
    fn test_invariant_violation_is_surfaced() {
        let engine = default_cached_engine();
        // 左 DELETED 右 NOT_EXISTING:无规则可判且右侧无观察值
        let err = engine
            .decide("p.txt", None, None, Some(&record(1000)), None)
            .unwrap_err();
        match err {
            PlanError::InvariantViolation { left, right, .. } => {
                assert_eq!(left, SideState::Deleted);
                assert_eq!(right, SideState::NotExisting);
            }
            other => panic!("意外错误: {:?}", other),
        }
    }

    fn direct_actions() -> DirectActions {
        DirectActions {
            only_exist_left: Action::CopyToRight,
            only_exist_right: Action::CopyToLeft,
            file_is_different: Action::UpdateInRight,
        }
    }

    #[test]
    fn test_size_strategy() {
        let config = ComparisonConfig::Size(crate::config::DirectComparison {
            cache: crate::config::CacheMode::Disabled,
            actions: direct_actions(),
        });
        let engine = ComparisonEngine::new(&config, &ConflictHandling::default()).unwrap();

        let l = obs_with(10, None);
        let r = obs_with(20, None);
        match engine.decide("p.txt", Some(&l), Some(&r), None, None).unwrap() {
            Verdict::Decision(d) => assert_eq!(d.outcome, Outcome::FileIsDifferent),
            other => panic!("意外裁定: {:?}", other),
        }

        let r = obs_with(10, None);
        assert!(matches!(
            engine.decide("p.txt", Some(&l), Some(&r), None, None).unwrap(),
            Verdict::NoAction
        ));

        match engine.decide("p.txt", Some(&l), None, None, None).unwrap() {
            Verdict::Decision(d) => {
                assert_eq!(d.outcome, Outcome::OnlyExistLeft);
                assert_eq!(d.action, Action::CopyToRight);
            }
            other => panic!("意外裁定: {:?}", other),
        }
    }

    #[test]
    fn test_content_strategy_requires_hashes() {
        let config = ComparisonConfig::Content(crate::config::DirectComparison {
            cache: crate::config::CacheMode::Disabled,
            actions: direct_actions(),
        });
        let engine = ComparisonEngine::new(&config, &ConflictHandling::default()).unwrap();
        assert!(engine.needs_content_hash());

        let l = obs_with(10, Some("aaa"));
        let r = obs_with(10, Some("bbb"));
        match engine.decide("p.txt", Some(&l), Some(&r), None, None).unwrap() {
            Verdict::Decision(d) => assert_eq!(d.outcome, Outcome::FileIsDifferent),
            other => panic!("意外裁定: {:?}", other),
        }

        let r = obs_with(10, Some("aaa"));
        assert!(matches!(
            engine.decide("p.txt", Some(&l), Some(&r), None, None).unwrap(),
            Verdict::NoAction
        ));

        let r = obs_with(10, None);
        assert!(matches!(
            engine
                .decide("p.txt", Some(&l), Some(&r), None, None)
                .unwrap_err(),
            PlanError::PropertyUnavailable { .. }
        ));
    }

    #[test]
    fn test_direct_datetime_strategy() {
        let config = ComparisonConfig::DatetimeSize(DateTimeSizeComparison::Disabled {
            time_zone_shift: "+00:00".to_string(),
            actions: DirectDateTimeActions {
                only_exist_left: Action::CopyToRight,
                only_exist_right: Action::CopyToLeft,
                more_recent_left: Action::UpdateInRight,
                more_recent_right: Action::UpdateInLeft,
            },
        });
        let engine = ComparisonEngine::new(&config, &ConflictHandling::default()).unwrap();
        assert!(!engine.needs_cache());

        let l = obs(Some(2000));
        let r = obs(Some(1000));
        match engine.decide("p.txt", Some(&l), Some(&r), None, None).unwrap() {
            Verdict::Decision(d) => assert_eq!(d.outcome, Outcome::MoreRecentLeft),
            other => panic!("意外裁定: {:?}", other),
        }

        // 相同时间戳直接视为一致,不是歧义
        let r = obs(Some(2000));
        assert!(matches!(
            engine.decide("p.txt", Some(&l), Some(&r), None, None).unwrap(),
            Verdict::NoAction
        ));

        match engine.decide("p.txt", None, Some(&r), None, None).unwrap() {
            Verdict::Decision(d) => assert_eq!(d.outcome, Outcome::OnlyExistRight),
            other => panic!("意外裁定: {:?}", other),
        }
    }
}
