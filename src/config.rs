//! 任务配置模块
//!
//! 加载即校验:所有带判别字段的联合类型在反序列化时解析为枚举,
//! `validate()` 在任何扫描开始前拒绝非法配置。

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::PlanError;
use crate::logging::LogSettings;

/// 顶层配置:日志设置 + 同步任务列表
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub log: LogSettings,
    pub jobs: Vec<SyncJobConfig>,
}

impl AppConfig {
    /// 从 JSON 文件加载并校验
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PlanError::config(format!("无法读取配置文件 {}: {}", path.display(), e)))?;
        let mut config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| PlanError::config(format!("配置解析失败: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 全量校验,同时做扩展名等规范化
    pub fn validate(&mut self) -> Result<(), PlanError> {
        if self.jobs.is_empty() {
            return Err(PlanError::config("配置中至少需要一个同步任务"));
        }

        let mut names = std::collections::HashSet::new();
        for job in &mut self.jobs {
            if !names.insert(job.name.clone()) {
                return Err(PlanError::config(format!("任务名重复: '{}'", job.name)));
            }
            job.validate()?;
        }
        Ok(())
    }
}

/// 单个同步任务
#[derive(Debug, Clone, Deserialize)]
pub struct SyncJobConfig {
    pub name: String,
    pub filters: FiltersSpec,
    #[serde(default)]
    pub synchronisation: Synchronisation,
    // 兼容原始配置的拼写
    #[serde(alias = "comparaison")]
    pub comparison: ComparisonConfig,
    pub left: StorageDescriptor,
    pub right: StorageDescriptor,
}

impl SyncJobConfig {
    fn validate(&mut self) -> Result<(), PlanError> {
        self.filters.validate(&self.name)?;
        self.synchronisation.validate(&self.name)?;
        self.comparison.validate(&self.name)?;
        self.left.validate(&self.name, "left")?;
        self.right.validate(&self.name, "right")?;

        // 左右 storage_id 相同会让缓存键互相混淆
        if self.left.storage_id == self.right.storage_id {
            return Err(PlanError::config(format!(
                "任务 '{}' 的左右存储必须使用不同的 storage_id",
                self.name
            )));
        }
        Ok(())
    }
}

// ============ 过滤器 ============

/// 先取 include 的并集,再按路径减去 exclude 的并集
#[derive(Debug, Clone, Deserialize)]
pub struct FiltersSpec {
    pub include: Vec<FilterSpec>,
    pub exclude: Option<Vec<FilterSpec>>,
}

impl FiltersSpec {
    fn validate(&mut self, job: &str) -> Result<(), PlanError> {
        if self.include.is_empty() {
            return Err(PlanError::config(format!(
                "任务 '{}' 至少需要一条 include 过滤规则",
                job
            )));
        }
        for spec in self
            .include
            .iter_mut()
            .chain(self.exclude.iter_mut().flatten())
        {
            spec.validate(job)?;
        }
        Ok(())
    }

    /// 任一规则是否用到创建时间约束
    pub fn uses_created(&self) -> bool {
        self.all_specs().any(|s| s.uses_created())
    }

    /// 任一规则是否用到修改时间约束
    pub fn uses_modified(&self) -> bool {
        self.all_specs().any(|s| s.uses_modified())
    }

    fn all_specs(&self) -> impl Iterator<Item = &FilterSpec> {
        self.include.iter().chain(self.exclude.iter().flatten())
    }
}

/// 一条过滤规则:路径根 + 属性约束
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterSpec {
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub created_after: Option<DateBound>,
    pub created_before: Option<DateBound>,
    pub modified_after: Option<DateBound>,
    pub modified_before: Option<DateBound>,
    /// 扩展名白名单,存储时不带前导点
    pub extensions: Option<Vec<String>>,
    pub path_prefix: Option<String>,
    /// 字面路径根,目录会被递归展开
    #[serde(default)]
    pub paths: Vec<String>,
    /// glob 模式路径根
    #[serde(default, alias = "regex_paths")]
    pub pattern_paths: Vec<String>,
    /// 递归深度上限,1 表示仅直接子项
    pub max_depth: Option<u32>,
}

impl FilterSpec {
    fn validate(&mut self, job: &str) -> Result<(), PlanError> {
        if self.paths.is_empty() && self.pattern_paths.is_empty() {
            return Err(PlanError::config(format!(
                "任务 '{}' 的过滤规则必须至少设置 paths 或 pattern_paths 之一",
                job
            )));
        }
        if let Some(depth) = self.max_depth {
            if depth < 1 {
                return Err(PlanError::config(format!(
                    "任务 '{}' 的 max_depth 必须 >= 1,实际为 {}",
                    job, depth
                )));
            }
        }
        for pattern in &self.pattern_paths {
            crate::core::matcher::validate_pattern(pattern)?;
        }
        // 扩展名统一去掉前导点
        if let Some(exts) = &mut self.extensions {
            for ext in exts.iter_mut() {
                *ext = ext.trim_start_matches('.').to_string();
            }
        }
        Ok(())
    }

    /// 是否使用了创建时间约束
    pub fn uses_created(&self) -> bool {
        self.created_after.is_some() || self.created_before.is_some()
    }

    /// 是否使用了修改时间约束
    pub fn uses_modified(&self) -> bool {
        self.modified_after.is_some() || self.modified_before.is_some()
    }
}

/// 日期边界:绝对时间点或相对当前时刻的时长
///
/// 反序列化依次尝试 RFC 3339 时间戳、YYYY-MM-DD 日期、ISO-8601 时长。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    /// UNIX 秒
    Absolute(i64),
    /// 相对 now 的秒数
    Relative(i64),
}

impl DateBound {
    pub fn parse(s: &str) -> Result<Self, String> {
        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
            return Ok(DateBound::Absolute(dt.timestamp()));
        }
        if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            let ts = date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
            return Ok(DateBound::Absolute(ts));
        }
        parse_iso_duration(s).map(DateBound::Relative)
    }
}

impl<'de> Deserialize<'de> for DateBound {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DateBound::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// 解析 ISO-8601 时长为秒数
///
/// 支持周/日/时/分/秒;年和月不是固定长度,直接拒绝。
fn parse_iso_duration(s: &str) -> Result<i64, String> {
    let body = s
        .strip_prefix('P')
        .ok_or_else(|| format!("无法解析日期边界 '{}'", s))?;
    if body.is_empty() {
        return Err(format!("时长 '{}' 为空", s));
    }
    let (date_part, time_part) = match body.split_once('T') {
        Some((d, t)) => (d, Some(t)),
        None => (body, None),
    };

    fn accumulate(part: &str, units: &[(char, i64)], src: &str) -> Result<i64, String> {
        let mut sum = 0i64;
        let mut digits = String::new();
        for c in part.chars() {
            if c.is_ascii_digit() {
                digits.push(c);
            } else {
                let n: i64 = digits
                    .parse()
                    .map_err(|_| format!("时长 '{}' 中单位 '{}' 前缺少数字", src, c))?;
                digits.clear();
                let mult = units
                    .iter()
                    .find(|(u, _)| *u == c)
                    .map(|(_, m)| *m)
                    .ok_or_else(|| {
                        format!("时长 '{}' 含不支持的单位 '{}'(年和月不是固定长度)", src, c)
                    })?;
                sum += n * mult;
            }
        }
        if !digits.is_empty() {
            return Err(format!("时长 '{}' 末尾的数字缺少单位", src));
        }
        Ok(sum)
    }

    let mut total = accumulate(date_part, &[('W', 604_800), ('D', 86_400)], s)?;
    if let Some(t) = time_part {
        total += accumulate(t, &[('H', 3_600), ('M', 60), ('S', 1)], s)?;
    }
    Ok(total)
}

// ============ 比较策略 ============

/// 比较策略,按 type 字段区分
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComparisonConfig {
    /// 按内容校验和比较,无缓存
    Content(DirectComparison),
    /// 按大小比较,无缓存
    Size(DirectComparison),
    /// 按修改时间 + 大小比较,缓存可选
    DatetimeSize(DateTimeSizeComparison),
}

impl ComparisonConfig {
    fn validate(&self, job: &str) -> Result<(), PlanError> {
        match self {
            ComparisonConfig::Content(c) | ComparisonConfig::Size(c) => c.validate(job),
            ComparisonConfig::DatetimeSize(c) => c.validate(job),
        }
    }

    /// 是否启用持久化缓存
    pub fn cache_enabled(&self) -> bool {
        matches!(
            self,
            ComparisonConfig::DatetimeSize(DateTimeSizeComparison::Enabled { .. })
        )
    }

    /// 缓存引擎配置(仅缓存启用时存在)
    pub fn cache_engine(&self) -> Option<&DatabaseCacheEngine> {
        match self {
            ComparisonConfig::DatetimeSize(DateTimeSizeComparison::Enabled {
                cache_engine: CacheEngine::Database(engine),
                ..
            }) => Some(engine),
            _ => None,
        }
    }
}

/// 无缓存的直接比较(content / size)
#[derive(Debug, Clone, Deserialize)]
pub struct DirectComparison {
    pub cache: CacheMode,
    pub actions: DirectActions,
}

impl DirectComparison {
    fn validate(&self, job: &str) -> Result<(), PlanError> {
        if self.cache != CacheMode::Disabled {
            return Err(PlanError::config(format!(
                "任务 '{}':content/size 比较不支持缓存,cache 必须为 disabled",
                job
            )));
        }
        self.actions.validate(job)
    }
}

/// datetime_size 比较,按 cache 字段再分叉
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "cache", rename_all = "snake_case")]
pub enum DateTimeSizeComparison {
    Enabled {
        time_zone_shift: String,
        cache_engine: CacheEngine,
        actions: CachedActions,
    },
    Disabled {
        time_zone_shift: String,
        actions: DirectDateTimeActions,
    },
}

impl DateTimeSizeComparison {
    fn validate(&self, job: &str) -> Result<(), PlanError> {
        parse_tz_shift(self.time_zone_shift())
            .map_err(|e| PlanError::config(format!("任务 '{}':{}", job, e)))?;

        match self {
            DateTimeSizeComparison::Enabled {
                cache_engine: CacheEngine::Database(engine),
                actions,
                ..
            } => {
                engine.validate(job)?;
                actions.validate(job)
            }
            DateTimeSizeComparison::Disabled { actions, .. } => actions.validate(job),
        }
    }

    pub fn time_zone_shift(&self) -> &str {
        match self {
            DateTimeSizeComparison::Enabled {
                time_zone_shift, ..
            }
            | DateTimeSizeComparison::Disabled {
                time_zone_shift, ..
            } => time_zone_shift,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    Disabled,
    Enabled,
}

/// 缓存引擎,按 cache_engine 字段区分(目前仅数据库一种)
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "cache_engine", rename_all = "snake_case")]
pub enum CacheEngine {
    Database(DatabaseCacheEngine),
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseCacheEngine {
    pub engine_url: String,
    #[serde(default)]
    pub engine_options: EngineOptions,
}

impl DatabaseCacheEngine {
    fn validate(&self, job: &str) -> Result<(), PlanError> {
        // 编译进来的驱动只有 sqlite
        if !self.engine_url.starts_with("sqlite:") {
            return Err(PlanError::config(format!(
                "任务 '{}':engine_url 仅支持 sqlite: 前缀,实际为 '{}'",
                job, self.engine_url
            )));
        }
        Ok(())
    }
}

/// 连接池参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub pool_size: u32,
    pub max_overflow: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            pool_size: 5,
            max_overflow: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

/// 解析 "±HH:MM" 为秒数
pub fn parse_tz_shift(s: &str) -> Result<i64, String> {
    let bytes = s.as_bytes();
    let valid = bytes.len() == 6
        && (bytes[0] == b'+' || bytes[0] == b'-')
        && bytes[1].is_ascii_digit()
        && bytes[2].is_ascii_digit()
        && bytes[3] == b':'
        && bytes[4].is_ascii_digit()
        && bytes[5].is_ascii_digit();
    if !valid {
        return Err(format!("time_zone_shift 必须形如 ±HH:MM,实际为 '{}'", s));
    }
    let hours: i64 = s[1..3].parse().map_err(|_| "小时解析失败".to_string())?;
    let minutes: i64 = s[4..6].parse().map_err(|_| "分钟解析失败".to_string())?;
    if minutes >= 60 {
        return Err(format!("time_zone_shift 分钟超界: '{}'", s));
    }
    let secs = hours * 3600 + minutes * 60;
    Ok(if bytes[0] == b'-' { -secs } else { secs })
}

// ============ 动作表 ============

/// 可配置的动作集合,各结果允许的子集由 validate 约束
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CopyToRight,
    CopyToLeft,
    CopyLeftToRight,
    CopyRightToLeft,
    Remove,
    RemoveInLeft,
    RemoveInRight,
    UpdateInLeft,
    UpdateInRight,
    Nothing,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CopyToRight => "copy_to_right",
            Action::CopyToLeft => "copy_to_left",
            Action::CopyLeftToRight => "copy_left_to_right",
            Action::CopyRightToLeft => "copy_right_to_left",
            Action::Remove => "remove",
            Action::RemoveInLeft => "remove_in_left",
            Action::RemoveInRight => "remove_in_right",
            Action::UpdateInLeft => "update_in_left",
            Action::UpdateInRight => "update_in_right",
            Action::Nothing => "nothing",
        }
    }
}

fn check_action(job: &str, key: &str, action: Action, allowed: &[Action]) -> Result<(), PlanError> {
    if allowed.contains(&action) {
        Ok(())
    } else {
        let names: Vec<&str> = allowed.iter().map(|a| a.as_str()).collect();
        Err(PlanError::config(format!(
            "任务 '{}':动作表键 '{}' 不允许 '{}',可选 {:?}",
            job,
            key,
            action.as_str(),
            names
        )))
    }
}

/// 缓存启用模式的结果 → 动作映射
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CachedActions {
    pub created_left: Action,
    pub created_right: Action,
    pub more_recent_left: Action,
    pub more_recent_right: Action,
    pub removed_left: Action,
    pub removed_right: Action,
}

impl CachedActions {
    fn validate(&self, job: &str) -> Result<(), PlanError> {
        use Action::*;
        check_action(
            job,
            "created_left",
            self.created_left,
            &[CopyToRight, Remove, Nothing],
        )?;
        check_action(
            job,
            "created_right",
            self.created_right,
            &[CopyToLeft, Remove, Nothing],
        )?;
        check_action(
            job,
            "more_recent_left",
            self.more_recent_left,
            &[UpdateInRight, UpdateInLeft, Nothing],
        )?;
        check_action(
            job,
            "more_recent_right",
            self.more_recent_right,
            &[UpdateInLeft, UpdateInRight, Nothing],
        )?;
        check_action(
            job,
            "removed_left",
            self.removed_left,
            &[RemoveInRight, CopyRightToLeft, Nothing],
        )?;
        check_action(
            job,
            "removed_right",
            self.removed_right,
            &[RemoveInLeft, CopyLeftToRight, Nothing],
        )
    }
}

/// datetime_size 无缓存模式的动作映射
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectDateTimeActions {
    pub only_exist_left: Action,
    pub only_exist_right: Action,
    pub more_recent_left: Action,
    pub more_recent_right: Action,
}

impl DirectDateTimeActions {
    fn validate(&self, job: &str) -> Result<(), PlanError> {
        use Action::*;
        check_action(
            job,
            "only_exist_left",
            self.only_exist_left,
            &[CopyToRight, Remove, Nothing],
        )?;
        check_action(
            job,
            "only_exist_right",
            self.only_exist_right,
            &[CopyToLeft, Remove, Nothing],
        )?;
        check_action(
            job,
            "more_recent_left",
            self.more_recent_left,
            &[UpdateInRight, UpdateInLeft, Nothing],
        )?;
        check_action(
            job,
            "more_recent_right",
            self.more_recent_right,
            &[UpdateInLeft, UpdateInRight, Nothing],
        )
    }
}

/// content / size 模式的动作映射
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectActions {
    pub only_exist_left: Action,
    pub only_exist_right: Action,
    pub file_is_different: Action,
}

impl DirectActions {
    fn validate(&self, job: &str) -> Result<(), PlanError> {
        use Action::*;
        check_action(
            job,
            "only_exist_left",
            self.only_exist_left,
            &[CopyToRight, Remove, Nothing],
        )?;
        check_action(
            job,
            "only_exist_right",
            self.only_exist_right,
            &[CopyToLeft, Remove, Nothing],
        )?;
        check_action(
            job,
            "file_is_different",
            self.file_is_different,
            &[UpdateInRight, UpdateInLeft, Nothing],
        )
    }
}

// ============ 冲突处理 ============

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Synchronisation {
    #[serde(default)]
    pub conflict_handling: ConflictHandling,
}

impl Synchronisation {
    fn validate(&self, job: &str) -> Result<(), PlanError> {
        if matches!(self.conflict_handling, ConflictHandling::Versioned { .. }) {
            return Err(PlanError::config(format!(
                "任务 '{}':versioned 冲突处理只在执行阶段有意义,规划器不支持",
                job
            )));
        }
        Ok(())
    }
}

/// 双方时间戳完全相同时的处理策略
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ConflictHandling {
    Named(ConflictKeyword),
    Force { force: ForceResolve },
    Versioned { versioned: serde_json::Value },
}

impl Default for ConflictHandling {
    fn default() -> Self {
        ConflictHandling::Named(ConflictKeyword::Warn)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKeyword {
    Warn,
    CancelSynchronisation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForceResolve {
    pub truth: SideName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideName {
    Left,
    Right,
}

// ============ 存储描述 ============

#[derive(Debug, Clone, Deserialize)]
pub struct StorageDescriptor {
    #[serde(rename = "type")]
    pub typ: StorageType,
    /// 缓存键的一半,同任务内左右必须不同
    pub storage_id: String,
    pub base_path: Option<String>,
    pub endpoint: Option<String>,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl StorageDescriptor {
    fn validate(&self, job: &str, side: &str) -> Result<(), PlanError> {
        if self.storage_id.trim().is_empty() {
            return Err(PlanError::config(format!(
                "任务 '{}' 的 {} 存储缺少 storage_id",
                job, side
            )));
        }
        let missing = |field: &str| {
            PlanError::config(format!(
                "任务 '{}' 的 {} 存储({})缺少 {}",
                job,
                side,
                self.typ.as_str(),
                field
            ))
        };
        match self.typ {
            StorageType::Local => {
                if self.base_path.is_none() {
                    return Err(missing("base_path"));
                }
            }
            StorageType::S3 => {
                if self.bucket.is_none() {
                    return Err(missing("bucket"));
                }
                if self.region.is_none() {
                    return Err(missing("region"));
                }
                if self.access_key.is_none() {
                    return Err(missing("access_key"));
                }
                if self.secret_key.is_none() {
                    return Err(missing("secret_key"));
                }
            }
            StorageType::WebDav => {
                if self.endpoint.is_none() {
                    return Err(missing("endpoint"));
                }
                if self.username.is_none() {
                    return Err(missing("username"));
                }
                if self.password.is_none() {
                    return Err(missing("password"));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    Local,
    S3,
    WebDav,
}

impl StorageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageType::Local => "local",
            StorageType::S3 => "s3",
            StorageType::WebDav => "webdav",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> serde_json::Value {
        serde_json::json!({
            "jobs": [{
                "name": "docs",
                "filters": {
                    "include": [{ "paths": ["docs"], "extensions": [".log", "txt"] }],
                    "exclude": [{ "pattern_paths": ["docs/tmp/*"] }]
                },
                "comparaison": {
                    "type": "datetime_size",
                    "time_zone_shift": "+00:00",
                    "cache": "enabled",
                    "cache_engine": {
                        "cache_engine": "database",
                        "engine_url": "sqlite::memory:"
                    },
                    "actions": {
                        "created_left": "copy_to_right",
                        "created_right": "copy_to_left",
                        "more_recent_left": "update_in_right",
                        "more_recent_right": "update_in_left",
                        "removed_left": "remove_in_right",
                        "removed_right": "remove_in_left"
                    }
                },
                "left": { "type": "local", "storage_id": "left", "base_path": "/data/l" },
                "right": { "type": "local", "storage_id": "right", "base_path": "/data/r" }
            }]
        })
    }

    fn load(value: serde_json::Value) -> Result<AppConfig, PlanError> {
        let mut config: AppConfig = serde_json::from_value(value)
            .map_err(|e| PlanError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn test_load_valid_config() {
        let config = load(sample_config()).unwrap();
        let job = &config.jobs[0];
        assert!(job.comparison.cache_enabled());
        assert_eq!(
            job.comparison.cache_engine().unwrap().engine_url,
            "sqlite::memory:"
        );
        // 扩展名去掉前导点
        assert_eq!(
            job.filters.include[0].extensions.as_deref().unwrap(),
            ["log", "txt"]
        );
    }

    #[test]
    fn test_filter_without_paths_rejected() {
        let mut value = sample_config();
        value["jobs"][0]["filters"]["include"] = serde_json::json!([{ "min_size": 10 }]);
        let err = load(value).unwrap_err();
        assert!(matches!(err, PlanError::Config(_)));
    }

    #[test]
    fn test_zero_depth_rejected() {
        let mut value = sample_config();
        value["jobs"][0]["filters"]["include"][0]["max_depth"] = serde_json::json!(0);
        assert!(load(value).is_err());
    }

    #[test]
    fn test_bad_tz_shift_rejected() {
        let mut value = sample_config();
        value["jobs"][0]["comparaison"]["time_zone_shift"] = serde_json::json!("+2:00");
        assert!(load(value).is_err());
    }

    #[test]
    fn test_missing_action_key_rejected() {
        let mut value = sample_config();
        value["jobs"][0]["comparaison"]["actions"]
            .as_object_mut()
            .unwrap()
            .remove("removed_left");
        assert!(load(value).is_err());
    }

    #[test]
    fn test_unknown_action_key_rejected() {
        let mut value = sample_config();
        value["jobs"][0]["comparaison"]["actions"]["bogus"] = serde_json::json!("nothing");
        assert!(load(value).is_err());
    }

    #[test]
    fn test_disallowed_action_value_rejected() {
        let mut value = sample_config();
        // created_left 不允许 update_in_right
        value["jobs"][0]["comparaison"]["actions"]["created_left"] =
            serde_json::json!("update_in_right");
        assert!(load(value).is_err());
    }

    #[test]
    fn test_same_storage_ids_rejected() {
        let mut value = sample_config();
        value["jobs"][0]["right"]["storage_id"] = serde_json::json!("left");
        assert!(load(value).is_err());
    }

    #[test]
    fn test_versioned_conflict_rejected() {
        let mut value = sample_config();
        value["jobs"][0]["synchronisation"] = serde_json::json!({
            "conflict_handling": { "versioned": { "side_of_the_version": "both" } }
        });
        assert!(load(value).is_err());
    }

    #[test]
    fn test_force_conflict_parses() {
        let mut value = sample_config();
        value["jobs"][0]["synchronisation"] = serde_json::json!({
            "conflict_handling": { "force": { "truth": "right" } }
        });
        let config = load(value).unwrap();
        match &config.jobs[0].synchronisation.conflict_handling {
            ConflictHandling::Force { force } => assert_eq!(force.truth, SideName::Right),
            other => panic!("意外的冲突处理: {:?}", other),
        }
    }

    #[test]
    fn test_content_with_cache_rejected() {
        let mut value = sample_config();
        value["jobs"][0]["comparaison"] = serde_json::json!({
            "type": "content",
            "cache": "enabled",
            "actions": {
                "only_exist_left": "copy_to_right",
                "only_exist_right": "copy_to_left",
                "file_is_different": "update_in_right"
            }
        });
        assert!(load(value).is_err());
    }

    #[test]
    fn test_date_bound_parsing() {
        assert_eq!(
            DateBound::parse("2024-05-01").unwrap(),
            DateBound::Absolute(1_714_521_600)
        );
        assert!(matches!(
            DateBound::parse("2024-05-01T12:00:00Z").unwrap(),
            DateBound::Absolute(_)
        ));
        assert_eq!(DateBound::parse("P2D").unwrap(), DateBound::Relative(172_800));
        assert_eq!(
            DateBound::parse("PT12H30M").unwrap(),
            DateBound::Relative(45_000)
        );
        assert_eq!(DateBound::parse("P1W").unwrap(), DateBound::Relative(604_800));
        // 年月不是固定长度
        assert!(DateBound::parse("P1Y").is_err());
        assert!(DateBound::parse("P1M").is_err());
        assert!(DateBound::parse("yesterday").is_err());
    }

    #[test]
    fn test_tz_shift_parsing() {
        assert_eq!(parse_tz_shift("+01:00").unwrap(), 3600);
        assert_eq!(parse_tz_shift("-02:30").unwrap(), -9000);
        assert_eq!(parse_tz_shift("+00:00").unwrap(), 0);
        assert!(parse_tz_shift("01:00").is_err());
        assert!(parse_tz_shift("+1:00").is_err());
        assert!(parse_tz_shift("+01:99").is_err());
    }

    #[test]
    fn test_invalid_glob_rejected_at_load() {
        let mut value = sample_config();
        value["jobs"][0]["filters"]["include"][0] =
            serde_json::json!({ "pattern_paths": ["logs/a**b"] });
        let err = load(value).unwrap_err();
        assert!(matches!(err, PlanError::Pattern { .. }));
    }
}
