//! 缓存库的记录模型

use serde::{Deserialize, Serialize};

/// 存储注册记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageRecord {
    pub id: String,
    pub storage_type: String,
    pub base_path: String,
    pub created_at: i64,
}

/// 数据库行
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct StorageRow {
    pub id: String,
    #[sqlx(rename = "type")]
    pub storage_type: String,
    pub base_path: String,
    pub created_at: i64,
}

impl From<StorageRow> for StorageRecord {
    fn from(row: StorageRow) -> Self {
        StorageRecord {
            id: row.id,
            storage_type: row.storage_type,
            base_path: row.base_path,
            created_at: row.created_at,
        }
    }
}

/// 单个路径的最后已知元数据快照
///
/// 文件消失后记录仍保留,正是靠它区分"已删除"与"从未存在"。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    pub storage_id: String,
    pub relative_path: String,
    pub modified_time: i64,
    pub size: i64,
    pub content_hash: Option<String>,
    pub updated_at: i64,
}

impl CacheRecord {
    /// 以当前时间作为 updated_at 构造快照
    pub fn new(
        storage_id: impl Into<String>,
        relative_path: impl Into<String>,
        modified_time: i64,
        size: i64,
        content_hash: Option<String>,
    ) -> Self {
        Self {
            storage_id: storage_id.into(),
            relative_path: relative_path.into(),
            modified_time,
            size,
            content_hash,
            updated_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// 数据库行
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct StorageFileRow {
    #[allow(dead_code)]
    pub id: i64,
    pub storage_id: String,
    pub relative_path: String,
    pub modified_time: i64,
    pub size: i64,
    pub content_hash: Option<String>,
    pub updated_at: i64,
}

impl From<StorageFileRow> for CacheRecord {
    fn from(row: StorageFileRow) -> Self {
        CacheRecord {
            storage_id: row.storage_id,
            relative_path: row.relative_path,
            modified_time: row.modified_time,
            size: row.size,
            content_hash: row.content_hash,
            updated_at: row.updated_at,
        }
    }
}
