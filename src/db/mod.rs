//! 持久化元数据缓存
//!
//! 按 (storage_id, relative_path) 记录每个路径的最后已知快照。
//! 规划阶段只读;写入方法留给决策执行完成后的外部步骤调用。

pub mod models;
pub use models::*;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::config::DatabaseCacheEngine;

pub struct CacheStore {
    pool: SqlitePool,
}

impl CacheStore {
    /// 打开缓存库并确保表结构就绪
    pub async fn open(engine: &DatabaseCacheEngine) -> Result<Self, sqlx::Error> {
        let opts = &engine.engine_options;
        let url = connect_url(&engine.engine_url);

        // 内存库的每个连接各自独立,必须固定单连接
        let max_connections = if url.contains(":memory:") {
            1
        } else {
            opts.pool_size + opts.max_overflow
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(opts.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(opts.idle_timeout_secs))
            .connect(&url)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        debug!("缓存库已就绪: {}", engine.engine_url);
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS storage (
                id TEXT PRIMARY KEY,
                type TEXT NOT NULL,
                base_path TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS storage_file (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                storage_id TEXT NOT NULL REFERENCES storage(id),
                relative_path TEXT NOT NULL,
                modified_time INTEGER NOT NULL,
                size INTEGER NOT NULL,
                content_hash TEXT,
                updated_at INTEGER NOT NULL,
                UNIQUE(storage_id, relative_path)
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_storage_file_relative_path \
             ON storage_file(relative_path)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// 注册存储(外部写入路径的一部分,规划不调用)
    pub async fn register_storage(
        &self,
        id: &str,
        storage_type: &str,
        base_path: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO storage (id, type, base_path, created_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                   type = excluded.type,
                   base_path = excluded.base_path"#,
        )
        .bind(id)
        .bind(storage_type)
        .bind(base_path)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// 查询已注册的存储
    pub async fn get_storage(&self, id: &str) -> Result<Option<StorageRecord>, sqlx::Error> {
        let row = sqlx::query_as::<_, StorageRow>("SELECT * FROM storage WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.into()))
    }

    /// 获取单个路径的快照
    pub async fn get(
        &self,
        storage_id: &str,
        relative_path: &str,
    ) -> Result<Option<CacheRecord>, sqlx::Error> {
        let row = sqlx::query_as::<_, StorageFileRow>(
            "SELECT * FROM storage_file WHERE storage_id = ? AND relative_path = ?",
        )
        .bind(storage_id)
        .bind(relative_path)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.into()))
    }

    /// 获取一个存储的全部快照(返回 HashMap 以便按路径查找)
    pub async fn get_all(
        &self,
        storage_id: &str,
    ) -> Result<HashMap<String, CacheRecord>, sqlx::Error> {
        let rows =
            sqlx::query_as::<_, StorageFileRow>("SELECT * FROM storage_file WHERE storage_id = ?")
                .bind(storage_id)
                .fetch_all(&self.pool)
                .await?;

        let mut map = HashMap::new();
        for row in rows {
            let record: CacheRecord = row.into();
            map.insert(record.relative_path.clone(), record);
        }
        Ok(map)
    }

    /// 更新或插入快照(外部写入路径,动作执行成功后至少调用一次)
    pub async fn upsert(&self, record: &CacheRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO storage_file (storage_id, relative_path, modified_time, size, content_hash, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(storage_id, relative_path) DO UPDATE SET
                   modified_time = excluded.modified_time,
                   size = excluded.size,
                   content_hash = excluded.content_hash,
                   updated_at = excluded.updated_at"#,
        )
        .bind(&record.storage_id)
        .bind(&record.relative_path)
        .bind(record.modified_time)
        .bind(record.size)
        .bind(&record.content_hash)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// 删除快照(外部写入路径,删除动作执行成功后调用)
    pub async fn remove(&self, storage_id: &str, relative_path: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM storage_file WHERE storage_id = ? AND relative_path = ?")
            .bind(storage_id)
            .bind(relative_path)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// 补全连接参数:无查询串的文件 URL 自动加 mode=rwc,首跑时建库
fn connect_url(engine_url: &str) -> String {
    if engine_url.contains(":memory:") || engine_url.contains('?') {
        engine_url.to_string()
    } else {
        format!("{}?mode=rwc", engine_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineOptions;

    async fn open_memory() -> CacheStore {
        let engine = DatabaseCacheEngine {
            engine_url: "sqlite::memory:".to_string(),
            engine_options: EngineOptions::default(),
        };
        CacheStore::open(&engine).await.unwrap()
    }

    #[tokio::test]
    async fn test_upsert_get_roundtrip() {
        let store = open_memory().await;
        store.register_storage("left", "local", "/data/left").await.unwrap();

        let record = CacheRecord::new("left", "a/b.txt", 1_700_000_000, 42, None);
        store.upsert(&record).await.unwrap();

        let got = store.get("left", "a/b.txt").await.unwrap().unwrap();
        assert_eq!(got.modified_time, 1_700_000_000);
        assert_eq!(got.size, 42);
        assert!(got.content_hash.is_none());

        // 唯一键冲突时应覆盖而不是追加
        let newer = CacheRecord::new("left", "a/b.txt", 1_700_000_100, 43, Some("abc".into()));
        store.upsert(&newer).await.unwrap();

        let all = store.get_all("left").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all["a/b.txt"].modified_time, 1_700_000_100);
        assert_eq!(all["a/b.txt"].content_hash.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = open_memory().await;
        assert!(store.get("left", "nope").await.unwrap().is_none());
        assert!(store.get_all("left").await.unwrap().is_empty());
        assert!(store.get_storage("left").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove() {
        let store = open_memory().await;
        store.register_storage("left", "local", "").await.unwrap();
        let record = CacheRecord::new("left", "x.bin", 1, 2, None);
        store.upsert(&record).await.unwrap();

        store.remove("left", "x.bin").await.unwrap();
        assert!(store.get("left", "x.bin").await.unwrap().is_none());
    }
}
