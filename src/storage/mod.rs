pub mod local;
pub mod s3;
pub mod webdav;

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use opendal::{Metakey, Operator};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

pub use local::LocalStorage;
pub use s3::S3Storage;
pub use webdav::WebDavStorage;

use crate::config::{StorageDescriptor, StorageType};

// ============ 公共常量 ============

/// 非 IO 操作超时(秒)- stat, list 等
pub const OP_TIMEOUT_SECS: u64 = 60;
/// IO 操作超时(秒)- 读取内容计算校验和等
pub const IO_TIMEOUT_SECS: u64 = 300;

/// 列表通道的缓冲大小,消费端不拉取时生产端阻塞
pub(crate) const LIST_CHANNEL_CAPACITY: usize = 256;

/// 列表产出的文件信息,路径一律相对于存储根
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    pub size: u64,
    pub modified_time: Option<i64>,
    pub created_time: Option<i64>,
    pub is_dir: bool,
    pub checksum: Option<String>,
}

/// stat 产出的文件元数据
#[derive(Debug, Clone)]
pub struct FileMeta {
    pub size: u64,
    pub modified_time: Option<i64>,
    pub created_time: Option<i64>,
    pub is_dir: bool,
    pub etag: Option<String>,
}

impl FileMeta {
    /// 补上路径,转成与列表产出同形的观察值
    pub fn into_info(self, path: &str) -> FileInfo {
        FileInfo {
            path: path.to_string(),
            size: self.size,
            modified_time: self.modified_time,
            created_time: self.created_time,
            is_dir: self.is_dir,
            checksum: self.etag,
        }
    }
}

/// 校验和种类,跨侧内容比较要求两侧一致
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKind {
    Blake3,
    Etag,
}

/// 后端能力声明,配置阶段据此拒绝不可行的过滤/比较
#[derive(Debug, Clone, Copy)]
pub struct StorageCapabilities {
    pub modified_time: bool,
    pub created_time: bool,
    pub content_hash: Option<HashKind>,
}

/// 惰性文件列表流
pub type FileInfoStream = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send>>;

/// 存储抽象接口,规划器对其只读
#[async_trait]
pub trait Storage: Send + Sync {
    /// 惰性列出 path 下的条目(文件与目录)
    ///
    /// path 为空串表示存储根;path 指向文件时只产出该文件自身。
    /// recursive=false 时只列直接子项;max_depth 限制相对 path 的层数
    /// (1 = 仅直接子项)。根不存在时产出空流,不视为错误。
    async fn list(
        &self,
        path: &str,
        recursive: bool,
        max_depth: Option<u32>,
    ) -> Result<FileInfoStream>;

    /// 获取单个路径的元数据,不存在返回 None
    async fn stat(&self, path: &str) -> Result<Option<FileMeta>>;

    /// 检查路径是否存在
    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.stat(path).await?.is_some())
    }

    /// 取内容校验和,种类见 capabilities
    async fn content_hash(&self, path: &str) -> Result<Option<String>>;

    /// 后端能力声明
    fn capabilities(&self) -> StorageCapabilities;

    /// 存储名称(用于日志)
    fn name(&self) -> &str;
}

/// 根据存储描述创建实例
pub async fn create_storage(desc: &StorageDescriptor) -> Result<Arc<dyn Storage>> {
    match desc.typ {
        StorageType::Local => {
            let base = desc
                .base_path
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("local 存储需要 base_path"))?;
            tracing::info!("初始化本地存储: {}", base);
            Ok(Arc::new(LocalStorage::new(base)) as Arc<dyn Storage>)
        }
        StorageType::S3 => {
            let bucket = desc
                .bucket
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("s3 存储需要 bucket"))?;
            let region = desc
                .region
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("s3 存储需要 region"))?;
            let access_key = desc
                .access_key
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("s3 存储需要 access_key"))?;
            let secret_key = desc
                .secret_key
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("s3 存储需要 secret_key"))?;
            tracing::info!("初始化S3存储: bucket={}, region={}", bucket, region);
            Ok(Arc::new(
                S3Storage::new(
                    bucket,
                    region,
                    access_key,
                    secret_key,
                    desc.endpoint.clone(),
                    desc.base_path.clone(),
                )
                .await?,
            ) as Arc<dyn Storage>)
        }
        StorageType::WebDav => {
            let endpoint = desc
                .endpoint
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("webdav 存储需要 endpoint"))?;
            let username = desc
                .username
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("webdav 存储需要 username"))?;
            let password = desc
                .password
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("webdav 存储需要 password"))?;
            tracing::info!("初始化WebDAV存储: endpoint={}", endpoint);
            Ok(Arc::new(
                WebDavStorage::new(endpoint, username, password, desc.base_path.clone()).await?,
            ) as Arc<dyn Storage>)
        }
    }
}

/// opendal 条目转文件信息,目录路径去掉尾部斜杠
fn entry_to_info(path: &str, meta: &opendal::Metadata) -> FileInfo {
    let clean = path.trim_start_matches('/').trim_end_matches('/');
    FileInfo {
        path: clean.to_string(),
        size: meta.content_length(),
        modified_time: meta.last_modified().map(|t| t.timestamp()),
        created_time: None,
        is_dir: meta.is_dir(),
        checksum: meta.etag().map(|s| s.trim_matches('"').to_string()),
    }
}

/// s3/webdav 共用的惰性列表实现
///
/// 无界递归时用单个扁平 lister;有界时按层 BFS,
/// 用非递归 lister 逐目录展开以精确控制深度。
pub(crate) async fn opendal_list_stream(
    operator: Operator,
    path: String,
    recursive: bool,
    max_depth: Option<u32>,
) -> Result<FileInfoStream> {
    use futures::TryStreamExt;

    let root = path.trim_matches('/').to_string();

    // 非空路径先 stat:指向文件时只产出自身
    if !root.is_empty() {
        match operator.stat(&root).await {
            Ok(meta) if !meta.is_dir() => {
                let info = entry_to_info(&root, &meta);
                return Ok(Box::pin(futures::stream::once(async move { Ok(info) })));
            }
            Ok(_) => {}
            // 对象存储的"目录"往往 stat 不到,继续按前缀列表
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }

    let depth_limit = if recursive { max_depth } else { Some(1) };
    let (tx, rx) = mpsc::channel::<Result<FileInfo>>(LIST_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let dir_path = |d: &str| {
            if d.is_empty() {
                String::new()
            } else {
                format!("{}/", d)
            }
        };

        match depth_limit {
            None => {
                // 扁平递归列表,一次分页扫描到底
                let mut lister = match operator
                    .lister_with(&dir_path(&root))
                    .recursive(true)
                    .metakey(
                        Metakey::ContentLength | Metakey::LastModified | Metakey::Mode | Metakey::Etag,
                    )
                    .await
                {
                    Ok(l) => l,
                    Err(e) if e.kind() == opendal::ErrorKind::NotFound => return,
                    Err(e) => {
                        let _ = tx.send(Err(e.into())).await;
                        return;
                    }
                };
                loop {
                    match lister.try_next().await {
                        Ok(Some(entry)) => {
                            let p = entry.path().trim_matches('/');
                            if p.is_empty() || p == root {
                                continue;
                            }
                            let info = entry_to_info(entry.path(), entry.metadata());
                            if tx.send(Ok(info)).await.is_err() {
                                return;
                            }
                        }
                        Ok(None) => return,
                        Err(e) => {
                            let _ = tx.send(Err(e.into())).await;
                            return;
                        }
                    }
                }
            }
            Some(limit) => {
                // 按层展开,remaining 为该目录下还能下探的层数
                let mut queue: VecDeque<(String, u32)> = VecDeque::new();
                queue.push_back((root.clone(), limit.max(1)));

                while let Some((dir, remaining)) = queue.pop_front() {
                    let mut lister = match operator
                        .lister_with(&dir_path(&dir))
                        .recursive(false)
                        .metakey(
                            Metakey::ContentLength
                                | Metakey::LastModified
                                | Metakey::Mode
                                | Metakey::Etag,
                        )
                        .await
                    {
                        Ok(l) => l,
                        Err(e) if e.kind() == opendal::ErrorKind::NotFound => continue,
                        Err(e) => {
                            let _ = tx.send(Err(e.into())).await;
                            return;
                        }
                    };
                    loop {
                        match lister.try_next().await {
                            Ok(Some(entry)) => {
                                let p = entry.path().trim_matches('/');
                                if p.is_empty() || p == dir {
                                    continue;
                                }
                                let info = entry_to_info(entry.path(), entry.metadata());
                                let is_dir = info.is_dir;
                                let child = info.path.clone();
                                if tx.send(Ok(info)).await.is_err() {
                                    return;
                                }
                                if is_dir && remaining > 1 {
                                    queue.push_back((child, remaining - 1));
                                }
                            }
                            Ok(None) => break,
                            Err(e) => {
                                let _ = tx.send(Err(e.into())).await;
                                return;
                            }
                        }
                    }
                }
            }
        }
    });

    Ok(Box::pin(ReceiverStream::new(rx)))
}
