use super::{
    FileInfo, FileInfoStream, FileMeta, HashKind, Storage, StorageCapabilities,
    LIST_CHANNEL_CAPACITY,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::UNIX_EPOCH;
use tokio::fs;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use walkdir::WalkDir;

pub struct LocalStorage {
    base_path: PathBuf,
    name: String,
}

impl LocalStorage {
    pub fn new(path: &str) -> Self {
        let base_path = PathBuf::from(path);
        let name = format!("local:{}", path);
        Self { base_path, name }
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = path.trim_start_matches('/').trim_start_matches('\\');
        if path.is_empty() {
            self.base_path.clone()
        } else {
            self.base_path.join(path)
        }
    }

    /// 规范化路径分隔符(统一使用 /)
    fn normalize_path(path: &str) -> String {
        path.replace('\\', "/")
    }

    fn system_time_secs(t: std::io::Result<std::time::SystemTime>) -> Option<i64> {
        t.ok()?
            .duration_since(UNIX_EPOCH)
            .ok()
            .map(|d| d.as_secs() as i64)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn list(
        &self,
        path: &str,
        recursive: bool,
        max_depth: Option<u32>,
    ) -> Result<FileInfoStream> {
        let root = self.resolve_path(path);
        if !root.exists() {
            // 根不存在按空序列处理
            return Ok(Box::pin(futures::stream::empty()));
        }

        let base_path = self.base_path.clone();
        let depth_limit = if recursive { max_depth } else { Some(1) };
        let (tx, rx) = mpsc::channel::<Result<FileInfo>>(LIST_CHANNEL_CAPACITY);

        // 阻塞遍历放到 spawn_blocking,经有界通道喂给异步消费端
        tokio::task::spawn_blocking(move || {
            let mut walker = WalkDir::new(&root).follow_links(false);
            if let Some(d) = depth_limit {
                walker = walker.max_depth(d as usize);
            }
            for entry in walker {
                let entry = match entry {
                    Ok(e) => e,
                    Err(e) => {
                        let _ = tx.blocking_send(Err(
                            anyhow::Error::from(e).context("本地目录遍历失败")
                        ));
                        return;
                    }
                };
                // 被列目录自身不产出
                if entry.depth() == 0 && entry.file_type().is_dir() {
                    continue;
                }
                let metadata = match entry.metadata() {
                    Ok(m) => m,
                    Err(e) => {
                        let _ = tx.blocking_send(Err(
                            anyhow::Error::from(e).context("读取文件元数据失败")
                        ));
                        return;
                    }
                };
                let relative = match entry.path().strip_prefix(&base_path) {
                    Ok(r) => r.to_string_lossy().to_string(),
                    Err(_) => continue,
                };
                if relative.is_empty() {
                    continue;
                }
                let info = FileInfo {
                    path: Self::normalize_path(&relative),
                    size: if metadata.is_dir() { 0 } else { metadata.len() },
                    modified_time: Self::system_time_secs(metadata.modified()),
                    created_time: Self::system_time_secs(metadata.created()),
                    is_dir: metadata.is_dir(),
                    checksum: None,
                };
                // 消费端放弃时结束遍历
                if tx.blocking_send(Ok(info)).is_err() {
                    return;
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn stat(&self, path: &str) -> Result<Option<FileMeta>> {
        let full_path = self.resolve_path(path);

        match fs::metadata(&full_path).await {
            Ok(metadata) => Ok(Some(FileMeta {
                size: if metadata.is_dir() { 0 } else { metadata.len() },
                modified_time: Self::system_time_secs(metadata.modified()),
                created_time: Self::system_time_secs(metadata.created()),
                is_dir: metadata.is_dir(),
                etag: None,
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn content_hash(&self, path: &str) -> Result<Option<String>> {
        let full_path = self.resolve_path(path);
        let data = fs::read(&full_path)
            .await
            .with_context(|| format!("读取文件内容失败: {}", path))?;
        let hash = tokio::task::spawn_blocking(move || blake3::hash(&data).to_hex().to_string())
            .await?;
        Ok(Some(hash))
    }

    fn capabilities(&self) -> StorageCapabilities {
        StorageCapabilities {
            modified_time: true,
            created_time: true,
            content_hash: Some(HashKind::Blake3),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::fs as std_fs;
    use tempfile::TempDir;

    fn build_tree(dir: &TempDir) {
        std_fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std_fs::write(dir.path().join("root.txt"), b"root").unwrap();
        std_fs::write(dir.path().join("a/one.txt"), b"one").unwrap();
        std_fs::write(dir.path().join("a/b/two.txt"), b"two").unwrap();
    }

    async fn collect_paths(mut stream: FileInfoStream) -> Vec<String> {
        let mut paths = Vec::new();
        while let Some(item) = stream.next().await {
            paths.push(item.unwrap().path);
        }
        paths.sort();
        paths
    }

    #[tokio::test]
    async fn test_list_recursive() {
        let dir = TempDir::new().unwrap();
        build_tree(&dir);
        let storage = LocalStorage::new(dir.path().to_str().unwrap());

        let paths = collect_paths(storage.list("", true, None).await.unwrap()).await;
        assert_eq!(paths, vec!["a", "a/b", "a/b/two.txt", "a/one.txt", "root.txt"]);
    }

    #[tokio::test]
    async fn test_list_depth_limited() {
        let dir = TempDir::new().unwrap();
        build_tree(&dir);
        let storage = LocalStorage::new(dir.path().to_str().unwrap());

        let paths = collect_paths(storage.list("", true, Some(1)).await.unwrap()).await;
        assert_eq!(paths, vec!["a", "root.txt"]);

        let paths = collect_paths(storage.list("a", false, None).await.unwrap()).await;
        assert_eq!(paths, vec!["a/b", "a/one.txt"]);
    }

    #[tokio::test]
    async fn test_list_file_root_yields_itself() {
        let dir = TempDir::new().unwrap();
        build_tree(&dir);
        let storage = LocalStorage::new(dir.path().to_str().unwrap());

        let paths = collect_paths(storage.list("a/one.txt", true, None).await.unwrap()).await;
        assert_eq!(paths, vec!["a/one.txt"]);
    }

    #[tokio::test]
    async fn test_list_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().to_str().unwrap());

        let paths = collect_paths(storage.list("nope", true, None).await.unwrap()).await;
        assert!(paths.is_empty());
    }

    #[tokio::test]
    async fn test_stat_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().to_str().unwrap());

        assert!(storage.stat("missing.txt").await.unwrap().is_none());
        assert!(!storage.exists("missing.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_content_hash_is_blake3() {
        let dir = TempDir::new().unwrap();
        std_fs::write(dir.path().join("data.bin"), b"hello").unwrap();
        let storage = LocalStorage::new(dir.path().to_str().unwrap());

        let hash = storage.content_hash("data.bin").await.unwrap().unwrap();
        assert_eq!(hash, blake3::hash(b"hello").to_hex().to_string());
    }
}
