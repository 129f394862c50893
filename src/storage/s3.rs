use super::{
    opendal_list_stream, FileInfoStream, FileMeta, HashKind, Storage, StorageCapabilities,
    IO_TIMEOUT_SECS, OP_TIMEOUT_SECS,
};
use anyhow::Result;
use async_trait::async_trait;
use opendal::{layers::TimeoutLayer, Operator};
use std::time::Duration;

pub struct S3Storage {
    operator: Operator,
    name: String,
}

impl S3Storage {
    pub async fn new(
        bucket: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        endpoint: Option<String>,
        base_path: Option<String>,
    ) -> Result<Self> {
        use opendal::services::S3;

        let mut builder = S3::default()
            .bucket(bucket)
            .region(region)
            .access_key_id(access_key)
            .secret_access_key(secret_key);

        if let Some(ref ep) = endpoint {
            builder = builder.endpoint(ep);
        }

        // base_path 作为 operator 根,之后所有路径都相对于它
        if let Some(ref p) = base_path {
            builder = builder.root(p);
        }

        // 添加超时层
        let operator = Operator::new(builder)?
            .layer(
                TimeoutLayer::default()
                    .with_timeout(Duration::from_secs(OP_TIMEOUT_SECS))
                    .with_io_timeout(Duration::from_secs(IO_TIMEOUT_SECS)),
            )
            .finish();

        let name = format!(
            "s3://{}{}",
            bucket,
            base_path
                .as_deref()
                .map(|p| format!("/{}", p.trim_start_matches('/')))
                .unwrap_or_default()
        );

        Ok(Self { operator, name })
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn list(
        &self,
        path: &str,
        recursive: bool,
        max_depth: Option<u32>,
    ) -> Result<FileInfoStream> {
        opendal_list_stream(self.operator.clone(), path.to_string(), recursive, max_depth).await
    }

    async fn stat(&self, path: &str) -> Result<Option<FileMeta>> {
        match self.operator.stat(path).await {
            Ok(meta) => Ok(Some(FileMeta {
                size: meta.content_length(),
                modified_time: meta.last_modified().map(|t| t.timestamp()),
                created_time: None,
                is_dir: meta.is_dir(),
                etag: meta.etag().map(|s| s.trim_matches('"').to_string()),
            })),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn content_hash(&self, path: &str) -> Result<Option<String>> {
        // S3 以 ETag 充当内容校验和
        Ok(self.stat(path).await?.and_then(|m| m.etag))
    }

    fn capabilities(&self) -> StorageCapabilities {
        StorageCapabilities {
            modified_time: true,
            created_time: false,
            content_hash: Some(HashKind::Etag),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
