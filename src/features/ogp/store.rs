use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::body::Bytes;
use reqwest::StatusCode;

use crate::config::{AppConfig, StorageKind};
use crate::error::AppError;

/// 预置资源所在的对象存储。
///
/// 接口语义：按键取回整个对象，返回字节或"不存在"。存储本身被视为
/// 外部协作方，这里只做最薄的适配，不做重试。
pub enum ObjectStore {
    /// 本地文件系统目录（键即相对路径）
    Fs(FsObjectStore),
    /// HTTP 回源（404 视为不存在）
    Http(HttpObjectStore),
    /// 预加载的内存对象（测试与内嵌资源场景）
    Mem(MemObjectStore),
}

impl ObjectStore {
    /// 按配置构造存储后端
    pub fn from_config(cfg: &AppConfig) -> Result<Self, AppError> {
        match cfg.storage.kind {
            StorageKind::Fs => Ok(ObjectStore::Fs(FsObjectStore::new(cfg.storage_root()))),
            StorageKind::Http => {
                let base_url = cfg.storage.base_url.clone().ok_or_else(|| {
                    AppError::Internal("storage.kind = http 但缺少 storage.base_url".to_string())
                })?;
                Ok(ObjectStore::Http(HttpObjectStore::new(base_url)))
            }
        }
    }

    /// 取回单个对象，`Ok(None)` 表示对象不存在
    pub async fn get(&self, key: &str) -> Result<Option<Bytes>, AppError> {
        match self {
            ObjectStore::Fs(s) => s.get(key).await,
            ObjectStore::Http(s) => s.get(key).await,
            ObjectStore::Mem(s) => Ok(s.get(key)),
        }
    }
}

/// 文件系统后端
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, AppError> {
        let path = self.root.join(key);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Internal(format!(
                "读取存储对象失败 '{}': {e}",
                path.display()
            ))),
        }
    }
}

/// HTTP 后端
pub struct HttpObjectStore {
    base_url: String,
}

impl HttpObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, AppError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), key);
        let resp = crate::http::client_timeout_30s()
            .map_err(|e| AppError::Internal(format!("HTTP client 初始化失败: {e}")))?
            .get(&url)
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = resp.error_for_status()?;
        Ok(Some(resp.bytes().await?))
    }
}

/// 内存后端：预加载键值对，并统计取回次数（缓存幂等性测试依赖该计数）。
#[derive(Default)]
pub struct MemObjectStore {
    objects: HashMap<String, Bytes>,
    lookups: AtomicUsize,
}

impl MemObjectStore {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Bytes>,
    {
        Self {
            objects: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            lookups: AtomicUsize::new(0),
        }
    }

    fn get(&self, key: &str) -> Option<Bytes> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.objects.get(key).cloned()
    }

    /// 累计取回次数
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mem_store_counts_lookups_and_misses() {
        let store = ObjectStore::Mem(MemObjectStore::from_pairs([("a", "x".as_bytes().to_vec())]));

        assert_eq!(store.get("a").await.unwrap().unwrap().as_ref(), b"x");
        assert!(store.get("missing").await.unwrap().is_none());

        if let ObjectStore::Mem(mem) = &store {
            assert_eq!(mem.lookup_count(), 2);
        }
    }

    #[tokio::test]
    async fn fs_store_treats_missing_file_as_not_found() {
        let store = FsObjectStore::new("./definitely-not-a-real-dir");
        let got = store.get("fonts/nope.otf").await.unwrap();
        assert!(got.is_none());
    }
}
