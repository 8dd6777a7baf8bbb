use std::sync::{Arc, RwLock};

use axum::body::Bytes;
use base64::{Engine as _, engine::general_purpose::STANDARD as base64_engine};

use crate::config::StorageConfig;
use crate::error::AppError;

use super::store::ObjectStore;

/// 首次取回后常驻内存的渲染资源。
///
/// 背景图在填充缓存时就转换为 data URI，后续的布局构建不再重复编码。
#[derive(Debug)]
pub struct LoadedAssets {
    /// 字体二进制（OTF/TTF）
    pub font_bytes: Bytes,
    /// 背景图的 `data:image/png;base64,...` 形式
    pub background_data_uri: String,
}

/// 进程生命周期的资源缓存。
///
/// 状态只有 Empty / Populated 两种；一经填充永不重取、永不失效。
/// 冷启动时并发的首批请求可能各自发起一轮取回并各自写入——两者从同一批
/// 不可变对象算出相同的值，所以这场竞争是幂等的，不做 single-flight 去重。
pub struct AssetCache {
    slot: RwLock<Option<Arc<LoadedAssets>>>,
}

impl Default for AssetCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetCache {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// 缓存是否已填充（测试用：校验失败路径不会残留半填充状态）
    pub fn is_populated(&self) -> bool {
        self.slot.read().expect("asset cache lock poisoned").is_some()
    }

    /// 命中则零 I/O 返回；未命中则并发取回字体与背景图并填充缓存。
    ///
    /// 任一对象缺失即返回 `AssetUnavailable`，且不写入任何一侧
    /// （背景缺失时不会单独缓存字体）。
    pub async fn get_or_fetch(
        &self,
        store: &ObjectStore,
        cfg: &StorageConfig,
    ) -> Result<Arc<LoadedAssets>, AppError> {
        if let Some(assets) = self.slot.read().expect("asset cache lock poisoned").as_ref() {
            return Ok(assets.clone());
        }

        let (font, background) =
            tokio::try_join!(store.get(&cfg.font_key), store.get(&cfg.background_key))?;

        let font_bytes =
            font.ok_or_else(|| AppError::AssetUnavailable(cfg.font_key.clone()))?;
        let background_bytes =
            background.ok_or_else(|| AppError::AssetUnavailable(cfg.background_key.clone()))?;

        let assets = Arc::new(LoadedAssets {
            font_bytes,
            background_data_uri: format!(
                "data:image/png;base64,{}",
                base64_engine.encode(&background_bytes)
            ),
        });

        // 竞争写入时保留先到者（两份值相同，取哪份都一样）
        let mut slot = self.slot.write().expect("asset cache lock poisoned");
        Ok(slot.get_or_insert_with(|| assets).clone())
    }
}
