use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::features::ogp::{AssetCache, ObjectStore};

/// 聚合的应用共享状态
#[derive(Clone)]
pub struct AppState {
    /// 字体 / 背景图所在的对象存储
    pub store: Arc<ObjectStore>,
    /// 进程生命周期的资源缓存（首个图片请求时惰性填充）
    pub assets: Arc<AssetCache>,
    /// 控制并发渲染的信号量（限制 CPU 密集型任务数量）
    pub render_semaphore: Arc<Semaphore>,
}
