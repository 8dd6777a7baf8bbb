use std::sync::Arc;

use ogp_backend::config::StorageConfig;
use ogp_backend::features::ogp::{AssetCache, MemObjectStore, ObjectStore};

fn full_store() -> Arc<ObjectStore> {
    Arc::new(ObjectStore::Mem(MemObjectStore::from_pairs([
        ("fonts/NotoSansJP-Regular.otf", b"font-bytes".to_vec()),
        ("images/sakura.png", b"png-bytes".to_vec()),
    ])))
}

/// 填充后的缓存零存储访问
#[tokio::test]
async fn populated_cache_performs_no_further_lookups() {
    let cache = AssetCache::new();
    let store = full_store();
    let cfg = StorageConfig::default();

    let first = cache.get_or_fetch(&store, &cfg).await.unwrap();
    for _ in 0..5 {
        let again = cache.get_or_fetch(&store, &cfg).await.unwrap();
        assert_eq!(again.background_data_uri, first.background_data_uri);
    }

    if let ObjectStore::Mem(mem) = store.as_ref() {
        // 首次填充各取一次字体与背景，此后不再访问存储
        assert_eq!(mem.lookup_count(), 2);
    } else {
        unreachable!();
    }
}

/// 冷启动竞争：并发首访各自取回、各自写入，结果一致（幂等竞争）
#[tokio::test]
async fn concurrent_first_access_is_idempotent() {
    let cache = Arc::new(AssetCache::new());
    let store = full_store();
    let cfg = StorageConfig::default();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = cache.clone();
        let store = store.clone();
        let cfg = cfg.clone();
        handles.push(tokio::spawn(async move {
            cache.get_or_fetch(&store, &cfg).await
        }));
    }

    let mut uris = Vec::new();
    for h in handles {
        let assets = h.await.unwrap().expect("population must succeed");
        uris.push(assets.background_data_uri.clone());
    }

    assert!(cache.is_populated());
    assert!(uris.iter().all(|u| u == &uris[0]));
}

/// 任一对象缺失：整体失败，不残留半填充状态
#[tokio::test]
async fn absent_object_fails_with_no_partial_state() {
    let cache = AssetCache::new();
    let store = ObjectStore::Mem(MemObjectStore::from_pairs([(
        "images/sakura.png",
        b"png-bytes".to_vec(),
    )]));
    let cfg = StorageConfig::default();

    let err = cache.get_or_fetch(&store, &cfg).await.unwrap_err();
    assert!(matches!(
        err,
        ogp_backend::AppError::AssetUnavailable(_)
    ));
    assert!(!cache.is_populated());

    // 失败不会让后续请求走到渲染：再次调用仍然重试取回（且仍失败）
    let err2 = cache.get_or_fetch(&store, &cfg).await.unwrap_err();
    assert!(matches!(
        err2,
        ogp_backend::AppError::AssetUnavailable(_)
    ));
}
