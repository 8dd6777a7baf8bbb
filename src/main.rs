use axum::{Router, http::StatusCode, response::Json, routing::get};
use ogp_backend::config::AppConfig;
use ogp_backend::features::ogp::{self, AssetCache, ObjectStore};
use ogp_backend::state::AppState;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tower_http::compression::CompressionLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        ogp_backend::features::ogp::handler::render_image,
        ogp_backend::features::ogp::handler::ogp_page,
        health_check,
    ),
    components(schemas(ogp_backend::features::ogp::RenderRequest)),
    tags(
        (name = "Ogp", description = "OGP preview APIs"),
        (name = "Health", description = "Health APIs"),
    ),
    info(
        title = "OGP Backend API",
        version = "0.1.0",
        description = "OGP preview image service (Axum)"
    )
)]
pub struct ApiDoc;

#[utoipa::path(
    get,
    path = "/health",
    summary = "健康检查",
    description = "用于探活的健康检查端点，返回服务状态与版本信息。",
    responses((status = 200, description = "服务健康", body = serde_json::Value)),
    tag = "Health"
)]
async fn health_check() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "ogp-backend",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("监听退出信号失败: {}", e);
        return;
    }
    tracing::info!("接收到退出信号，开始优雅关闭HTTP服务器...");
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ogp_backend=info,tower_http=info".into()),
        )
        .init();

    // Load config
    if let Err(e) = AppConfig::init_global() {
        tracing::error!("Config init failed: {}", e);
        std::process::exit(1);
    }
    let config = AppConfig::global();

    // Shared state
    let store = match ObjectStore::from_config(config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("Object store init failed: {}", e);
            std::process::exit(1);
        }
    };
    let app_state = AppState {
        store,
        assets: Arc::new(AssetCache::new()),
        render_semaphore: Arc::new(Semaphore::new({
            let m = config.image.max_parallel as usize;
            if m == 0 { num_cpus::get() } else { m }
        })),
    };

    // Routes
    let mut app = Router::<AppState>::new()
        .route("/health", get(health_check))
        .merge(ogp::create_ogp_router())
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state);

    // 应用内响应压缩：对 HTML/JSON/文本启用 gzip/brotli。
    // 默认断言不压缩 image/* —— PNG 本身已压缩，再压只浪费 CPU。
    app = app.layer(CompressionLayer::new());

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Bind address failed {}: {}", addr, e);
            std::process::exit(1);
        });

    tracing::info!("Server: http://{}", addr);
    tracing::info!("Docs: http://{}/docs", addr);
    tracing::info!("Health: http://{}/health", addr);
    tracing::info!("Image API: http://{}/image/{{w}}/{{h}}/{{text}}", addr);
    tracing::info!("HTML API: http://{}/html/{{text}}/{{user}}/{{tree}}", addr);

    let graceful = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    if let Err(e) = graceful.await {
        tracing::error!("服务器运行错误: {}", e);
        std::process::exit(1);
    }

    tracing::info!("服务器已优雅关闭");
}
