use axum::{
    Router,
    extract::{Host, Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse},
    routing::get,
};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::state::AppState;

use super::page::{OgpPage, render_page};
use super::renderer;
use super::types::RenderRequest;

/// OGP 功能路由：预览图 + HTML 跳转壳。
///
/// 未识别路径统一走 fallback，返回 400 纯文本。
pub fn create_ogp_router() -> Router<AppState> {
    Router::new()
        .route("/image/:width/:height/:text", get(render_image))
        .route("/html/:text/:user_id/:tree_id", get(ogp_page))
        .fallback(invalid_endpoint)
}

async fn invalid_endpoint() -> (StatusCode, &'static str) {
    (StatusCode::BAD_REQUEST, "Invalid endpoint")
}

#[utoipa::path(
    get,
    path = "/image/{width}/{height}/{text}",
    summary = "生成 OGP 预览图",
    description = "按给定尺寸与文本合成预览图：白底容器 + cover 铺满的背景图 + 自适应字号的居中文本，输出 PNG。",
    params(
        ("width" = u32, Path, description = "输出宽度（正整数像素）"),
        ("height" = u32, Path, description = "输出高度（正整数像素）"),
        ("text" = String, Path, description = "要绘制的文本（URL 编码）")
    ),
    responses(
        (status = 200, description = "PNG bytes", content_type = "image/png"),
        (status = 400, description = "非法尺寸", body = String),
        (status = 500, description = "资源缺失或渲染失败", body = String)
    ),
    tag = "Ogp"
)]
pub async fn render_image(
    State(state): State<AppState>,
    Path((width, height, text)): Path<(u32, u32, String)>,
) -> Result<impl IntoResponse, AppError> {
    // 尺寸非法直接拒绝，绝不替换为默认值
    if width == 0 || height == 0 {
        return Err(AppError::Validation(format!(
            "宽高必须为正整数: {width}x{height}"
        )));
    }

    let cfg = AppConfig::global();
    let assets = state.assets.get_or_fetch(&state.store, &cfg.storage).await?;

    // 限制并发渲染数量；permit 覆盖整个阻塞渲染过程
    let _permit = state
        .render_semaphore
        .acquire()
        .await
        .map_err(|e| AppError::Internal(format!("渲染信号量已关闭: {e}")))?;

    let request = RenderRequest {
        width,
        height,
        text,
    };
    let png = renderer::render_preview_async(request, assets).await?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("image/png")),
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static("max-age=604800"),
            ),
        ],
        png,
    ))
}

#[utoipa::path(
    get,
    path = "/html/{text}/{user_id}/{tree_id}",
    summary = "生成 OGP 跳转页",
    description = "输出带 Open-Graph / Twitter 卡片 meta 标签的 HTML 壳，延时后跳转到目标页面。",
    params(
        ("text" = String, Path, description = "预览标题文本（URL 编码）"),
        ("user_id" = String, Path, description = "目标用户 ID"),
        ("tree_id" = String, Path, description = "目标树 ID")
    ),
    responses(
        (status = 200, description = "HTML page", content_type = "text/html")
    ),
    tag = "Ogp"
)]
pub async fn ogp_page(
    Host(host): Host,
    Path((text, user_id, tree_id)): Path<(String, String, String)>,
) -> Result<Html<String>, AppError> {
    let ogp = &AppConfig::global().ogp;
    let origin = ogp
        .public_origin
        .clone()
        .unwrap_or_else(|| format!("https://{host}"));

    let html = render_page(&OgpPage {
        text: &text,
        user_id: &user_id,
        tree_id: &tree_id,
        origin: &origin,
    })?;
    Ok(Html(html))
}
