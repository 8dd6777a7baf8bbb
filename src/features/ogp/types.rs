use serde::{Deserialize, Serialize};

/// 单次预览图渲染请求（每请求一份，不持久化）。
///
/// `text` 必须是已完成百分号解码的原文；路由层负责解码。
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RenderRequest {
    /// 输出宽度（正整数像素）
    pub width: u32,
    /// 输出高度（正整数像素）
    pub height: u32,
    /// 要绘制的文本
    pub text: String,
}
