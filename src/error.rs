use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// 应用统一错误类型
///
/// 对外契约：错误响应一律为 text/plain（OGP 抓取方通常不解析 JSON 错误体），
/// 状态码按变体映射。所有错误对当前请求都是终态，内部不做任何重试。
#[derive(Error, Debug)]
pub enum AppError {
    /// 预置资源（字体 / 背景图）在对象存储中缺失
    #[error("必需资源未就绪: {0}")]
    AssetUnavailable(String),

    /// 矢量阶段错误（字体数据损坏、几何参数非法、SVG 解析失败）
    #[error("图像渲染错误: {0}")]
    Render(String),

    /// 栅格化 / PNG 编码错误。上游矢量图已经过校验，理论上不应触发，
    /// 但该边界仍然保持防御性。
    #[error("图像编码错误: {0}")]
    Encode(String),

    /// 参数校验错误（如宽高为 0）。宽高缺失或非法必须直接拒绝，
    /// 绝不静默替换为默认尺寸。
    #[error("参数校验错误: {0}")]
    Validation(String),

    /// 对象存储访问失败（HTTP 后端网络错误等，区别于"对象不存在"）
    #[error("存储访问错误: {0}")]
    Network(String),

    /// 内部服务器错误
    #[error("内部错误: {0}")]
    Internal(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::AssetUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Network(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.to_string();

        let mut res = (status, body).into_response();
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        res
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}
