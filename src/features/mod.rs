/// OGP 预览图功能模块
pub mod ogp;
