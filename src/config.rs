use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 全局配置单例
static CONFIG: OnceCell<AppConfig> = OnceCell::new();

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8787,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 日志格式
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "full".to_string(),
        }
    }
}

/// 对象存储后端类型
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// 本地文件系统目录
    #[default]
    Fs,
    /// HTTP 回源（如对象存储桶的公开访问域名）
    Http,
}

/// 对象存储配置
///
/// 服务只依赖两个固定键：字体二进制与背景图。对象一经预置即视为不可变，
/// 因此首次取回后便缓存整个进程生命周期（见 `features::ogp::assets`）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 存储后端类型
    #[serde(default)]
    pub kind: StorageKind,
    /// 文件系统后端的根目录
    #[serde(default = "StorageConfig::default_root")]
    pub root: String,
    /// HTTP 后端的基地址（kind = "http" 时必填）
    #[serde(default)]
    pub base_url: Option<String>,
    /// 字体对象键
    #[serde(default = "StorageConfig::default_font_key")]
    pub font_key: String,
    /// 背景图对象键（PNG）
    #[serde(default = "StorageConfig::default_background_key")]
    pub background_key: String,
}

impl StorageConfig {
    fn default_root() -> String {
        "./resources".to_string()
    }

    fn default_font_key() -> String {
        "fonts/NotoSansJP-Regular.otf".to_string()
    }

    fn default_background_key() -> String {
        "images/sakura.png".to_string()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::default(),
            root: Self::default_root(),
            base_url: None,
            font_key: Self::default_font_key(),
            background_key: Self::default_background_key(),
        }
    }
}

/// OGP 页面 / 预览图配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OgpConfig {
    /// 预览图默认宽度（HTML 端点固定使用该尺寸）
    pub default_width: u32,
    /// 预览图默认高度
    pub default_height: u32,
    /// 对外可达的本服务 origin（构造 og:image 绝对地址用）。
    /// 留空则回退到请求的 Host 头。
    #[serde(default)]
    pub public_origin: Option<String>,
    /// 跳转目标站点 origin
    pub frontend_origin: String,
    /// og:description / twitter:description 文案
    pub description: String,
    /// twitter:site 账号
    pub twitter_site: String,
    /// 跳转前停留毫秒数
    pub redirect_delay_ms: u32,
}

impl Default for OgpConfig {
    fn default() -> Self {
        Self {
            default_width: 1200,
            default_height: 630,
            public_origin: None,
            frontend_origin: "https://dreamtree.pages.dev".to_string(),
            description: "桜と共に描かれたテキスト画像".to_string(),
            twitter_site: "@YourTwitterHandle".to_string(),
            redirect_delay_ms: 1000,
        }
    }
}

/// 图片渲染配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRenderConfig {
    /// 渲染速度优先（牺牲少量画质换取 CPU 开销下降）
    pub optimize_speed: bool,
    /// 并发渲染上限（0 表示取 CPU 核数）
    pub max_parallel: u32,
}

impl Default for ImageRenderConfig {
    fn default() -> Self {
        Self {
            optimize_speed: false,
            max_parallel: 0,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 对象存储配置
    #[serde(default)]
    pub storage: StorageConfig,
    /// OGP 页面配置
    #[serde(default)]
    pub ogp: OgpConfig,
    /// 图片渲染配置
    #[serde(default)]
    pub image: ImageRenderConfig,
}

impl AppConfig {
    /// 从配置文件加载配置，支持环境变量覆盖
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path();

        tracing::info!("正在从 {:?} 加载配置文件", config_path);

        let builder = ConfigBuilder::builder()
            // 配置文件可缺省（全部字段都有默认值）
            .add_source(File::with_name(config_path.to_str().unwrap()).required(false))
            // 支持环境变量覆盖，例如：APP_SERVER_PORT
            .add_source(
                Environment::with_prefix("APP")
                    .separator("_")
                    .try_parsing(true),
            )
            .build()?;

        builder.try_deserialize()
    }

    /// 获取全局配置单例。未显式初始化时退回默认配置（测试场景）。
    pub fn global() -> &'static AppConfig {
        CONFIG.get_or_init(AppConfig::default)
    }

    /// 初始化全局配置
    pub fn init_global() -> Result<(), ConfigError> {
        let config = Self::load()?;
        CONFIG
            .set(config)
            .map_err(|_| ConfigError::Message("配置已经被初始化".to_string()))?;
        Ok(())
    }

    /// 获取配置文件路径
    fn get_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 文件系统存储后端的根目录
    pub fn storage_root(&self) -> PathBuf {
        PathBuf::from(&self.storage.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_ogp_dimensions() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.ogp.default_width, 1200);
        assert_eq!(cfg.ogp.default_height, 630);
        assert_eq!(cfg.ogp.redirect_delay_ms, 1000);
    }

    #[test]
    fn storage_defaults_point_at_provisioned_objects() {
        let cfg = StorageConfig::default();
        assert_eq!(cfg.kind, StorageKind::Fs);
        assert_eq!(cfg.font_key, "fonts/NotoSansJP-Regular.otf");
        assert_eq!(cfg.background_key, "images/sakura.png");
    }
}
