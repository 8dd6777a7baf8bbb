use once_cell::sync::OnceCell;
use reqwest::Client;
use std::time::Duration;

/// 全局复用的 HTTP Client（统一连接池/Keep-Alive），避免每次请求重复创建。
///
/// `Client` 本身是线程安全的，适合全局复用。对象存储取回属于短请求，
/// 统一使用 30s 超时。
static CLIENT_TIMEOUT_30S: OnceCell<Client> = OnceCell::new();

/// timeout=30s 的 HTTP Client（用于对象存储取回等短请求）。
pub fn client_timeout_30s() -> Result<&'static Client, reqwest::Error> {
    CLIENT_TIMEOUT_30S
        .get_or_try_init(|| Client::builder().timeout(Duration::from_secs(30)).build())
}
