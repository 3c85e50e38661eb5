pub mod errors;
pub mod middleware;
pub mod oauth;
pub mod routes;
pub mod session;
pub mod shop;
pub mod templates;
pub mod utils;

use crate::{config, services, webhook};

pub struct AppState {
    pub config: config::AppConfig,
    pub oauth: oauth::WechatOauth,
    pub crypto: webhook::wechat::crypto::WechatCrypto,
    pub bot: services::ImplReplyGenerator,
}
