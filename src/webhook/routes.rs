use ntex::web;

/// Configures the WeChat platform callback route.
///
/// The platform calls one URL for both the server-verification handshake
/// and message delivery.
///
/// # Routes
/// - `GET /check` - server URL verification handshake
/// - `POST /check` - encrypted message delivery
pub fn wechat(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/check").service((super::wechat::verify, super::wechat::receive)));
}
