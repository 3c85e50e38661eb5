//! Frontend route configuration module.

use super::shop;
use ntex::web;

/// Configures the merchant shop routes.
///
/// All routes in this scope are guarded by the visitor resolver: a request
/// only reaches its handler with a profile cached for the browser session.
///
/// # Routes
/// - `GET /weshop/quickbuy` - quick-order storefront
/// - `GET /weshop/logout` - clear the cached visitor profile
pub fn shop(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/weshop").service((shop::quickbuy, shop::logout)));
}
