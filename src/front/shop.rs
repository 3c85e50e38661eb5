//! Merchant pages served inside the platform's in-app browser.
//! Every route here requires a resolved visitor identity.

use ntex::web;
use serde_json::json;

use crate::front::{
    errors,
    middleware::visitor::WechatVisitor,
    session::{self, VisitorCache},
    templates, utils,
};

/// Quick-order storefront, greeting the resolved visitor
#[web::get("/quickbuy")]
async fn quickbuy(visitor: WechatVisitor) -> Result<impl web::Responder, web::Error> {
    let profile = visitor.0;

    let context = tera::Context::from_value(json!({
        "nickname": &profile.nickname,
        "openid": &profile.openid,
        "headimgurl": &profile.headimgurl,
    }))
    .unwrap_or_default();

    let content = templates::WEB_TEMPLATES
        .render("shop/quickbuy.html", &context)
        .map_err(|e| {
            errors::ServerError::TemplateError(format!(
                "at /weshop/quickbuy endpoint the template couldnt be rendered: {}",
                e
            ))
        })?;

    Ok(web::HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(content))
}

/// Drops the cached visitor profile; the next page view restarts the
/// authorization flow
#[web::get("/logout")]
async fn logout(cookie: ntex_session::Session) -> Result<impl web::Responder, web::Error> {
    session::CookieVisitorCache::new(cookie).clear();

    utils::redirect_to("/weshop/quickbuy")
}
