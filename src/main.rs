//! # Weshop WeChat Bridge
//!
//! Main entry point for the shop's WeChat Official Account bridge.
//! Wires the webhook callback, the OAuth visitor guard, and the session
//! middleware, and starts the web server (TLS in production).

#![recursion_limit = "256"]

pub mod config;
pub mod consts;
pub mod front;
pub mod logger;
pub mod services;
pub mod utils;
pub mod webhook;

use anyhow::Context;
use envconfig::Envconfig;
use ntex::web;
use ntex_session::CookieSession;
use openssl::ssl::{SslAcceptor, SslFiletype, SslMethod};

#[ntex::main]
async fn main() -> anyhow::Result<()> {
    let app_config = config::AppConfig::init_from_env()
        .context("failed to load application configuration from the environment")?;

    logger::setup_simple_logger()?;

    // Session cookies are re-keyed on every restart; cached visitor
    // profiles just get resolved again through the OAuth flow.
    let session_key = utils::build_random_cookie_key()?;

    configure_and_run_server(app_config, session_key).await
}

/// Configures SSL acceptor for production environments
fn setup_ssl_acceptor(
    app_config: &config::AppConfig,
) -> anyhow::Result<openssl::ssl::SslAcceptorBuilder> {
    let mut ssl_acceptor = SslAcceptor::mozilla_intermediate(SslMethod::tls_server())
        .map_err(|e| anyhow::anyhow!("Failed to create SSL acceptor: {}", e))?;

    ssl_acceptor
        .set_private_key_file(&app_config.private_key_path, SslFiletype::PEM)
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to load private key from {}: {}",
                app_config.private_key_path,
                e
            )
        })?;

    ssl_acceptor
        .set_certificate_file(&app_config.certificate_path, SslFiletype::PEM)
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to load certificate from {}: {}",
                app_config.certificate_path,
                e
            )
        })?;

    Ok(ssl_acceptor)
}

/// Creates application state from the configured clients
fn create_app_state(
    app_config: config::AppConfig,
    oauth: front::oauth::WechatOauth,
    crypto: webhook::wechat::crypto::WechatCrypto,
    bot: services::chatbot::BotHandler,
) -> front::AppState {
    front::AppState {
        config: app_config,
        oauth,
        crypto,
        bot: Box::new(bot),
    }
}

/// Configures and starts the web server with appropriate SSL settings
async fn configure_and_run_server(
    app_config: config::AppConfig,
    session_key: [u8; 32],
) -> anyhow::Result<()> {
    let server_addr = ("0.0.0.0", app_config.wep_server_port);

    let oauth = front::oauth::WechatOauth::new(&app_config);
    let crypto = webhook::wechat::crypto::WechatCrypto::new(&app_config)
        .context("failed to build the message envelope codec")?;
    let bot = services::chatbot::BotHandler::new(&app_config);

    let factory_config = app_config.clone();
    let server = web::server(move || {
        web::App::new()
            .wrap(
                CookieSession::private(&session_key)
                    .secure(factory_config.is_prod())
                    .domain(factory_config.wep_server_host.to_string())
                    .max_age(consts::MAX_AGE_COOKIES)
                    .name("weshop-session"),
            )
            .wrap(web::middleware::Logger::default())
            .wrap(web::middleware::Compress::default())
            .state(create_app_state(
                factory_config.clone(),
                oauth.clone(),
                crypto.clone(),
                bot.clone(),
            ))
            .configure(webhook::routes::wechat)
            .configure(front::routes::shop)
    });

    let bound_server = if app_config.is_prod() {
        let ssl_acceptor = setup_ssl_acceptor(&app_config)?;
        server.bind_openssl(server_addr, ssl_acceptor)?
    } else {
        server.bind(server_addr)?
    };

    bound_server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
