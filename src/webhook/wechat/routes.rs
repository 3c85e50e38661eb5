//! WeChat webhook endpoint handlers
//!
//! This module handles the platform's callbacks: the GET verification
//! handshake and the POST delivery of encrypted messages.
//!
//! # Security
//!
//! Every request must pass the outer handshake signature before anything
//! else happens; POST bodies additionally pass the envelope codec's inner
//! signature and app-id checks during decryption. A failure of either check
//! rejects the request with 403 and no partial output.

use super::{handler, message::DecryptedMessage, security};
use crate::front::{AppState, errors};
use ntex::{util::Bytes, web};
use serde::Deserialize;

/// Query parameters the platform sends to the callback URL.
/// GET carries `echostr`; POST carries `msg_signature` and `openid`.
#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub nonce: String,
    #[serde(default)]
    pub echostr: String,
    #[serde(default)]
    pub encrypt_type: String,
    #[serde(default)]
    pub msg_signature: String,
    #[serde(default)]
    pub openid: Option<String>,
}

/// Webhook verification endpoint (GET)
///
/// The platform sends a GET request when the callback URL is configured;
/// echoing `echostr` verbatim completes the handshake.
///
/// # Returns
/// - 200 with the echo string if the signature is valid
/// - 403 otherwise
#[web::get("")]
pub async fn verify(
    query: web::types::Query<CheckQuery>,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    log::debug!(
        "handshake signature: {} timestamp: {} nonce: {} encrypt_type: {}",
        query.signature,
        query.timestamp,
        query.nonce,
        query.encrypt_type
    );

    if !security::verify_signature(
        &app_state.config.wechat_token,
        &query.signature,
        &query.timestamp,
        &query.nonce,
    ) {
        return Err(errors::UserError::Forbidden.into());
    }

    Ok(web::HttpResponse::Ok()
        .content_type("text/plain")
        .body(query.echostr.clone()))
}

/// Message delivery endpoint (POST)
///
/// Runs one request end-to-end: outer signature, openid attribution,
/// envelope decryption, reply routing, reply encryption. The encrypted
/// reply envelope is the response body.
#[web::post("")]
pub async fn receive(
    query: web::types::Query<CheckQuery>,
    body: Bytes,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    if !security::verify_signature(
        &app_state.config.wechat_token,
        &query.signature,
        &query.timestamp,
        &query.nonce,
    ) {
        return Err(errors::UserError::Forbidden.into());
    }

    let Some(openid) = query.openid.as_deref() else {
        log::warn!("message delivery NOT carrying openid");
        return Err(errors::UserError::MissingIdentity.into());
    };
    log::debug!("openid: {}", openid);

    let plaintext = app_state
        .crypto
        .decrypt_message(&body, &query.msg_signature, &query.timestamp, &query.nonce)
        .map_err(|e| {
            log::warn!("envelope decryption rejected: {}", e);
            errors::UserError::Forbidden
        })?;

    let msg = DecryptedMessage::parse(&plaintext).map_err(|e| {
        log::warn!("decrypted payload rejected: {}", e);
        errors::UserError::Forbidden
    })?;

    let reply = handler::route_message(&msg, &app_state.bot).await;

    let envelope = app_state
        .crypto
        .encrypt_message(&reply.render(), &query.nonce, &query.timestamp)
        .map_err(|e| {
            errors::ServerError::InternalServerError(format!("at reply encryption: {}", e))
        })?;

    Ok(web::HttpResponse::Ok()
        .content_type("text/xml")
        .body(envelope))
}
