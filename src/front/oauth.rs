//! WeChat OAuth visitor resolution.
//!
//! The platform's OAuth dialect is not RFC-shaped: the token endpoint takes
//! `appid`/`secret`/`code` as query parameters, the token response carries
//! the visitor's `openid`, and failures come back as HTTP 200 bodies with an
//! `errcode` field. The flow is therefore implemented directly over the
//! HTTP client.

use async_trait::async_trait;
use derive_more::{Display, Error};
use serde::de::DeserializeOwned;

use crate::{config, consts, front::session};
use anyhow::{Context, bail};

/// Token-endpoint response; the openid rides along with the token
#[derive(serde::Deserialize, Clone, Debug)]
pub struct AccessToken {
    pub access_token: String,
    pub openid: String,
}

/// Seam over the platform OAuth endpoints so the resolver can be exercised
/// without the network.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OauthExchange {
    /// Authorization URL sending the visitor back to `redirect_uri`
    fn authorize_url(&self, redirect_uri: &str) -> String;

    /// Exchanges an authorization code for an access token + openid
    async fn fetch_access_token(&self, code: &str) -> anyhow::Result<AccessToken>;

    /// Fetches the visitor profile for a freshly exchanged token
    async fn fetch_user_info(&self, token: &AccessToken) -> anyhow::Result<session::UserProfile>;
}

/// OAuth client for one Official Account deployment
#[derive(Clone)]
pub struct WechatOauth {
    client: reqwest::Client,
    app_id: String,
    app_secret: String,
}

impl WechatOauth {
    pub fn new(app_config: &config::AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            app_id: app_config.wechat_app_id.clone(),
            app_secret: app_config.wechat_app_secret.clone(),
        }
    }

    /// GETs a platform endpoint and surfaces `errcode` bodies as errors
    async fn get_api_json<T: DeserializeOwned>(&self, url: String) -> anyhow::Result<T> {
        let value: serde_json::Value = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send request to WeChat API")?
            .json()
            .await
            .context("Failed to parse WeChat API response")?;

        if let Some(errcode) = value.get("errcode").and_then(serde_json::Value::as_i64) {
            if errcode != 0 {
                bail!(
                    "WeChat API error {}: {}",
                    errcode,
                    value
                        .get("errmsg")
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or("unknown")
                );
            }
        }

        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl OauthExchange for WechatOauth {
    fn authorize_url(&self, redirect_uri: &str) -> String {
        format!(
            "{endpoint}?appid={app_id}&redirect_uri={redirect_uri}\
             &response_type=code&scope={scope}&state={state}#wechat_redirect",
            endpoint = consts::WECHAT_ENDPOINT_AUTHORIZE,
            app_id = self.app_id,
            redirect_uri = urlencoding::encode(redirect_uri),
            scope = consts::OAUTH_SCOPE,
            state = consts::OAUTH_STATE,
        )
    }

    async fn fetch_access_token(&self, code: &str) -> anyhow::Result<AccessToken> {
        self.get_api_json(format!(
            "{endpoint}?appid={app_id}&secret={secret}&code={code}&grant_type=authorization_code",
            endpoint = consts::WECHAT_ENDPOINT_ACCESS_TOKEN,
            app_id = self.app_id,
            secret = self.app_secret,
        ))
        .await
    }

    async fn fetch_user_info(&self, token: &AccessToken) -> anyhow::Result<session::UserProfile> {
        self.get_api_json(format!(
            "{endpoint}?access_token={access_token}&openid={openid}&lang=zh_CN",
            endpoint = consts::WECHAT_ENDPOINT_USER_INFO,
            access_token = token.access_token,
            openid = token.openid,
        ))
        .await
    }
}

/// Why a request could not proceed with a resolved visitor
#[derive(Debug, Display, Error)]
pub enum VisitorResolveError {
    /// No cached profile and no authorization code: the visitor must be
    /// sent to this authorization URL first
    RedirectToAuthorize(#[error(not(source))] String),
    /// Code exchange or profile fetch failed; the visitor has to restart
    /// the authorization flow
    ExchangeFailed(#[error(not(source))] String),
    SessionError(#[error(not(source))] String),
}

/// Per-request visitor resolution.
///
/// A cached profile passes through untouched (no network). Otherwise an
/// authorization code is exchanged and the profile cached; without a code
/// the request terminates in a redirect to the authorization URL built
/// around the request's own URL.
pub async fn resolve_visitor(
    cache: &dyn session::VisitorCache,
    oauth: &dyn OauthExchange,
    code: Option<&str>,
    current_url: &str,
) -> Result<session::UserProfile, VisitorResolveError> {
    match cache.get() {
        Ok(Some(profile)) => return Ok(profile),
        Ok(None) => {}
        Err(e) => return Err(VisitorResolveError::SessionError(e.to_string())),
    }

    let Some(code) = code else {
        let authorize_url = oauth.authorize_url(current_url);
        log::debug!("code NOT present, redirect to {}", authorize_url);
        return Err(VisitorResolveError::RedirectToAuthorize(authorize_url));
    };

    log::debug!("get access token...");
    let token = oauth.fetch_access_token(code).await.map_err(|e| {
        VisitorResolveError::ExchangeFailed(format!("at access token exchange: {:#}", e))
    })?;

    log::debug!("get user info...");
    let profile = oauth.fetch_user_info(&token).await.map_err(|e| {
        VisitorResolveError::ExchangeFailed(format!("at user info fetch: {:#}", e))
    })?;

    cache
        .set(&profile)
        .map_err(|e| VisitorResolveError::SessionError(e.to_string()))?;

    Ok(profile)
}
