use ntex::{
    http::Payload,
    web::{Error, FromRequest, HttpRequest},
};
use ntex_session::UserSession;

use crate::front::{AppState, errors, oauth, session};

/// Resolved visitor identity. Declaring this extractor on a route only runs
/// the handler once the OAuth flow has produced a profile; until then the
/// request terminates in the authorization redirect or a rejection.
pub struct WechatVisitor(pub session::UserProfile);

fn query_param(query: &str, name: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        pair.strip_prefix(name)
            .and_then(|rest| rest.strip_prefix('='))
            .map(|value| value.to_string())
    })
}

impl<Err> FromRequest<Err> for WechatVisitor {
    type Error = Error;

    fn from_request(
        req: &HttpRequest,
        _: &mut Payload,
    ) -> impl std::future::Future<Output = Result<Self, Self::Error>> {
        let cookie_session = req.get_session();
        let state = req
            .app_state::<AppState>()
            .map(|state| (state.oauth.clone(), state.config.clone()));
        let uri = req.uri().clone();

        async move {
            let Some((oauth_client, app_config)) = state else {
                return Err(errors::ServerError::InternalServerError(
                    "visitor guard used without app state".into(),
                )
                .into());
            };

            let cache = session::CookieVisitorCache::new(cookie_session);
            let code = uri.query().and_then(|query| query_param(query, "code"));
            // the post-authorization callback lands on the guarded URL itself
            let current_url = format!("{}{}", app_config.base_url(), uri);

            match oauth::resolve_visitor(&cache, &oauth_client, code.as_deref(), &current_url)
                .await
            {
                Ok(profile) => Ok(Self(profile)),
                Err(oauth::VisitorResolveError::RedirectToAuthorize(url)) => {
                    Err(errors::UserError::RedirectToAuthorize(url).into())
                }
                Err(oauth::VisitorResolveError::ExchangeFailed(msg)) => {
                    log::warn!("oauth exchange failed: {}", msg);
                    Err(errors::UserError::Forbidden.into())
                }
                Err(oauth::VisitorResolveError::SessionError(msg)) => {
                    Err(errors::ServerError::InternalServerError(msg).into())
                }
            }
        }
    }
}
