use super::templates;
use derive_more::{Display, Error};
use log::{error, warn};
use ntex::{http, web};

/// Request-level failures, each resolving to its own HTTP response.
/// Authenticity failures are terminal for the request and never retried.
#[derive(Debug, Display, Error)]
pub enum UserError {
    /// Hard rejection: failed handshake/envelope authenticity or OAuth
    /// exchange. Empty 403 body, nothing else is produced.
    Forbidden,
    /// Message delivery that cannot be attributed to a visitor. Soft
    /// failure: a rendered forbidden page instead of a bare 403.
    MissingIdentity,
    /// Visitor has no resolved identity yet; send them to the platform
    /// authorization page.
    RedirectToAuthorize(#[error(not(source))] String),
}

impl web::error::WebResponseError for UserError {
    fn error_response(&self, _: &web::HttpRequest) -> web::HttpResponse {
        warn!("{:#?}", self);

        match self {
            UserError::Forbidden => web::HttpResponse::Forbidden().finish(),
            UserError::MissingIdentity => web::HttpResponse::Ok()
                .content_type("text/html; charset=utf-8")
                .body(
                    templates::WEB_TEMPLATES
                        .render("403.html", &tera::Context::new())
                        .unwrap_or(self.to_string()),
                ),
            UserError::RedirectToAuthorize(url) => web::HttpResponse::Found()
                .set_header("location", url.as_str())
                .finish(),
        }
    }

    fn status_code(&self) -> http::StatusCode {
        match *self {
            UserError::Forbidden => http::StatusCode::FORBIDDEN,
            UserError::MissingIdentity => http::StatusCode::OK,
            UserError::RedirectToAuthorize(_) => http::StatusCode::FOUND,
        }
    }
}

#[derive(Debug, Display, Error)]
pub enum ServerError {
    TemplateError(#[error(not(source))] String),
    InternalServerError(#[error(not(source))] String),
}

impl ServerError {
    fn get_error_message(&self) -> String {
        match self {
            ServerError::TemplateError(msg) => format!("[TemplateError] {:#?}", msg),
            ServerError::InternalServerError(msg) => format!("[InternalServerError] {:#?}", msg),
        }
    }
}

impl web::error::WebResponseError for ServerError {
    fn error_response(&self, _: &web::HttpRequest) -> web::HttpResponse {
        error!("{}", self.get_error_message());

        web::HttpResponse::build(self.status_code())
            .set_header("content-type", "text/html; charset=utf-8")
            .body(
                templates::WEB_TEMPLATES
                    .render("errors/internal_error.html", &tera::Context::new())
                    .unwrap_or(self.to_string()),
            )
    }

    fn status_code(&self) -> http::StatusCode {
        http::StatusCode::INTERNAL_SERVER_ERROR
    }
}
