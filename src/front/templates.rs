use std::sync::LazyLock;
use tera::Tera;

pub static WEB_TEMPLATES: LazyLock<Tera> =
    LazyLock::new(|| Tera::new("web/templates/**/*.html").unwrap());
