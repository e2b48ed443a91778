pub mod files;

use actix_files::Files;
use actix_web::http::header::{self, CacheControl, CacheDirective};
use actix_web::middleware::DefaultHeaders;
use actix_web::web;
use std::path::Path;

/// 365 days.
const STATIC_MAX_AGE_SECS: u32 = 365 * 24 * 60 * 60;

pub fn routes(cfg: &mut web::ServiceConfig, upload_dir: &Path) {
    cfg.route("/upload", web::post().to(files::upload_file))
        .service(
            web::scope("/uploads")
                .wrap(DefaultHeaders::new().add((
                    header::CACHE_CONTROL,
                    CacheControl(vec![
                        CacheDirective::Public,
                        CacheDirective::MaxAge(STATIC_MAX_AGE_SECS),
                    ])
                    .to_string(),
                )))
                .service(Files::new("", upload_dir)),
        );
}

/// Permissive CORS headers attached to every response.
pub fn cors_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .add((header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST"))
        .add((
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            "Content-Type, Authorization, Content-Length, X-Requested-With",
        ))
}
