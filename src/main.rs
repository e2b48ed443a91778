use crate::config::Config;
use crate::policy::UploadPolicy;
use crate::storage::FilesStorage;
use actix_web::{App, HttpServer, middleware::Logger, web};

mod config;
mod errors;
mod handlers;
mod models;
mod policy;
mod storage;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(std::io::Error::other)?;
    let storage = FilesStorage::new(&config.upload_dir, &config.base_url);
    let policy = web::Data::new(UploadPolicy::from_config(&config));

    // actix-files wants the root to exist when the service is built
    std::fs::create_dir_all(storage.upload_dir())?;

    let upload_dir = config.upload_dir.clone();
    log::info!(
        "server started at http://localhost:{} (public base {})",
        config.port,
        config.base_url
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(handlers::cors_headers())
            .app_data(web::Data::new(storage.clone()))
            .app_data(policy.clone())
            .configure(|cfg| handlers::routes(cfg, &upload_dir))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
