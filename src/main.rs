use actix_files::Files;
use actix_web::{middleware, web, web::Data, App, HttpServer};
use envconfig::Envconfig;
use log::info;

use pharmaledger::{config::Config, db, routes, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::init_from_env().map_err(|e| {
        log::error!("FATAL: invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;
    config.ensure_upload_dirs()?;

    let db_pool = db::connect(&config.database_url).await?;
    db::migrate(&db_pool).await?;
    info!("Database migrated successfully");

    let bind = (config.host.clone(), config.port);
    info!("Starting HTTP server on http://{}:{}/", bind.0, bind.1);

    let state = AppState { db_pool, config };
    HttpServer::new(move || {
        App::new()
            // enable automatic response compression - usually register this first
            .wrap(middleware::Compress::default())
            // enable logger - always register Actix Web Logger middleware last
            .wrap(middleware::Logger::default())
            .app_data(Data::new(state.clone()))
            .configure(routes::configure)
            .service(Files::new("/static", state.config.static_dir.clone()))
            .default_service(web::to(routes::default_handler))
    })
    .bind(bind)?
    .run()
    .await
}
