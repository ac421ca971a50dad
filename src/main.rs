use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};

mod api;
mod clock;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod payroll;
mod routes;
mod state;
mod store;
mod utils;

use clock::{Clock, SystemClock};
use config::Config;
use db::init_db;
use state::AppState;
use store::{Store, memory::MemoryStore, mysql::MySqlStore};
use utils::api_cache::ApiCache;

use crate::docs::ApiDoc;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "ISP payroll service is running"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let store = match &config.database_url {
        Some(url) => Store::MySql(MySqlStore::new(init_db(url).await?)),
        None => {
            warn!("DATABASE_URL not set, data lives in memory and is lost on restart");
            Store::Memory(MemoryStore::default())
        }
    };
    info!(backend = store.backend_name(), "Storage ready");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = ApiCache::new(
        config.cache_max_capacity,
        config.cache_ttl_secs,
        clock.clone(),
    );
    let state = Data::new(AppState {
        store,
        cache,
        clock,
    });

    let limiter = Arc::new(routes::build_limiter(config.rate_api_per_min)?);
    let api_prefix = config.api_prefix.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(state.clone())
            .service(index)
            .service(routes::api_scope(&api_prefix).wrap(limiter.clone()))
    })
    .bind(&config.server_addr)?
    .run()
    .await?;

    Ok(())
}
