use actix_session::config::PersistentSession;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::{time::Duration as CookieDuration, Key};
use actix_web::http::StatusCode;
use actix_web::middleware::{ErrorHandlers, Logger};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use env_logger::Env;
use std::sync::Arc;
use yablog::cache::SystemClock;
use yablog::config::Config;
use yablog::db::{create_schema, init_db};
use yablog::middleware::ClientCtx;
use yablog::session::MainData;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_lib_mods();

    let config = Config::from_env().context("invalid configuration")?;
    let pool = init_db(&config.database_url)
        .await
        .context("failed to connect to the database")?;
    create_schema(&pool)
        .await
        .context("failed to create the database schema")?;
    std::fs::create_dir_all(&config.media_root)
        .with_context(|| format!("failed to create {}", config.media_root.display()))?;

    let secret_key = match &config.secret_key {
        Some(secret) => Key::try_from(secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("SECRET_KEY is unusable: {}", e))?,
        None => {
            log::warn!("SECRET_KEY is not set; sessions will not survive a restart.");
            Key::generate()
        }
    };

    let bind_address = config.bind_address.to_owned();
    let data = Data::new(MainData::new(pool, config, Arc::new(SystemClock)));
    log::info!("listening on http://{}", bind_address);

    HttpServer::new(move || {
        let session_ttl = CookieDuration::minutes(data.config.session_time);

        // Order of middleware IS IMPORTANT and is in REVERSE EXECUTION ORDER.
        // However, services are read top->down, higher traffic routes should be
        // placed higher
        App::new()
            .app_data(data.clone())
            .wrap(
                ErrorHandlers::new()
                    .handler(StatusCode::NOT_FOUND, yablog::web::error::render_404)
                    .handler(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        yablog::web::error::render_500,
                    ),
            )
            .wrap(ClientCtx::default())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
                    .cookie_secure(data.config.cookie_secure)
                    .session_lifecycle(PersistentSession::default().session_ttl(session_ttl))
                    .build(),
            )
            .wrap(Logger::new("%a \"%r\" %s %b \"%{User-Agent}i\" %T"))
            .configure(yablog::web::configure)
            .service(actix_files::Files::new("/media", data.media.root()))
    })
    .bind(bind_address)?
    .run()
    .await?;

    Ok(())
}

/// Initialize third party crates we rely on but don't have control over.
pub fn init_lib_mods() {
    // A missing .env is fine; the environment may already be set.
    if let Err(e) = dotenv::dotenv() {
        eprintln!("dotenv: {}", e);
    }
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}
