use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use tracing_actix_web::TracingLogger;

use medportal::config::Settings;
use medportal::crypto::CredentialHasher;
use medportal::storage::{self, Storage};
use medportal::{routes, telemetry};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load configuration")?;
    telemetry::init(&settings.log);

    // create storage backend (connection pool for postgres)
    let store: Arc<dyn Storage> =
        storage::connect(&settings.database).context("failed to open storage")?;
    let store = web::Data::from(store);

    let hasher = CredentialHasher::new(&settings.auth).context("invalid auth settings")?;
    let hasher = web::Data::new(hasher);

    let bind = (settings.server.host.clone(), settings.server.port);
    tracing::info!(host = %bind.0, port = bind.1, "starting server");

    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(store.clone())
            .app_data(hasher.clone())
            .configure(routes::configure)
    })
    .bind(bind)?
    .run()
    .await?;
    Ok(())
}
