// ============================================================
// src/main.rs — payment-gateway (Rust + Actix-web)
// ============================================================
// Thin HTTP front for Stripe. No payment data is stored here: every
// request is resolved against the provider and reshaped for the client.

use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use log::{error, info};

use payment_gateway::metrics::Metrics;
use payment_gateway::provider::StripeClient;
use payment_gateway::{configure, AppState, Config};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| {
        error!("[payment-gateway] {e}");
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;
    let metrics = Metrics::new().map_err(io::Error::other)?;

    let provider = StripeClient::new(config.secret_key.clone(), config.api_base.clone());
    let state = web::Data::new(AppState {
        provider: Arc::new(provider),
        publishable_key: config.publishable_key.clone(),
        metrics,
    });

    let addr = config.bind_addr();
    info!("[payment-gateway] Listening on {addr}");

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .wrap(Cors::permissive())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind(&addr)?
    .run()
    .await
}
