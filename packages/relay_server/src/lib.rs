//! HTTP and WebSocket front end for the chess match relay.
//!
//! Serves the relay protocol on `GET /ws`, plus `GET /` and `GET /health`.
//! Unknown routes are answered with the [`error::ApiError`] envelope.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

pub mod api;
pub mod config;
pub mod cors;
pub mod error;
pub mod ws;

use actix_web::{App, HttpServer, middleware, web};
use chess_relay::server::WsServer;
use tokio::try_join;

use crate::config::ServerConfig;

pub fn bind_services(cfg: &mut web::ServiceConfig) {
    cfg.service(api::index_endpoint)
        .service(api::health_endpoint)
        .service(api::websocket_endpoint);
}

/// Runs the relay until the HTTP server stops.
///
/// # Errors
///
/// * If the server fails to bind
/// * If the server fails during execution
pub async fn run(config: ServerConfig) -> std::io::Result<()> {
    let (ws_server, ws_server_handle) = WsServer::new();
    let ws_server_join = tokio::spawn(ws_server.run());

    let app = {
        let ws_server_data = web::Data::new(ws_server_handle.clone());
        let allowed_origins = config.allowed_origins.clone();

        move || {
            App::new()
                .wrap(cors::cors(&allowed_origins))
                .wrap(middleware::Logger::default())
                .wrap(middleware::Compress::default())
                .app_data(ws_server_data.clone())
                .configure(bind_services)
                .default_service(web::to(api::not_found_endpoint))
        }
    };

    let mut http_server = HttpServer::new(app);

    if let Some(workers) = config.actix_workers {
        log::debug!("Running with {workers} Actix workers");
        http_server = http_server.workers(workers);
    }

    log::info!("Listening on {}:{}", config.bind_addr, config.port);

    let http_server = http_server
        .bind((config.bind_addr.as_str(), config.port))?
        .run();

    if let Err(err) = try_join!(
        async move {
            let resp = http_server.await;

            log::debug!("Shutting down ws server...");
            ws_server_handle.shutdown();

            resp
        },
        async move {
            let resp = ws_server_join.await.map_err(std::io::Error::other)?;
            log::debug!("WsServer stopped");
            resp
        },
    ) {
        log::error!("Error on shutdown: {err:?}");
        return Err(err);
    }

    log::debug!("Server shut down");

    Ok(())
}
