//! Cross-origin gate for the HTTP API and the WebSocket upgrade.

use actix_cors::Cors;
use actix_web::http;

use crate::config::AllowedOrigins;

#[must_use]
pub fn cors(allowed_origins: &AllowedOrigins) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PATCH", "PUT", "DELETE"])
        .allowed_headers(vec![
            http::header::AUTHORIZATION,
            http::header::ACCEPT,
            http::header::CONTENT_TYPE,
        ])
        .supports_credentials()
        .max_age(3600);

    match allowed_origins {
        AllowedOrigins::Any => cors.allow_any_origin(),
        AllowedOrigins::List(origins) => origins
            .iter()
            .fold(cors, |cors, origin| cors.allowed_origin(origin)),
    }
}
