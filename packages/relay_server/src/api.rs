use actix_web::{
    HttpRequest, HttpResponse, Result, get,
    web::{self, Json},
};
use chess_relay::server::WsServerHandle;
use serde_json::{Value, json};

use crate::{error::ApiError, ws::handler};

#[get("/")]
pub async fn index_endpoint() -> &'static str {
    "Server is running correctly"
}

#[get("/health")]
pub async fn health_endpoint(
    ws_server: web::Data<WsServerHandle>,
) -> Result<Json<Value>, ApiError> {
    let stats = ws_server.stats().await?;
    log::trace!("Healthy {stats:?}");

    Ok(Json(json!({
        "healthy": true,
        "connections": stats.connections,
        "rooms": stats.rooms,
    })))
}

#[allow(clippy::future_not_send)]
#[get("/ws")]
pub async fn websocket_endpoint(
    req: HttpRequest,
    stream: web::Payload,
    ws_server: web::Data<WsServerHandle>,
) -> Result<HttpResponse, actix_web::Error> {
    let (response, session, msg_stream) = actix_ws::handle(&req, stream)?;

    // spawn websocket handler (and don't await it) so that the response is returned immediately
    actix_web::rt::spawn(handler::handle_ws(
        ws_server.get_ref().clone(),
        session,
        msg_stream,
    ));

    Ok(response)
}

/// Fallback for every route that is not defined.
///
/// # Errors
///
/// * Always, with [`ApiError::NotFound`]
pub async fn not_found_endpoint(req: HttpRequest) -> Result<HttpResponse, ApiError> {
    Err(ApiError::NotFound(format!(
        "this {} route not defined",
        req.uri()
    )))
}
