//! Route table.
//!
//! The REST surface sits behind the bearer-token middleware; the
//! WebSocket endpoint and the health check are open (the socket
//! authenticates in-band).

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::backend::messaging::handlers as messages;
use crate::backend::middleware::auth::auth_middleware;
use crate::backend::realtime::ws::ws_handler;
use crate::backend::server::AppState;

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/messages", post(messages::post_message))
        .route(
            "/api/messages/{other_user_id}",
            get(messages::get_conversation),
        )
        .route(
            "/api/messages/{message_id}/delivered",
            patch(messages::patch_delivered),
        )
        .route(
            "/api/messages/{message_id}/seen",
            patch(messages::patch_seen),
        )
        .route("/api/presence/{user_id}", get(messages::get_presence))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(|| async { "ok" }))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
