mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};

use crate::api::DynAPI;
use crate::engine::Engine;
use crate::server::handlers::{auth, bookings, channel, drivers};

pub fn router(engine: Engine) -> Router {
    let engine = Arc::new(engine);
    let api = engine.clone() as DynAPI;

    Router::new()
        .route("/api/auth/token", post(auth::issue))
        .route("/api/bookings/create", post(bookings::create))
        .route("/api/bookings/available", get(bookings::available))
        .route("/api/bookings/:id", get(bookings::find))
        .route("/api/bookings/:id/offers", get(bookings::offers))
        .route("/api/bookings/:id/offer", post(bookings::offer))
        .route(
            "/api/bookings/:id/select-driver",
            post(bookings::select_driver),
        )
        .route("/api/bookings/:id/cancel", post(bookings::cancel))
        .route("/api/bookings/:id/complete", post(bookings::complete))
        .route("/api/drivers/profile", get(drivers::profile))
        .route("/ws", get(channel::upgrade))
        .layer(Extension(api))
        .layer(Extension(engine))
}

pub async fn serve(engine: Engine, addr: SocketAddr) {
    let app = router(engine);

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .unwrap();
}
