//! REST surface over the services, plus the scoreboard websocket.

mod auth;
mod catalog;
pub mod dto;
mod lives;
mod response;
mod scheduling;
mod scoreboard;

pub use response::{ApiError, Credential, Envelope};

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::AdminGate;
use crate::scoreboard::ScoreboardHub;
use crate::service::Services;

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub admin: Arc<AdminGate>,
    pub scoreboard: Arc<ScoreboardHub>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/schools", get(catalog::list_schools).post(catalog::create_school))
        .route("/schools/{id}", put(catalog::update_school).delete(catalog::delete_school))
        .route("/teams", get(catalog::list_teams).post(catalog::create_team))
        .route("/teams/{id}", put(catalog::update_team).delete(catalog::delete_team))
        .route("/matches", get(scheduling::list_matches).post(scheduling::create_match))
        .route("/matches/{id}", put(scheduling::update_match).delete(scheduling::delete_match))
        .route("/agenda", get(scheduling::list_agenda).post(scheduling::create_event))
        .route("/agenda/{id}", put(scheduling::update_event).delete(scheduling::delete_event))
        .route("/lives", get(lives::list).post(lives::create))
        .route("/lives/{id}", put(lives::update).delete(lives::remove))
        .route("/auth", get(auth::login))
        .route("/verify", get(auth::verify))
        .route("/logout", delete(auth::logout))
        .route("/scoreboard", get(scoreboard::connect))
        .route_layer(middleware::from_fn(track))
        .fallback(unknown_route)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Count and time every routed request, labelled by method and route.
async fn track(req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_default();
    let op = format!("{} {route}", req.method());
    let started = Instant::now();
    let response = next.run(req).await;
    crate::observability::record_request(op, response.status().as_u16(), started);
    response
}

async fn unknown_route() -> Response {
    ApiError::not_found("route not found").into_response()
}
