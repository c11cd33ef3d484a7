// Module: http
// Redirect endpoints for BV videos and live rooms, plus the small HTML front page

pub mod error;
pub mod live;
pub mod middleware;
pub mod public;
pub mod video;

use axum::{middleware::from_fn, middleware::from_fn_with_state, routing::get, Router};
use bvproxy_core::{Config, RateLimiter, SessionStore};
use bvproxy_providers::bilibili::{BilibiliEndpoints, MirrorSelector, RandomMirror};
use bvproxy_providers::{BilibiliClient, BilibiliError};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub bilibili: Arc<BilibiliClient>,
    pub session_store: Arc<SessionStore>,
    pub rate_limiter: RateLimiter,
    pub mirror_selector: Arc<dyn MirrorSelector>,
}

impl AppState {
    /// Build the state from configuration, choosing CDN mirrors at random.
    pub fn from_config(config: Config) -> Result<Self, BilibiliError> {
        let endpoints = BilibiliEndpoints {
            www_base: config.bilibili.www_base.clone(),
            api_base: config.bilibili.api_base.clone(),
            live_base: config.bilibili.live_base.clone(),
        };

        Ok(Self {
            bilibili: Arc::new(BilibiliClient::with_endpoints(endpoints)?),
            session_store: Arc::new(SessionStore::new(&config.bilibili.session_file)),
            rate_limiter: RateLimiter::new(&config.rate_limit),
            mirror_selector: Arc::new(RandomMirror),
            config: Arc::new(config),
        })
    }

    #[must_use]
    pub fn with_mirror_selector(mut self, selector: Arc<dyn MirrorSelector>) -> Self {
        self.mirror_selector = selector;
        self
    }
}

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(public::index))
        .route("/submit", get(public::submit))
        .route("/ip", get(public::client_ip))
        .route("/live/{room_id}", get(live::live_redirect))
        .route("/{param}", get(video::video_redirect))
        // Rate limit per matched route and client
        .route_layer(from_fn_with_state(state.clone(), middleware::rate_limit))
        .layer(CompressionLayer::new())
        .layer(from_fn(middleware::filter_invalid_requests))
        .layer(from_fn_with_state(state.clone(), middleware::trusted_host))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
