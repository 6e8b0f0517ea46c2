use std::sync::Arc;

use axum::{
    Router,
    http::{Method, header},
    routing::get,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod comment;
pub mod config;
pub mod error;
pub mod json;
pub mod source;
pub mod thread;

use config::ServerConfig;
use source::{CommentSource, HttpCommentSource};

#[derive(Clone)]
pub struct App {
    pub config: Arc<ServerConfig>,
    pub source: Option<Arc<dyn CommentSource>>,
}

impl App {
    pub fn new(config: ServerConfig, http: reqwest::Client) -> Self {
        let source = config.comments_api.as_ref().map(|api| {
            tracing::info!(url = %api.url, "Using upstream comments API");
            Arc::new(HttpCommentSource::new(
                http,
                api.url.clone(),
                api.token.clone(),
                api.max_pages,
            )) as Arc<dyn CommentSource>
        });

        if source.is_none() {
            tracing::warn!("No comments API configured, only posted snapshots can be served");
        }

        App {
            config: Arc::new(config),
            source,
        }
    }
}

pub fn router(app: App) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/threads", thread::routes::route())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}
