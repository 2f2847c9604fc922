//! HTTP surface: router, shared state and the serve loop.
//!
//! | Method | Path        | Handler                     |
//! |--------|-------------|-----------------------------|
//! | GET    | `/analyze`  | [`handlers::probe`]         |
//! | POST   | `/analyze`  | [`handlers::analyze`]       |
//! | POST   | `/download` | [`handlers::download`]      |
//! | GET    | `/health`   | [`handlers::health`]        |

pub mod delivery;
pub mod handlers;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{Request, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::pipeline::llm::PlantAnalyzer;
use crate::transient::TransientDirs;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<dyn PlantAnalyzer>,
    pub dirs: TransientDirs,
}

impl AppState {
    pub fn new(analyzer: Arc<dyn PlantAnalyzer>, dirs: TransientDirs) -> Self {
        Self { analyzer, dirs }
    }
}

/// Build the application router.
///
/// `max_upload_bytes` caps the `/analyze` body. `/download` gets twice that,
/// since it carries the same photo base64-encoded inside JSON.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
            )
        })
        .on_response(|res: &Response<Body>, latency: Duration, _span: &tracing::Span| {
            info!(
                latency = %format!("{} ms", latency.as_millis()),
                status = %res.status().as_u16(),
                "finished processing request"
            );
        });

    let logged_routes = Router::new()
        .route(
            "/analyze",
            get(handlers::probe)
                .post(handlers::analyze)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route(
            "/download",
            post(handlers::download)
                .layer(DefaultBodyLimit::max(max_upload_bytes.saturating_mul(2))),
        )
        .layer(trace_layer);

    Router::new()
        .merge(logged_routes)
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Prepare transient storage, bind `config.bind` and serve until `shutdown`
/// resolves.
pub async fn serve<F>(
    config: &ServerConfig,
    analyzer: Arc<dyn PlantAnalyzer>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let dirs = TransientDirs::from_config(config);
    dirs.prepare()?;
    dirs.sweep_stale();

    let app = router(AppState::new(analyzer, dirs), config.max_upload_bytes);

    let listener = TcpListener::bind(&config.bind).await?;
    info!(
        "Plant analysis server listening on http://{}",
        listener.local_addr()?
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server stopped");
    Ok(())
}
