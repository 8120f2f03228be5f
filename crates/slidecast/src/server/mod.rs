pub mod auth;
pub mod local;
pub mod pages;
pub mod params;
pub mod presenter;
pub mod stream;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::live::LiveDeck;
use crate::theme::Theme;
use auth::PresenterToken;

pub struct ServerSettings {
    pub theme: Theme,
    pub keepalive: Duration,
    /// When set, shared slide navigation does not need the presenter token.
    pub open_navigation: bool,
    /// Directory whose files are served for paths no route claims.
    pub asset_dir: PathBuf,
}

/// Handle shared by every request. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub live: Arc<LiveDeck>,
    pub token: Arc<PresenterToken>,
    pub settings: Arc<ServerSettings>,
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    /// Returns the state plus the sender that ends every open event stream.
    pub fn new(
        live: Arc<LiveDeck>,
        token: PresenterToken,
        settings: ServerSettings,
    ) -> (Self, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        let state = Self {
            live,
            token: Arc::new(token),
            settings: Arc::new(settings),
            shutdown: rx,
        };
        (state, tx)
    }
}

pub fn router(state: AppState) -> Router {
    let assets = ServeDir::new(&state.settings.asset_dir);
    Router::new()
        .route("/", get(pages::audience))
        .route("/presenter", get(pages::presenter))
        .route("/api/events", get(stream::events))
        .route("/api/state", get(local::current))
        .route("/api/presenter/next", post(presenter::next))
        .route("/api/presenter/prev", post(presenter::prev))
        .route("/api/presenter/goto/{idx}", post(presenter::goto))
        .route("/api/presenter/drawing", post(presenter::drawing))
        .route("/api/presenter/drawing/undo", post(presenter::undo))
        .route("/api/presenter/drawing/redo", post(presenter::redo))
        .route("/api/slide/next", get(local::next))
        .route("/api/slide/prev", get(local::prev))
        .route("/api/slide/{idx}", get(local::goto))
        .route("/api/drawing/{slide}", get(local::drawing))
        .fallback_service(assets)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `shutdown` resolves. Open event streams are closed through
/// the state's shutdown channel before the listener drains.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = listener.local_addr().context("Failed to read listener address")?;
    info!(%addr, "listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;
    info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{SignalKind, signal};
                match signal(SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "SIGTERM handler unavailable");
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}
