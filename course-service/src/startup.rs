//! Application startup and lifecycle management.

use crate::config::CourseConfig;
use crate::handlers::{generate_detail, generate_outline, health_check, metrics, readiness_check, root};
use crate::services::{init_metrics, RequestDispatcher, WorkflowClient, WorkflowEngine};
use axum::http::HeaderValue;
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware, request_span};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<CourseConfig>,
    pub dispatcher: RequestDispatcher,
}

impl AppState {
    pub fn new(config: CourseConfig, engine: Arc<dyn WorkflowEngine>) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher: RequestDispatcher::new(engine),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors.allowed_origins);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics))
        .route("/api/generate-outline", post(generate_outline))
        .route("/api/generate-detail", post(generate_detail))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(request_span::<axum::body::Body>))
        .layer(from_fn(request_id_middleware))
        .layer(cors)
        .with_state(state)
}

// Credentials rule out wildcards, so methods and headers mirror the preflight.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

fn log_startup_summary(config: &CourseConfig) {
    let missing = config.missing_required();
    if missing.is_empty() {
        tracing::info!("Configuration validated");
    } else {
        tracing::error!(
            missing = %missing.join(", "),
            "Missing required environment variables, generation endpoints will fail until they are set"
        );
    }

    tracing::info!(
        port = config.common.port,
        cors_origins = ?config.cors.allowed_origins,
        outline_flow = %truncate(&config.workflow.outline_flow_id, 20),
        detail_flow = %truncate(&config.workflow.detail_flow_id, 20),
        timeout_secs = config.workflow.timeout.as_secs(),
        "Course service configuration"
    );
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() > max_chars {
        format!("{}...", value.chars().take(max_chars).collect::<String>())
    } else {
        value.to_string()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    http_listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    ///
    /// Missing upstream credentials are logged but do not stop the build.
    pub async fn build(config: CourseConfig) -> Result<Self, AppError> {
        log_startup_summary(&config);
        init_metrics();

        let client = WorkflowClient::new(config.workflow.clone()).map_err(|e| {
            tracing::error!("Failed to initialize workflow client: {}", e);
            AppError::InternalError(anyhow::Error::new(e))
        })?;
        let engine: Arc<dyn WorkflowEngine> = Arc::new(client);

        // Bind HTTP listener (port 0 = random port for testing)
        let http_addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let http_listener = TcpListener::bind(http_addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", http_addr, e);
            AppError::from(e)
        })?;
        let http_port = http_listener.local_addr()?.port();

        tracing::info!("Course service: HTTP on port {}", http_port);

        let router = build_router(AppState::new(config, engine));

        Ok(Self {
            http_port,
            http_listener,
            router,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.http_listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                std::io::Error::other(format!("HTTP server error: {}", e))
            })
    }
}
