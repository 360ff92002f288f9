mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;
mod static_files;
mod storage;
mod store;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::Database;
use crate::services::StudentService;
use crate::storage::LocalStorage;
use crate::store::SqliteStudentStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub students: StudentService,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up a local .env before anything reads the environment
    let dotenv = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "student_tree=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting student-tree...");

    match &dotenv {
        Ok(path) => tracing::info!("Loaded environment from {:?}", path),
        Err(_) => {
            if let Some(warning) = dotenv_warning(&dotenv) {
                tracing::warn!("{}", warning);
            }
        }
    }

    // Load configuration
    let config = Arc::new(Config::load()?);
    tracing::info!("Configuration loaded");

    // Initialize database
    let db = Database::new(&config.database.path).await?;
    db.run_migrations().await?;
    tracing::info!("Database initialized");

    let state = build_state(config.clone(), db);
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// A missing .env is fine; an unreadable or malformed one is worth a warning
fn dotenv_warning(result: &dotenvy::Result<std::path::PathBuf>) -> Option<String> {
    match result {
        Err(e) if !e.not_found() => Some(format!("Failed to load .env: {}", e)),
        _ => None,
    }
}

/// Wire the record store and blob store into the application state
fn build_state(config: Arc<Config>, db: Database) -> AppState {
    let store = Arc::new(SqliteStudentStore::new(db));
    let blobs = Arc::new(LocalStorage::new(&config.storage.upload_dir));
    let students = StudentService::new(store, blobs, config.storage.tolerate_missing_blobs);

    AppState { config, students }
}

fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    Router::new()
        .route(
            "/students",
            get(handlers::student::list_students).post(handlers::student::create_student),
        )
        .route(
            "/students/:id",
            get(handlers::student::get_student)
                .put(handlers::student::update_student)
                .delete(handlers::student::delete_student),
        )
        // Uploaded profile images by file name
        .fallback_service(static_files::uploads_service(&config.storage.upload_dir))
        .layer(DefaultBodyLimit::max(config.server.max_upload_bytes))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::cors::origin_guard,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors::cors_layer(&config.cors))
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
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
}
