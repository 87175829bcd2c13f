//! API server entry point.

use std::sync::Arc;

use api::config::{Config, LogFormat};
use common::Role;
use doc_store::{DocumentStore, InMemoryDocumentStore, PostgresDocumentStore};
use domain::{AccountService, ErrorKind, Registration};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn open_store(config: &Config) -> Result<Arc<dyn DocumentStore>, BoxError> {
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
            let store = PostgresDocumentStore::new(pool);
            store.run_migrations().await?;
            tracing::info!("using PostgreSQL document store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory document store");
            Ok(Arc::new(InMemoryDocumentStore::new()))
        }
    }
}

/// Creates the configured admin account unless the email is already registered.
async fn seed_admin(store: Arc<dyn DocumentStore>, email: &str) -> Result<(), BoxError> {
    let accounts = AccountService::new(store);
    let registration = Registration {
        name: "Administrator".to_string(),
        email: email.to_string(),
        credential_hash: String::new(),
    };
    match accounts.register_as(registration, Role::Admin).await {
        Ok(admin) => {
            tracing::info!(user = %admin.id, %email, "admin account created");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::Conflict => {
            tracing::info!(%email, "admin account already exists");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // 1. Configuration and tracing
    let config = Config::from_env()?;
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    // 3. Storage and application state
    let store = open_store(&config).await?;
    if let Some(email) = &config.admin_email {
        seed_admin(Arc::clone(&store), email).await?;
    }
    let state = api::create_state(store, Arc::new(config.pricing()), api::in_memory_providers());

    // 4. Build the application
    let app = api::create_app(state, metrics_handle);

    // 5. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down gracefully");
    Ok(())
}
