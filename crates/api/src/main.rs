//! API server entry point.

use api::config::Config;
use event_store::{ChangeRecord, EventLog, InMemoryEventLog, PostgresEventLog};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
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

/// Builds the app over `log` and serves it until shutdown.
async fn serve<L: EventLog + Clone + 'static>(
    config: &Config,
    log: L,
    changes: broadcast::Receiver<ChangeRecord>,
    metrics_handle: PrometheusHandle,
) {
    let notifications = api::notifications::spawn(changes);

    let state = api::create_state(log);
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, table = %config.log.table, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    notifications.abort();
    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    // 1. Load configuration
    let config = Config::from_env().expect("failed to load configuration");

    // 2. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 3. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 4. Open the event log and serve
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await
                .expect("failed to connect to PostgreSQL");
            let log = PostgresEventLog::new(pool, config.log.clone());
            log.ensure_table()
                .await
                .expect("failed to create event table");

            let changes = log.subscribe();
            let watcher = log
                .watch_changes()
                .await
                .expect("failed to listen for table changes");
            serve(&config, log, changes, metrics_handle).await;
            watcher.abort();
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, events are kept in memory");
            let log = InMemoryEventLog::new();
            let changes = log.subscribe();
            serve(&config, log, changes, metrics_handle).await;
        }
    }
}
