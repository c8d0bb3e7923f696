//! monthly-ledger - Personal finance monthly ledger backend
//!
//! Serves the ledger API and reconciles credit-card items against closed
//! invoices whenever purchase events arrive.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use monthly_ledger::api::{self, AppState};
use monthly_ledger::config::{Config, LogFormat, StorageBackend};
use monthly_ledger::db;
use monthly_ledger::events::{EventBus, PurchaseEventHandler, RetryPolicy};
use monthly_ledger::handlers::{HandlerDeps, PageLimits, SyncMonthlyFromInvoicesHandler};
use monthly_ledger::invoicing::{InvoiceTotalProvider, PgInvoiceTotalProvider, StaticInvoiceTotals};
use monthly_ledger::store::{InMemoryLedger, PgLedgerStore, TransactionBackend, UnitOfWork};
use monthly_ledger::strategy::StrategyRegistry;

/// Initialize tracing/logging
fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "monthly_ledger=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init(),
    }
}

/// Storage and invoice backends for the configured mode
async fn connect_backends(
    config: &Config,
) -> anyhow::Result<(
    Arc<dyn TransactionBackend>,
    Arc<dyn InvoiceTotalProvider>,
    Option<PgPool>,
)> {
    match config.storage_backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; ledgers are lost on restart");
            Ok((
                Arc::new(InMemoryLedger::new()),
                Arc::new(StaticInvoiceTotals::new()),
                None,
            ))
        }
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres backend")?;

            tracing::info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await?;

            if !db::check_schema(&pool).await? {
                tracing::error!("Database schema is not complete. Please run migrations.");
                return Err(anyhow::anyhow!("Database schema incomplete"));
            }
            tracing::info!("Database connected successfully");

            Ok((
                Arc::new(PgLedgerStore::new(pool.clone())),
                Arc::new(PgInvoiceTotalProvider::new(pool.clone())),
                Some(pool),
            ))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(config.log_format);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!(
        environment = %config.environment,
        currency = %config.ledger_currency,
        "Starting monthly-ledger server"
    );

    let (backend, invoices, pool) = connect_backends(&config).await?;

    let deps = HandlerDeps::new(
        UnitOfWork::new(backend),
        Arc::new(StrategyRegistry::with_defaults()),
        invoices,
        config.ledger_currency,
    );

    let (publisher, consumer) = EventBus::channel(config.event_queue_capacity);
    let retry = RetryPolicy {
        max_attempts: config.event_max_attempts,
        initial_backoff: Duration::from_millis(config.event_retry_backoff_ms),
        ..RetryPolicy::default()
    };
    let consumer_task = consumer.with_retry(retry).start(PurchaseEventHandler::new(
        SyncMonthlyFromInvoicesHandler::new(deps.clone()),
    ));

    let limits = PageLimits {
        default_limit: config.default_page_limit,
        max_limit: config.max_page_limit,
    };
    let app = api::build_router(AppState::new(deps, limits, publisher));

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router owned the last publisher, so the consumer drains and stops
    tracing::info!("Server shutting down...");
    match consumer_task.await {
        Ok(stats) => tracing::info!(handled = stats.handled, failed = stats.failed, "Event queue drained"),
        Err(e) => tracing::error!(error = %e, "Event consumer task failed"),
    }

    if let Some(pool) = pool {
        pool.close().await;
        tracing::info!("Database connections closed");
    }
    tracing::info!("Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
