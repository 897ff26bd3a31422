use indexer_common::config::AppConfig;
use indexer_common::db;
use indexer_core::supervisor::Supervisor;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("indexer_core=info,indexer_decoder=info"));
    if config.log_format == "pretty" {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).json().init();
    }

    tracing::info!("indexer core starting");

    let pool = db::create_pool(
        &config.database_url,
        config.db_max_connections,
        config.db_min_connections,
    )
    .await?;

    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    let supervisor = Supervisor::new(config.clone(), pool.clone());
    let readiness = supervisor.readiness_flag();

    let cancel = CancellationToken::new();

    let admin_state = indexer_admin::state::AdminState::new(pool, config.clone(), readiness.clone());
    let admin_cancel = cancel.clone();
    let admin_handle = tokio::spawn(async move {
        if let Err(e) = indexer_admin::serve(admin_state, config.health_port, admin_cancel).await {
            tracing::error!(error = %e, "admin server exited with error");
        }
    });

    let supervisor_cancel = cancel.clone();
    let supervisor_handle =
        tokio::spawn(async move { supervisor.run(supervisor_cancel).await });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received SIGINT, shutting down gracefully");
        }
        result = terminate_signal() => {
            if result.is_ok() {
                tracing::info!("received SIGTERM, shutting down gracefully");
            }
        }
    }

    cancel.cancel();

    let _ = supervisor_handle.await;
    let _ = admin_handle.await;

    tracing::info!("indexer core stopped");
    Ok(())
}

#[cfg(unix)]
async fn terminate_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut term = signal(SignalKind::terminate())?;
    term.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn terminate_signal() -> anyhow::Result<()> {
    std::future::pending().await
}
