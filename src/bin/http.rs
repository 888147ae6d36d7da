#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use std::sync::Arc;

    use anyhow::Context;
    use class_timetable::{
        MemoryScheduleStore, ScheduleService, ServerConfig, SqliteScheduleStore, StoreLocation,
        http_api, telemetry,
    };
    use tracing::{info, warn};

    telemetry::init_tracing("info");
    let config = ServerConfig::from_env()?;

    match config.store {
        StoreLocation::Memory => {
            warn!("using the in-memory store; schedule entries are lost on shutdown");
            let store = Arc::new(MemoryScheduleStore::new());
            http_api::serve(config.http_addr, ScheduleService::new(store), shutdown_signal())
                .await?;
        }
        StoreLocation::Sqlite(path) => {
            let store = Arc::new(
                SqliteScheduleStore::with_busy_timeout(&path, config.busy_timeout)
                    .with_context(|| format!("opening timetable store {}", path.display()))?,
            );
            let service = ScheduleService::new(store.clone());
            http_api::serve(config.http_addr, service, shutdown_signal()).await?;
            match Arc::try_unwrap(store) {
                Ok(store) => {
                    store.close().context("closing timetable store")?;
                    info!("timetable store closed");
                }
                Err(_) => warn!("timetable store still in use at shutdown; dropping connection"),
            }
        }
    }
    Ok(())
}

#[cfg(feature = "http_api")]
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
