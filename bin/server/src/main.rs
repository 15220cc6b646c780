use lasting_conversation::{ConversationStore, InMemoryConversationStore};
use lasting_dialogflow::DialogflowClient;
use lasting_server::{
    config::{ServerConfig, StoreBackend},
    error::StartupError,
    router,
    state::AppState,
};
use lasting_sync::SyncConversationStore;
use rootcause::Report;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Report<StartupError>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().map_err(|e| StartupError::Config {
        details: e.to_string(),
    })?;
    tracing::info!("Loaded configuration");

    let store = connect_store(&config).await?;

    let engine = DialogflowClient::new(config.dialogflow.clone())
        .map_err(|report| report.context(StartupError::Engine))?;
    tracing::info!(
        project = %config.dialogflow.project_id,
        agent = %config.dialogflow.agent_id,
        location = %config.dialogflow.location,
        "Dialogflow agent configured"
    );

    let state = Arc::new(AppState::new(
        store,
        Arc::new(engine),
        config.language_code.clone(),
    ));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| StartupError::Bind {
            addr: config.listen_addr.clone(),
            details: e.to_string(),
        })?;

    tracing::info!("listening on http://{}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| StartupError::Serve {
            details: e.to_string(),
        })?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn connect_store(
    config: &ServerConfig,
) -> Result<Arc<dyn ConversationStore>, Report<StartupError>> {
    match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory conversation store; state is lost on restart");
            Ok(Arc::new(InMemoryConversationStore::new()))
        }
        StoreBackend::Sync => {
            let sync = config.sync.as_ref().ok_or_else(|| StartupError::Config {
                details: "SYNC__ACCOUNT_SID and SYNC__AUTH_TOKEN are required for the sync store"
                    .to_string(),
            })?;
            let store = SyncConversationStore::connect(sync)
                .await
                .map_err(|report| report.context(StartupError::Store))?;
            Ok(Arc::new(store))
        }
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received, draining connections"),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
