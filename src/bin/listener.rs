//! Queue listener entrypoint.
//!
//! Loads configuration from the environment, wires the service clients and
//! route table, and runs the listener until SIGINT.

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use podcast_core::config::AppConfig;
use podcast_core::dispatch::Dispatcher;
use podcast_core::handlers::{build_route_table, HandlerServices};
use podcast_core::listener::{ListenerConfig, QueueListener};
use podcast_core::logging::init_structured_logging;
use podcast_core::messaging::PgmqQueueDriver;
use podcast_core::services::{
    EmailClient, FeedClient, HttpPodcastStore, SummarizationClient, TranscriptionClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_structured_logging();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    info!(
        queue = %config.queue.queue_name,
        batch_size = config.queue.batch_size,
        "Starting podcast queue listener"
    );

    let driver = Arc::new(
        PgmqQueueDriver::connect(&config.queue.connection_string)
            .await
            .context("Failed to connect to the broker")?,
    );

    let services = HandlerServices {
        feed: Arc::new(FeedClient::new(&config.services.feed)?),
        transcriber: Arc::new(TranscriptionClient::new(&config.services.whisper)?),
        summarizer: Arc::new(SummarizationClient::new(&config.services.summarizer)?),
        store: Arc::new(HttpPodcastStore::new(&config.services.storage)?),
        email: Arc::new(EmailClient::new(&config.services.email)?),
    };
    let routes = build_route_table(services);

    let dispatcher = Dispatcher::new(routes, config.queue.max_delivery_count);
    let listener_config = ListenerConfig::from_queue_config(&config.queue, config.backoff.clone());
    let listener = QueueListener::new(driver, dispatcher, listener_config);
    let handle = listener.handle();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        info!("Shutdown signal received; stopping listener");
        handle.stop();
    });

    listener.start().await.context("Listener failed")?;
    info!("Listener shut down cleanly");
    Ok(())
}
