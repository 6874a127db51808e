//! # Message Handlers
//!
//! One handler per route. Handlers validate their payload, orchestrate the
//! backing services, and report failure through [`HandlerError`] so the
//! dispatcher can map it to a queue disposition. Every handler is safe to
//! replay: work that already happened is detected and skipped, so an
//! at-least-once redelivery converges instead of duplicating effects.

pub mod process_podcast;
pub mod send_emails;
pub mod summarize_episode;
pub mod upsert_podcast;

use std::sync::Arc;

use crate::constants::routes;
use crate::dispatch::{HandlerError, RouteTable};
use crate::services::{EmailSender, FeedSource, PodcastStore, Summarizer, Transcriber};

pub use process_podcast::ProcessPodcastHandler;
pub use send_emails::{SendEpisodeSummaryHandler, SendUserEmailsHandler};
pub use summarize_episode::SummarizeEpisodeHandler;
pub use upsert_podcast::UpsertPodcastHandler;

/// Service dependencies shared across the handlers.
#[derive(Clone)]
pub struct HandlerServices {
    pub feed: Arc<dyn FeedSource>,
    pub transcriber: Arc<dyn Transcriber>,
    pub summarizer: Arc<dyn Summarizer>,
    pub store: Arc<dyn PodcastStore>,
    pub email: Arc<dyn EmailSender>,
}

/// Build the full route table with every known route registered.
pub fn build_route_table(services: HandlerServices) -> RouteTable {
    let table = RouteTable::builder()
        .register(
            routes::PROCESS_PODCAST,
            Arc::new(ProcessPodcastHandler::new(
                services.feed.clone(),
                services.store.clone(),
                services.transcriber.clone(),
                services.summarizer.clone(),
            )),
        )
        .register(
            routes::UPSERT_PODCAST,
            Arc::new(UpsertPodcastHandler::new(
                services.feed.clone(),
                services.store.clone(),
            )),
        )
        .register(
            routes::SUMMARIZE_EPISODE,
            Arc::new(SummarizeEpisodeHandler::new(
                services.store.clone(),
                services.summarizer.clone(),
            )),
        )
        .register(
            routes::SEND_USER_EMAILS,
            Arc::new(SendUserEmailsHandler::new(
                services.store.clone(),
                services.email.clone(),
            )),
        )
        .register(
            routes::SEND_EPISODE_SUMMARY,
            Arc::new(SendEpisodeSummaryHandler::new(
                services.store,
                services.email,
            )),
        )
        .build();

    table.verify_routes(&routes::ALL);
    table
}

/// Mixed service outcomes within one message: some items succeeded, some
/// failed transiently. Abandoning would replay the whole batch, which the
/// skip-existing checks make safe, so prefer retry over losing the failures.
pub(crate) fn partial_failure(operation: &str, failed: usize, total: usize) -> HandlerError {
    HandlerError::transient(
        operation,
        format!("{failed} of {total} items failed; message will be retried"),
    )
}
