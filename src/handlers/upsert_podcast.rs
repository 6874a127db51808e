//! Handler for the `upsert-podcast` route: feed metadata only.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::dispatch::{parse_payload, HandlerResult, MessageHandler};
use crate::models::PodcastUpsertRequest;
use crate::services::{FeedSource, PodcastStore};

/// Registers or refreshes a podcast from its feed without touching
/// episodes. Used when a user subscribes before any episode is requested.
pub struct UpsertPodcastHandler {
    feed: Arc<dyn FeedSource>,
    store: Arc<dyn PodcastStore>,
}

impl UpsertPodcastHandler {
    pub fn new(feed: Arc<dyn FeedSource>, store: Arc<dyn PodcastStore>) -> Self {
        Self { feed, store }
    }
}

#[async_trait]
impl MessageHandler for UpsertPodcastHandler {
    #[instrument(skip(self, payload))]
    async fn handle(&self, payload: &Value) -> HandlerResult {
        let request: PodcastUpsertRequest = parse_payload("upsert-podcast", payload)?;

        let feed = self
            .feed
            .fetch_feed(&request.feed_url, request.parser_type)
            .await?;
        let podcast = self.store.upsert_podcast(&request.feed_url, &feed).await?;

        info!(podcast_id = %podcast.id, feed_url = %request.feed_url, "Podcast upserted");
        Ok(json!({ "podcastId": podcast.id, "title": podcast.title }))
    }
}
