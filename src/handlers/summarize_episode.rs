//! Handler for the `summarize-episode` route.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::dispatch::{parse_payload, HandlerError, HandlerResult, MessageHandler};
use crate::models::EpisodeSummaryRequest;
use crate::services::{PodcastStore, Summarizer};

/// Summarizes one already transcribed episode.
///
/// An existing summary is returned as-is; a missing transcript is a
/// permanent failure since retrying cannot conjure one.
pub struct SummarizeEpisodeHandler {
    store: Arc<dyn PodcastStore>,
    summarizer: Arc<dyn Summarizer>,
}

impl SummarizeEpisodeHandler {
    pub fn new(store: Arc<dyn PodcastStore>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self { store, summarizer }
    }
}

#[async_trait]
impl MessageHandler for SummarizeEpisodeHandler {
    #[instrument(skip(self, payload))]
    async fn handle(&self, payload: &Value) -> HandlerResult {
        let request: EpisodeSummaryRequest = parse_payload("summarize-episode", payload)?;

        let episode = self.store.get_episode(&request.episode_id).await?;

        if let Some(existing) = self.store.summary(&episode.id).await? {
            info!(episode_id = %episode.id, "Summary already stored; reusing");
            return Ok(json!({ "episodeId": episode.id, "summaryId": existing.id, "reused": true }));
        }

        let transcript = self.store.transcript(&episode.id).await?.ok_or_else(|| {
            HandlerError::permanent(
                "summarize-episode",
                format!("episode {} has no transcript", episode.id),
            )
        })?;

        let content = self
            .summarizer
            .summarize(&transcript, &request.options)
            .await?;
        let saved = self
            .store
            .save_summary(&episode.id, &content, &request.options)
            .await?;

        info!(episode_id = %episode.id, summary_id = %saved.id, "Episode summarized");
        Ok(json!({ "episodeId": episode.id, "summaryId": saved.id, "reused": false }))
    }
}
