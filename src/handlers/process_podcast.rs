//! Handler for the `process-podcast` route: full feed-to-summary pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::dispatch::{parse_payload, HandlerResult, MessageHandler};
use crate::models::{FeedEpisode, PodcastFeedRequest};
use crate::services::{FeedSource, PodcastStore, Summarizer, Transcriber};

use super::partial_failure;

/// Ingests a feed end to end: parse, upsert podcast and episodes,
/// transcribe, summarize.
///
/// Each pipeline stage checks for previously stored output before doing
/// work, so redelivery resumes where the last attempt stopped rather than
/// re-transcribing or re-summarizing.
pub struct ProcessPodcastHandler {
    feed: Arc<dyn FeedSource>,
    store: Arc<dyn PodcastStore>,
    transcriber: Arc<dyn Transcriber>,
    summarizer: Arc<dyn Summarizer>,
}

impl ProcessPodcastHandler {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        store: Arc<dyn PodcastStore>,
        transcriber: Arc<dyn Transcriber>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            feed,
            store,
            transcriber,
            summarizer,
        }
    }

    /// Pick the episodes the request asks for, ordered newest first.
    /// Explicit indices win over a range, which wins over the plain limit;
    /// positions beyond the feed are ignored rather than rejected.
    fn select_episodes<'a>(
        episodes: &'a [FeedEpisode],
        request: &PodcastFeedRequest,
    ) -> Vec<&'a FeedEpisode> {
        let mut ordered: Vec<&FeedEpisode> = episodes.iter().collect();
        ordered.sort_by(|a, b| b.published_at.cmp(&a.published_at));

        if let Some(indices) = &request.episode_indices {
            return indices
                .iter()
                .filter_map(|&i| ordered.get(i).copied())
                .collect();
        }
        if let Some(range) = &request.episode_range {
            let end = range.end.min(ordered.len().saturating_sub(1));
            if range.start > end || ordered.is_empty() {
                return Vec::new();
            }
            return ordered[range.start..=end].to_vec();
        }
        ordered.truncate(request.episode_limit as usize);
        ordered
    }

    async fn process_episode(
        &self,
        podcast_id: &str,
        entry: &FeedEpisode,
        request: &PodcastFeedRequest,
    ) -> Result<String, crate::dispatch::HandlerError> {
        let episode = self.store.upsert_episode(podcast_id, entry).await?;

        let transcript = match self.store.transcript(&episode.id).await? {
            Some(existing) => {
                info!(episode_id = %episode.id, "Transcript already stored; skipping transcription");
                existing
            }
            None => {
                let transcript = self
                    .transcriber
                    .transcribe(&episode.audio_url, request.split_size_mb)
                    .await?;
                self.store.save_transcript(&episode.id, &transcript).await?;
                transcript
            }
        };

        if self.store.summary(&episode.id).await?.is_some() {
            info!(episode_id = %episode.id, "Summary already stored; skipping summarization");
            return Ok(episode.id);
        }

        let content = self
            .summarizer
            .summarize(&transcript, &request.options)
            .await?;
        self.store
            .save_summary(&episode.id, &content, &request.options)
            .await?;
        Ok(episode.id)
    }
}

#[async_trait]
impl MessageHandler for ProcessPodcastHandler {
    #[instrument(skip(self, payload))]
    async fn handle(&self, payload: &Value) -> HandlerResult {
        let request: PodcastFeedRequest = parse_payload("process-podcast", payload)?;

        let feed = self
            .feed
            .fetch_feed(&request.feed_url, request.parser_type)
            .await?;
        let podcast = self.store.upsert_podcast(&request.feed_url, &feed).await?;

        let selected = Self::select_episodes(&feed.episodes, &request);
        let total = selected.len();
        info!(
            podcast_id = %podcast.id,
            feed_url = %request.feed_url,
            episodes = total,
            "Processing podcast feed"
        );

        let mut processed = Vec::with_capacity(total);
        let mut failures = 0usize;
        for entry in selected {
            match self.process_episode(&podcast.id, entry, &request).await {
                Ok(episode_id) => processed.push(episode_id),
                Err(e) if e.is_transient() => {
                    warn!(episode = %entry.title, error = %e, "Episode failed; will retry with the message");
                    failures += 1;
                }
                Err(e) => return Err(e),
            }
        }

        if failures > 0 {
            return Err(partial_failure("process-podcast", failures, total));
        }

        Ok(json!({
            "podcastId": podcast.id,
            "episodesProcessed": processed,
        }))
    }
}
