//! Storage service client: podcasts, episodes, transcripts, summaries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::HttpServiceConfig;
use crate::models::{Episode, EpisodeSummary, FeedEpisode, Podcast, SummaryContent, SummaryOptions};

use super::feed::ParsedFeed;
use super::{HttpClient, ServiceError, ServiceResult};

/// Persistence surface the handlers depend on.
///
/// Upserts are keyed on natural identity (feed URL, episode GUID/audio URL)
/// so replaying a delivery converges on the same rows instead of
/// duplicating them.
#[async_trait]
pub trait PodcastStore: Send + Sync {
    /// Create or refresh a podcast from parsed feed metadata.
    async fn upsert_podcast(&self, feed_url: &str, feed: &ParsedFeed) -> ServiceResult<Podcast>;

    /// Create or refresh one episode under a podcast.
    async fn upsert_episode(
        &self,
        podcast_id: &str,
        episode: &FeedEpisode,
    ) -> ServiceResult<Episode>;

    async fn get_episode(&self, episode_id: &str) -> ServiceResult<Episode>;

    /// Stored transcript for an episode, if one exists.
    async fn transcript(&self, episode_id: &str) -> ServiceResult<Option<String>>;

    async fn save_transcript(&self, episode_id: &str, transcript: &str) -> ServiceResult<()>;

    /// Stored summary for an episode, if one exists.
    async fn summary(&self, episode_id: &str) -> ServiceResult<Option<EpisodeSummary>>;

    async fn save_summary(
        &self,
        episode_id: &str,
        content: &SummaryContent,
        options: &SummaryOptions,
    ) -> ServiceResult<EpisodeSummary>;

    /// Summaries not yet emailed to this user.
    async fn unemailed_summaries(&self, user_email: &str) -> ServiceResult<Vec<EpisodeSummary>>;

    /// Record that these summaries were delivered to this user.
    async fn mark_summaries_emailed(
        &self,
        user_email: &str,
        summary_ids: &[String],
    ) -> ServiceResult<()>;
}

/// HTTP implementation of [`PodcastStore`] against the storage REST API.
pub struct HttpPodcastStore {
    http: HttpClient,
}

impl HttpPodcastStore {
    pub fn new(config: &HttpServiceConfig) -> ServiceResult<Self> {
        Ok(Self {
            http: HttpClient::new("storage", config)?,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpsertPodcastRequest<'a> {
    feed_url: &'a str,
    title: &'a str,
    author: &'a Option<String>,
    description: &'a Option<String>,
    image_url: &'a Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveTranscriptRequest<'a> {
    transcript: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveSummaryRequest<'a> {
    #[serde(flatten)]
    content: &'a SummaryContent,
    options: &'a SummaryOptions,
}

#[derive(Deserialize)]
struct TranscriptResponse {
    transcript: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MarkEmailedRequest<'a> {
    summary_ids: &'a [String],
}

/// Treat a 404 as "no such record" instead of an error.
fn optional<T>(result: ServiceResult<T>) -> ServiceResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ServiceError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl PodcastStore for HttpPodcastStore {
    async fn upsert_podcast(&self, feed_url: &str, feed: &ParsedFeed) -> ServiceResult<Podcast> {
        let body = UpsertPodcastRequest {
            feed_url,
            title: &feed.title,
            author: &feed.author,
            description: &feed.description,
            image_url: &feed.image_url,
        };
        self.http.post_json("podcasts", &body).await
    }

    async fn upsert_episode(
        &self,
        podcast_id: &str,
        episode: &FeedEpisode,
    ) -> ServiceResult<Episode> {
        self.http
            .post_json(&format!("podcasts/{podcast_id}/episodes"), episode)
            .await
    }

    async fn get_episode(&self, episode_id: &str) -> ServiceResult<Episode> {
        self.http.get_json(&format!("episodes/{episode_id}")).await
    }

    async fn transcript(&self, episode_id: &str) -> ServiceResult<Option<String>> {
        let result: ServiceResult<TranscriptResponse> = self
            .http
            .get_json(&format!("episodes/{episode_id}/transcript"))
            .await;
        Ok(optional(result)?.map(|r| r.transcript))
    }

    async fn save_transcript(&self, episode_id: &str, transcript: &str) -> ServiceResult<()> {
        let body = SaveTranscriptRequest { transcript };
        self.http
            .post_unit(&format!("episodes/{episode_id}/transcript"), &body)
            .await
    }

    async fn summary(&self, episode_id: &str) -> ServiceResult<Option<EpisodeSummary>> {
        let result: ServiceResult<EpisodeSummary> = self
            .http
            .get_json(&format!("episodes/{episode_id}/summary"))
            .await;
        optional(result)
    }

    async fn save_summary(
        &self,
        episode_id: &str,
        content: &SummaryContent,
        options: &SummaryOptions,
    ) -> ServiceResult<EpisodeSummary> {
        let body = SaveSummaryRequest { content, options };
        self.http
            .post_json(&format!("episodes/{episode_id}/summary"), &body)
            .await
    }

    async fn unemailed_summaries(&self, user_email: &str) -> ServiceResult<Vec<EpisodeSummary>> {
        self.http
            .get_json(&format!("users/{user_email}/summaries?emailed=false"))
            .await
    }

    async fn mark_summaries_emailed(
        &self,
        user_email: &str,
        summary_ids: &[String],
    ) -> ServiceResult<()> {
        let body = MarkEmailedRequest { summary_ids };
        self.http
            .post_unit(&format!("users/{user_email}/summaries/emailed"), &body)
            .await
    }
}
