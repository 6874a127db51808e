//! Queue request payloads, one per route.

use serde::{Deserialize, Serialize};

/// How much detail the summarizer should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Brief,
    #[default]
    Standard,
    Detailed,
}

/// Which summarization backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SummarizationMethod {
    #[default]
    Abstractive,
    Extractive,
}

/// Feed parser selection for ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParserType {
    #[default]
    Rss,
    Atom,
}

/// Summarization tuning knobs shared by several requests. Defaults mirror
/// what the producer sends when the caller omits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryOptions {
    #[serde(default, alias = "detailLevel")]
    pub detail_level: DetailLevel,
    #[serde(default, alias = "summarizationMethod")]
    pub method: SummarizationMethod,
    /// Transcript characters per summarization chunk.
    #[serde(default = "default_chunk_size", alias = "chunkSize")]
    pub chunk_size: u32,
    #[serde(default = "default_chunk_overlap", alias = "chunkOverlap")]
    pub chunk_overlap: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_chunk_size() -> u32 {
    4000
}

fn default_chunk_overlap() -> u32 {
    500
}

fn default_temperature() -> f64 {
    0.2
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            detail_level: DetailLevel::default(),
            method: SummarizationMethod::default(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            temperature: default_temperature(),
        }
    }
}

/// Inclusive range of episode positions, newest first, zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRange {
    pub start: usize,
    pub end: usize,
}

fn default_episode_limit() -> u32 {
    1
}

fn default_split_size_mb() -> u32 {
    25
}

/// Payload for the `process-podcast` route: ingest a feed end to end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodcastFeedRequest {
    #[serde(alias = "feedUrl")]
    pub feed_url: String,
    /// How many of the most recent episodes to process. Ignored when
    /// `episode_indices` or `episode_range` is given.
    #[serde(default = "default_episode_limit", alias = "episodeLimit")]
    pub episode_limit: u32,
    /// Explicit episode positions, newest first, zero-based. Takes
    /// precedence over `episode_range` and `episode_limit`.
    #[serde(default, alias = "episodeIndices")]
    pub episode_indices: Option<Vec<usize>>,
    #[serde(default, alias = "episodeRange")]
    pub episode_range: Option<EpisodeRange>,
    #[serde(default, alias = "parserType")]
    pub parser_type: ParserType,
    /// Maximum audio chunk handed to transcription, in megabytes.
    #[serde(default = "default_split_size_mb", alias = "splitSizeMb")]
    pub split_size_mb: u32,
    #[serde(default, flatten)]
    pub options: SummaryOptions,
}

/// Payload for the `upsert-podcast` route: register or refresh feed
/// metadata without processing episodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodcastUpsertRequest {
    #[serde(alias = "feedUrl")]
    pub feed_url: String,
    #[serde(default, alias = "parserType")]
    pub parser_type: ParserType,
}

/// Payload for the `summarize-episode` route: summarize one already
/// transcribed episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummaryRequest {
    #[serde(alias = "episodeId")]
    pub episode_id: String,
    #[serde(default, flatten)]
    pub options: SummaryOptions,
}

/// Payload for the `send-user-emails` route: deliver all pending summary
/// emails for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEmailRequest {
    #[serde(alias = "userEmail")]
    pub user_email: String,
}

/// Payload for the `send-episode-summary` route: deliver one episode's
/// summary to one recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeEmailRequest {
    #[serde(alias = "episodeId")]
    pub episode_id: String,
    #[serde(alias = "userEmail")]
    pub user_email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_request_camel_case() {
        let request: PodcastFeedRequest = serde_json::from_value(serde_json::json!({
            "feedUrl": "https://example.com/feed.xml",
            "episodeLimit": 3,
            "detailLevel": "detailed"
        }))
        .unwrap();
        assert_eq!(request.feed_url, "https://example.com/feed.xml");
        assert_eq!(request.episode_limit, 3);
        assert_eq!(request.options.detail_level, DetailLevel::Detailed);
    }

    #[test]
    fn test_feed_request_defaults() {
        let request: PodcastFeedRequest = serde_json::from_value(serde_json::json!({
            "feed_url": "https://example.com/feed.xml"
        }))
        .unwrap();
        assert_eq!(request.episode_limit, 1);
        assert_eq!(request.episode_indices, None);
        assert_eq!(request.parser_type, ParserType::Rss);
        assert_eq!(request.split_size_mb, 25);
        assert_eq!(request.options.method, SummarizationMethod::Abstractive);
        assert_eq!(request.options.chunk_size, 4000);
        assert_eq!(request.options.chunk_overlap, 500);
        assert!((request.options.temperature - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_feed_request_with_range() {
        let request: PodcastFeedRequest = serde_json::from_value(serde_json::json!({
            "feedUrl": "https://example.com/feed.xml",
            "episodeRange": {"start": 2, "end": 4}
        }))
        .unwrap();
        assert_eq!(request.episode_range, Some(EpisodeRange { start: 2, end: 4 }));
    }

    #[test]
    fn test_episode_email_request_both_spellings() {
        let camel: EpisodeEmailRequest = serde_json::from_value(serde_json::json!({
            "episodeId": "ep-1",
            "userEmail": "user@example.com"
        }))
        .unwrap();
        let snake: EpisodeEmailRequest = serde_json::from_value(serde_json::json!({
            "episode_id": "ep-1",
            "user_email": "user@example.com"
        }))
        .unwrap();
        assert_eq!(camel, snake);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let request: UserEmailRequest = serde_json::from_value(serde_json::json!({
            "userEmail": "user@example.com",
            "somethingNew": true
        }))
        .unwrap();
        assert_eq!(request.user_email, "user@example.com");
    }
}
