//! Core podcast domain types returned by the backing services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::requests::SummaryOptions;

/// A podcast as stored by the storage service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Podcast {
    pub id: String,
    pub title: String,
    #[serde(alias = "feedUrl")]
    pub feed_url: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "imageUrl")]
    pub image_url: Option<String>,
}

/// An episode entry as parsed from a feed, before it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEpisode {
    pub title: String,
    #[serde(alias = "audioUrl")]
    pub audio_url: String,
    #[serde(default)]
    pub guid: Option<String>,
    #[serde(default, alias = "publishedAt")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "durationSeconds")]
    pub duration_seconds: Option<u32>,
}

/// A stored episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: String,
    #[serde(alias = "podcastId")]
    pub podcast_id: String,
    pub title: String,
    #[serde(alias = "audioUrl")]
    pub audio_url: String,
    #[serde(default, alias = "publishedAt")]
    pub published_at: Option<DateTime<Utc>>,
}

/// Generated summary text plus the highlights pulled out of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryContent {
    pub summary: String,
    #[serde(default, alias = "keyTopics")]
    pub key_topics: Vec<String>,
}

/// A stored summary for one episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub id: String,
    #[serde(alias = "episodeId")]
    pub episode_id: String,
    #[serde(flatten)]
    pub content: SummaryContent,
    #[serde(default)]
    pub options: SummaryOptions,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}
