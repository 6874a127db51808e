//! In-memory backing services for handler tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::models::{
    Episode, EpisodeSummary, FeedEpisode, ParserType, Podcast, SummaryContent, SummaryOptions,
};
use crate::services::{
    EmailSender, FeedSource, ParsedFeed, PodcastStore, ServiceError, ServiceResult, Summarizer,
    Transcriber,
};

/// Serves one fixed parsed feed for any URL.
pub struct StubFeed {
    feed: ParsedFeed,
}

impl StubFeed {
    pub fn new(feed: ParsedFeed) -> Self {
        Self { feed }
    }

    pub fn with_episodes(episodes: Vec<FeedEpisode>) -> Self {
        Self::new(ParsedFeed {
            title: "Stub Podcast".to_string(),
            author: None,
            description: None,
            image_url: None,
            episodes,
        })
    }
}

#[async_trait]
impl FeedSource for StubFeed {
    async fn fetch_feed(&self, _feed_url: &str, _parser: ParserType) -> ServiceResult<ParsedFeed> {
        Ok(self.feed.clone())
    }
}

/// Counts transcriptions and returns a canned transcript.
#[derive(Default)]
pub struct StubTranscriber {
    calls: AtomicUsize,
}

impl StubTranscriber {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(&self, audio_url: &str, _split_size_mb: u32) -> ServiceResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("transcript of {audio_url}"))
    }
}

/// Counts summarizations and returns a canned summary.
#[derive(Default)]
pub struct StubSummarizer {
    calls: AtomicUsize,
    fail_transient: Mutex<usize>,
}

impl StubSummarizer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Fail the next `n` calls with a transient error.
    pub fn fail_next(&self, n: usize) {
        *self.fail_transient.lock() = n;
    }
}

#[async_trait]
impl Summarizer for StubSummarizer {
    async fn summarize(
        &self,
        transcript: &str,
        _options: &SummaryOptions,
    ) -> ServiceResult<SummaryContent> {
        {
            let mut remaining = self.fail_transient.lock();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ServiceError::timeout("summarizer"));
            }
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(SummaryContent {
            summary: format!("summary of: {}", &transcript[..transcript.len().min(32)]),
            key_topics: vec!["stub".to_string()],
        })
    }
}

#[derive(Default)]
struct StoreState {
    podcasts: HashMap<String, Podcast>,
    episodes: HashMap<String, Episode>,
    transcripts: HashMap<String, String>,
    summaries: HashMap<String, EpisodeSummary>,
    emailed: HashMap<String, HashSet<String>>,
    next_id: usize,
}

/// In-memory [`PodcastStore`] keyed the way the real storage service keys
/// its rows: podcasts by feed URL, episodes by audio URL.
#[derive(Default)]
pub struct StubStore {
    state: Mutex<StoreState>,
}

impl StubStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a stored episode, returning its id.
    pub fn seed_episode(&self, title: &str) -> String {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = format!("ep-{}", state.next_id);
        state.episodes.insert(
            id.clone(),
            Episode {
                id: id.clone(),
                podcast_id: "pod-1".to_string(),
                title: title.to_string(),
                audio_url: format!("https://cdn.example.com/{title}.mp3"),
                published_at: None,
            },
        );
        id
    }

    pub fn seed_transcript(&self, episode_id: &str, transcript: &str) {
        self.state
            .lock()
            .transcripts
            .insert(episode_id.to_string(), transcript.to_string());
    }

    pub fn seed_summary(&self, episode_id: &str) -> String {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = format!("sum-{}", state.next_id);
        state.summaries.insert(
            episode_id.to_string(),
            EpisodeSummary {
                id: id.clone(),
                episode_id: episode_id.to_string(),
                content: SummaryContent {
                    summary: "seeded".to_string(),
                    key_topics: vec![],
                },
                options: SummaryOptions::default(),
                created_at: None,
            },
        );
        id
    }

    pub fn transcript_count(&self) -> usize {
        self.state.lock().transcripts.len()
    }

    pub fn summary_count(&self) -> usize {
        self.state.lock().summaries.len()
    }

    pub fn emailed_ids(&self, user_email: &str) -> Vec<String> {
        self.state
            .lock()
            .emailed
            .get(user_email)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PodcastStore for StubStore {
    async fn upsert_podcast(&self, feed_url: &str, feed: &ParsedFeed) -> ServiceResult<Podcast> {
        let mut state = self.state.lock();
        if let Some(existing) = state.podcasts.get(feed_url) {
            return Ok(existing.clone());
        }
        state.next_id += 1;
        let podcast = Podcast {
            id: format!("pod-{}", state.next_id),
            title: feed.title.clone(),
            feed_url: feed_url.to_string(),
            author: feed.author.clone(),
            description: feed.description.clone(),
            image_url: feed.image_url.clone(),
        };
        state.podcasts.insert(feed_url.to_string(), podcast.clone());
        Ok(podcast)
    }

    async fn upsert_episode(
        &self,
        podcast_id: &str,
        episode: &FeedEpisode,
    ) -> ServiceResult<Episode> {
        let mut state = self.state.lock();
        if let Some(existing) = state
            .episodes
            .values()
            .find(|e| e.audio_url == episode.audio_url)
        {
            return Ok(existing.clone());
        }
        state.next_id += 1;
        let stored = Episode {
            id: format!("ep-{}", state.next_id),
            podcast_id: podcast_id.to_string(),
            title: episode.title.clone(),
            audio_url: episode.audio_url.clone(),
            published_at: episode.published_at,
        };
        state.episodes.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn get_episode(&self, episode_id: &str) -> ServiceResult<Episode> {
        self.state
            .lock()
            .episodes
            .get(episode_id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found("storage", format!("episode {episode_id}")))
    }

    async fn transcript(&self, episode_id: &str) -> ServiceResult<Option<String>> {
        Ok(self.state.lock().transcripts.get(episode_id).cloned())
    }

    async fn save_transcript(&self, episode_id: &str, transcript: &str) -> ServiceResult<()> {
        self.state
            .lock()
            .transcripts
            .insert(episode_id.to_string(), transcript.to_string());
        Ok(())
    }

    async fn summary(&self, episode_id: &str) -> ServiceResult<Option<EpisodeSummary>> {
        Ok(self.state.lock().summaries.get(episode_id).cloned())
    }

    async fn save_summary(
        &self,
        episode_id: &str,
        content: &SummaryContent,
        options: &SummaryOptions,
    ) -> ServiceResult<EpisodeSummary> {
        let mut state = self.state.lock();
        state.next_id += 1;
        let summary = EpisodeSummary {
            id: format!("sum-{}", state.next_id),
            episode_id: episode_id.to_string(),
            content: content.clone(),
            options: options.clone(),
            created_at: None,
        };
        state
            .summaries
            .insert(episode_id.to_string(), summary.clone());
        Ok(summary)
    }

    async fn unemailed_summaries(&self, user_email: &str) -> ServiceResult<Vec<EpisodeSummary>> {
        let state = self.state.lock();
        let sent = state.emailed.get(user_email);
        Ok(state
            .summaries
            .values()
            .filter(|s| sent.map_or(true, |set| !set.contains(&s.id)))
            .cloned()
            .collect())
    }

    async fn mark_summaries_emailed(
        &self,
        user_email: &str,
        summary_ids: &[String],
    ) -> ServiceResult<()> {
        let mut state = self.state.lock();
        let sent = state.emailed.entry(user_email.to_string()).or_default();
        for id in summary_ids {
            sent.insert(id.clone());
        }
        Ok(())
    }
}

/// Records sent emails; can fail the next `n` sends transiently.
#[derive(Default)]
pub struct StubEmail {
    sent: Mutex<Vec<(String, String)>>,
    fail_transient: Mutex<usize>,
}

impl StubEmail {
    /// (recipient, episode id) pairs in send order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }

    pub fn fail_next(&self, n: usize) {
        *self.fail_transient.lock() = n;
    }
}

#[async_trait]
impl EmailSender for StubEmail {
    async fn send_summary_email(
        &self,
        user_email: &str,
        episode: &Episode,
        _summary: &EpisodeSummary,
    ) -> ServiceResult<()> {
        {
            let mut remaining = self.fail_transient.lock();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ServiceError::transport("email", "connection reset"));
            }
        }
        self.sent
            .lock()
            .push((user_email.to_string(), episode.id.clone()));
        Ok(())
    }
}
