//! # Domain Models
//!
//! Request payloads carried on the queue and the core podcast domain types
//! exchanged with the backing services. Request types accept both
//! `snake_case` and `camelCase` field spellings since producers differ.

pub mod domain;
pub mod requests;

pub use domain::{Episode, EpisodeSummary, FeedEpisode, Podcast, SummaryContent};
pub use requests::{
    DetailLevel, EpisodeEmailRequest, EpisodeRange, EpisodeSummaryRequest, ParserType,
    PodcastFeedRequest, PodcastUpsertRequest, SummarizationMethod, SummaryOptions,
    UserEmailRequest,
};
