//! # System Constants
//!
//! Routing keys, queue names, and operational defaults shared between the
//! dispatch core and the REST producer surface. The routing keys must stay
//! in sync with whatever `targetEndpoint` values the producer emits.

/// Routing keys produced by the REST layer.
pub mod routes {
    /// Full feed ingestion: fetch, upsert, transcribe selected episodes.
    pub const PROCESS_PODCAST: &str = "process-podcast";
    /// Create or refresh a podcast record from its feed.
    pub const UPSERT_PODCAST: &str = "upsert-podcast";
    /// Generate and persist a summary for one episode.
    pub const SUMMARIZE_EPISODE: &str = "summarize-episode";
    /// Send a digest of unemailed summaries to one user.
    pub const SEND_USER_EMAILS: &str = "send-user-emails";
    /// Send a single episode's summary to one user.
    pub const SEND_EPISODE_SUMMARY: &str = "send-episode-summary";

    /// Every routing key the producer is known to emit. Used to verify the
    /// route table at startup.
    pub const ALL: [&str; 5] = [
        PROCESS_PODCAST,
        UPSERT_PODCAST,
        SUMMARIZE_EPISODE,
        SEND_USER_EMAILS,
        SEND_EPISODE_SUMMARY,
    ];
}

/// Queue naming.
pub mod queues {
    /// Default request queue the listener polls.
    pub const DEFAULT_REQUEST_QUEUE: &str = "podcast_requests";
}

/// Conservative operational defaults; all are overridable via configuration.
pub mod defaults {
    /// Delivery attempts before a transiently failing message is dead-lettered.
    pub const MAX_DELIVERY_COUNT: u32 = 5;
    /// Per-message processing timeout in seconds.
    pub const MESSAGE_TIMEOUT_SECONDS: u64 = 300;
    /// Broker visibility timeout in seconds.
    pub const VISIBILITY_TIMEOUT_SECONDS: u64 = 300;
    /// Messages read per poll.
    pub const BATCH_SIZE: i32 = 10;
    /// Idle wait between empty polls, in milliseconds.
    pub const POLL_INTERVAL_MS: u64 = 1000;
}
