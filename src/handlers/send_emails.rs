//! Handlers for the email delivery routes.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::dispatch::{parse_payload, HandlerError, HandlerResult, MessageHandler};
use crate::models::{EpisodeEmailRequest, UserEmailRequest};
use crate::services::{EmailSender, PodcastStore};

use super::partial_failure;

/// Handler for `send-user-emails`: deliver every pending summary email to
/// one user.
///
/// Delivered summaries are marked as emailed before the message completes,
/// so a redelivery only retries the ones that never went out.
pub struct SendUserEmailsHandler {
    store: Arc<dyn PodcastStore>,
    email: Arc<dyn EmailSender>,
}

impl SendUserEmailsHandler {
    pub fn new(store: Arc<dyn PodcastStore>, email: Arc<dyn EmailSender>) -> Self {
        Self { store, email }
    }
}

#[async_trait]
impl MessageHandler for SendUserEmailsHandler {
    #[instrument(skip(self, payload))]
    async fn handle(&self, payload: &Value) -> HandlerResult {
        let request: UserEmailRequest = parse_payload("send-user-emails", payload)?;

        let pending = self.store.unemailed_summaries(&request.user_email).await?;
        if pending.is_empty() {
            info!(user = %request.user_email, "No pending summary emails");
            return Ok(json!({ "sent": 0 }));
        }

        let total = pending.len();
        let mut sent_ids = Vec::with_capacity(total);
        let mut failures = 0usize;
        for summary in &pending {
            let episode = self.store.get_episode(&summary.episode_id).await?;
            match self
                .email
                .send_summary_email(&request.user_email, &episode, summary)
                .await
            {
                Ok(()) => sent_ids.push(summary.id.clone()),
                Err(e) if e.is_transient() => {
                    warn!(summary_id = %summary.id, error = %e, "Email send failed; will retry");
                    failures += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        if !sent_ids.is_empty() {
            self.store
                .mark_summaries_emailed(&request.user_email, &sent_ids)
                .await?;
        }

        if failures > 0 {
            return Err(partial_failure("send-user-emails", failures, total));
        }

        info!(user = %request.user_email, sent = sent_ids.len(), "Summary emails delivered");
        Ok(json!({ "sent": sent_ids.len() }))
    }
}

/// Handler for `send-episode-summary`: deliver one episode's summary to one
/// recipient. A missing summary is permanent; nothing downstream will
/// create one on retry.
pub struct SendEpisodeSummaryHandler {
    store: Arc<dyn PodcastStore>,
    email: Arc<dyn EmailSender>,
}

impl SendEpisodeSummaryHandler {
    pub fn new(store: Arc<dyn PodcastStore>, email: Arc<dyn EmailSender>) -> Self {
        Self { store, email }
    }
}

#[async_trait]
impl MessageHandler for SendEpisodeSummaryHandler {
    #[instrument(skip(self, payload))]
    async fn handle(&self, payload: &Value) -> HandlerResult {
        let request: EpisodeEmailRequest = parse_payload("send-episode-summary", payload)?;

        let episode = self.store.get_episode(&request.episode_id).await?;
        let summary = self.store.summary(&episode.id).await?.ok_or_else(|| {
            HandlerError::permanent(
                "send-episode-summary",
                format!("episode {} has no summary to send", episode.id),
            )
        })?;

        self.email
            .send_summary_email(&request.user_email, &episode, &summary)
            .await?;

        info!(user = %request.user_email, episode_id = %episode.id, "Episode summary emailed");
        Ok(json!({ "episodeId": episode.id, "sentTo": request.user_email }))
    }
}
