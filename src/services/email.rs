//! Outbound email service client.

use async_trait::async_trait;
use serde::Serialize;

use crate::config::HttpServiceConfig;
use crate::models::{Episode, EpisodeSummary};

use super::{HttpClient, ServiceResult};

/// Summary email delivery.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_summary_email(
        &self,
        user_email: &str,
        episode: &Episode,
        summary: &EpisodeSummary,
    ) -> ServiceResult<()>;
}

/// HTTP client for the email delivery service.
pub struct EmailClient {
    http: HttpClient,
}

impl EmailClient {
    pub fn new(config: &HttpServiceConfig) -> ServiceResult<Self> {
        Ok(Self {
            http: HttpClient::new("email", config)?,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryEmailRequest<'a> {
    to: &'a str,
    episode_title: &'a str,
    summary: &'a str,
    key_topics: &'a [String],
}

#[async_trait]
impl EmailSender for EmailClient {
    async fn send_summary_email(
        &self,
        user_email: &str,
        episode: &Episode,
        summary: &EpisodeSummary,
    ) -> ServiceResult<()> {
        let body = SummaryEmailRequest {
            to: user_email,
            episode_title: &episode.title,
            summary: &summary.content.summary,
            key_topics: &summary.content.key_topics,
        };
        self.http.post_unit("emails/summary", &body).await
    }
}
