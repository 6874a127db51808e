//! Summarization service client.

use async_trait::async_trait;
use serde::Serialize;

use crate::config::HttpServiceConfig;
use crate::models::{SummaryContent, SummaryOptions};

use super::{HttpClient, ServiceResult};

/// Transcript-to-summary generation.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        transcript: &str,
        options: &SummaryOptions,
    ) -> ServiceResult<SummaryContent>;
}

/// HTTP client for the summarization endpoint.
pub struct SummarizationClient {
    http: HttpClient,
}

impl SummarizationClient {
    pub fn new(config: &HttpServiceConfig) -> ServiceResult<Self> {
        Ok(Self {
            http: HttpClient::new("summarizer", config)?,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummarizationRequest<'a> {
    transcript: &'a str,
    #[serde(flatten)]
    options: &'a SummaryOptions,
}

#[async_trait]
impl Summarizer for SummarizationClient {
    async fn summarize(
        &self,
        transcript: &str,
        options: &SummaryOptions,
    ) -> ServiceResult<SummaryContent> {
        let body = SummarizationRequest { transcript, options };
        self.http.post_json("summaries", &body).await
    }
}
