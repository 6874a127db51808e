//! Feed parsing service client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::HttpServiceConfig;
use crate::models::{FeedEpisode, ParserType};

use super::{HttpClient, ServiceResult};

/// A parsed feed: podcast metadata plus its episode entries, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFeed {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub episodes: Vec<FeedEpisode>,
}

/// Source of parsed podcast feeds.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_feed(&self, feed_url: &str, parser: ParserType) -> ServiceResult<ParsedFeed>;
}

/// HTTP client for the feed parsing service.
pub struct FeedClient {
    http: HttpClient,
}

impl FeedClient {
    pub fn new(config: &HttpServiceConfig) -> ServiceResult<Self> {
        Ok(Self {
            http: HttpClient::new("feed", config)?,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ParseFeedRequest<'a> {
    feed_url: &'a str,
    parser_type: ParserType,
}

#[async_trait]
impl FeedSource for FeedClient {
    async fn fetch_feed(&self, feed_url: &str, parser: ParserType) -> ServiceResult<ParsedFeed> {
        let body = ParseFeedRequest {
            feed_url,
            parser_type: parser,
        };
        self.http.post_json("parse", &body).await
    }
}
