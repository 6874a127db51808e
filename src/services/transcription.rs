//! Whisper transcription service client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::HttpServiceConfig;

use super::{HttpClient, ServiceResult};

/// Audio-to-text transcription. `split_size_mb` bounds the audio chunks
/// the service feeds to the model.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_url: &str, split_size_mb: u32) -> ServiceResult<String>;
}

/// HTTP client for the Whisper transcription endpoint.
///
/// Transcription is the slowest link in the pipeline; its HTTP timeout
/// comes from its own service configuration, while the overall per-message
/// timeout is enforced by the listener.
pub struct TranscriptionClient {
    http: HttpClient,
}

impl TranscriptionClient {
    pub fn new(config: &HttpServiceConfig) -> ServiceResult<Self> {
        Ok(Self {
            http: HttpClient::new("whisper", config)?,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TranscriptionRequest<'a> {
    audio_url: &'a str,
    split_size_mb: u32,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    transcript: String,
}

#[async_trait]
impl Transcriber for TranscriptionClient {
    async fn transcribe(&self, audio_url: &str, split_size_mb: u32) -> ServiceResult<String> {
        let body = TranscriptionRequest {
            audio_url,
            split_size_mb,
        };
        let response: TranscriptionResponse = self.http.post_json("transcriptions", &body).await?;
        Ok(response.transcript)
    }
}
