//! HTTP-backed synthesizer.
//!
//! Posts `{prompt, model}` to a model service and classifies the response
//! by content type; the ordered normalization in the parent module does the
//! rest. Model invocations take seconds to tens of seconds depending on the
//! selector, so the client timeout is generous.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use pixelforge_core::ImageModel;

use super::{RawSynthesis, Synthesizer, SynthesisError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct SynthesizeRequest<'a> {
    prompt: &'a str,
    model: &'a str,
}

#[derive(Debug, Clone)]
pub struct HttpSynthesizer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSynthesizer {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, SynthesisError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SynthesisError::Client(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(
        &self,
        prompt: &str,
        model: ImageModel,
    ) -> Result<RawSynthesis, SynthesisError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SynthesizeRequest {
                prompt,
                model: model.as_str(),
            })
            .send()
            .await
            .map_err(|e| SynthesisError::Upstream(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Upstream(format!(
                "model service returned {status}: {detail}"
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        debug!(%content_type, model = model.as_str(), "synthesis response received");

        if content_type.starts_with("application/json") {
            let value = response
                .json()
                .await
                .map_err(|e| SynthesisError::Decode(format!("invalid JSON response: {e}")))?;
            return Ok(RawSynthesis::Value(value));
        }

        if content_type.starts_with("image/") || content_type.starts_with("application/octet-stream")
        {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| SynthesisError::Upstream(format!("body read failed: {e}")))?;
            return Ok(RawSynthesis::Bytes(bytes.to_vec()));
        }

        // Unknown content type: drain the body chunk by chunk and let the
        // byte-stream fallback have it.
        let mut response = response;
        let mut chunks = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| SynthesisError::Upstream(format!("body read failed: {e}")))?
        {
            chunks.push(chunk.to_vec());
        }
        Ok(RawSynthesis::Chunks(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_construction_succeeds() {
        assert!(HttpSynthesizer::new("http://127.0.0.1:9/generate").is_ok());
    }
}
