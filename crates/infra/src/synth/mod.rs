//! Synthesis collaborator: invoke a model, normalize whatever comes back.
//!
//! Upstream model services return image data in several shapes. Rather than
//! probing speculatively, [`normalize`] applies one ordered decision table:
//! raw bytes, then a single-value image-bearing container (base64-decoded
//! when textually encoded), then a generic byte-stream fallback.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde_json::Value;
use tokio::time::Instant;

use pixelforge_core::ImageModel;

mod http;

pub use http::HttpSynthesizer;

/// Synthesis failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SynthesisError {
    #[error("http client construction failed: {0}")]
    Client(String),
    #[error("model invocation failed: {0}")]
    Upstream(String),
    #[error("could not decode model response: {0}")]
    Decode(String),
    #[error("model returned no image data")]
    Empty,
}

/// Raw response from a model service, prior to normalization.
#[derive(Debug, Clone)]
pub enum RawSynthesis {
    /// Already-normalized image bytes.
    Bytes(Vec<u8>),
    /// A JSON container holding a single (usually base64) image value.
    Value(Value),
    /// A stream collected as chunks; concatenated as a last resort.
    Chunks(Vec<Vec<u8>>),
}

/// Invokes the external model.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(
        &self,
        prompt: &str,
        model: ImageModel,
    ) -> Result<RawSynthesis, SynthesisError>;
}

/// Normalized synthesis output plus how long the model took.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub bytes: Vec<u8>,
    pub elapsed: Duration,
}

/// Run a synthesizer and normalize its response, timing the whole call.
pub async fn synthesize_normalized(
    synthesizer: &dyn Synthesizer,
    prompt: &str,
    model: ImageModel,
) -> Result<Synthesis, SynthesisError> {
    let started = Instant::now();
    let raw = synthesizer.synthesize(prompt, model).await?;
    let bytes = normalize(raw)?;
    Ok(Synthesis {
        bytes,
        elapsed: started.elapsed(),
    })
}

/// JSON keys that carry the image value in known container shapes.
const IMAGE_KEYS: [&str; 3] = ["image", "b64_json", "data"];

/// Normalize a raw response into image bytes.
pub fn normalize(raw: RawSynthesis) -> Result<Vec<u8>, SynthesisError> {
    let bytes = match raw {
        RawSynthesis::Bytes(bytes) => bytes,
        RawSynthesis::Value(value) => decode_container(&value)?,
        RawSynthesis::Chunks(chunks) => chunks.concat(),
    };

    if bytes.is_empty() {
        return Err(SynthesisError::Empty);
    }
    Ok(bytes)
}

/// Pull the image value out of a single-value container and decode it.
fn decode_container(value: &Value) -> Result<Vec<u8>, SynthesisError> {
    match value {
        Value::String(s) => decode_base64(s),
        Value::Object(map) => {
            for key in IMAGE_KEYS {
                if let Some(Value::String(s)) = map.get(key) {
                    return decode_base64(s);
                }
            }
            // Tolerate an unknown key when the container really is
            // single-valued and textual.
            if map.len() == 1 {
                if let Some(Value::String(s)) = map.values().next() {
                    return decode_base64(s);
                }
            }
            Err(SynthesisError::Decode(
                "JSON response carries no image field".to_string(),
            ))
        }
        other => Err(SynthesisError::Decode(format!(
            "unsupported JSON response shape: {other}"
        ))),
    }
}

fn decode_base64(encoded: &str) -> Result<Vec<u8>, SynthesisError> {
    // Some services wrap the payload in a data URL.
    let encoded = encoded
        .split_once(";base64,")
        .map(|(_, rest)| rest)
        .unwrap_or(encoded);

    base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| SynthesisError::Decode(format!("invalid base64 image payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n";

    fn b64(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn raw_bytes_pass_through() {
        let out = normalize(RawSynthesis::Bytes(PNG_MAGIC.to_vec())).unwrap();
        assert_eq!(out, PNG_MAGIC);
    }

    #[test]
    fn empty_bytes_are_an_error() {
        assert!(matches!(
            normalize(RawSynthesis::Bytes(Vec::new())),
            Err(SynthesisError::Empty)
        ));
    }

    #[test]
    fn known_container_keys_decode() {
        for key in ["image", "b64_json", "data"] {
            let value = json!({ key: b64(PNG_MAGIC) });
            let out = normalize(RawSynthesis::Value(value)).unwrap();
            assert_eq!(out, PNG_MAGIC);
        }
    }

    #[test]
    fn bare_string_container_decodes() {
        let out = normalize(RawSynthesis::Value(json!(b64(PNG_MAGIC)))).unwrap();
        assert_eq!(out, PNG_MAGIC);
    }

    #[test]
    fn single_unknown_key_still_decodes() {
        let value = json!({ "artifact": b64(PNG_MAGIC) });
        let out = normalize(RawSynthesis::Value(value)).unwrap();
        assert_eq!(out, PNG_MAGIC);
    }

    #[test]
    fn data_url_prefix_is_stripped() {
        let value = json!(format!("data:image/png;base64,{}", b64(PNG_MAGIC)));
        let out = normalize(RawSynthesis::Value(value)).unwrap();
        assert_eq!(out, PNG_MAGIC);
    }

    #[test]
    fn multi_key_object_without_image_field_fails() {
        let value = json!({ "status": "ok", "took_ms": 1200 });
        assert!(matches!(
            normalize(RawSynthesis::Value(value)),
            Err(SynthesisError::Decode(_))
        ));
    }

    #[test]
    fn chunks_concatenate_in_order() {
        let chunks = vec![b"\x89PNG".to_vec(), b"\r\n".to_vec()];
        let out = normalize(RawSynthesis::Chunks(chunks)).unwrap();
        assert_eq!(out, PNG_MAGIC);
    }

    #[test]
    fn empty_chunks_are_an_error() {
        assert!(matches!(
            normalize(RawSynthesis::Chunks(vec![])),
            Err(SynthesisError::Empty)
        ));
    }

    #[test]
    fn invalid_base64_is_a_decode_error() {
        let value = json!({ "image": "%%%not-base64%%%" });
        assert!(matches!(
            normalize(RawSynthesis::Value(value)),
            Err(SynthesisError::Decode(_))
        ));
    }
}
