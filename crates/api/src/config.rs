//! Environment-driven API configuration.

use std::path::PathBuf;

/// Runtime configuration for the API process.
///
/// Every knob has a development default so the binary starts with no
/// environment at all; production deployments set the `PIXELFORGE_*`
/// variables explicitly.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address the HTTP listener binds to.
    pub bind_addr: String,
    /// Bearer token required on all non-health endpoints. `None` disables
    /// auth (development only).
    pub api_token: Option<String>,
    /// URL of the image synthesis backend.
    pub synth_url: String,
    /// Directory rendered images are written to.
    pub artifact_dir: PathBuf,
    /// Public base URL under which `artifact_dir` is served.
    pub artifact_base_url: String,
    /// Delivery attempts per work unit before dead-lettering.
    pub queue_max_attempts: u32,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let api_token = match std::env::var("PIXELFORGE_API_TOKEN") {
            Ok(t) if !t.trim().is_empty() => Some(t),
            _ => {
                tracing::warn!("PIXELFORGE_API_TOKEN not set; API auth is DISABLED");
                None
            }
        };

        let queue_max_attempts = std::env::var("PIXELFORGE_QUEUE_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(5);

        Self {
            bind_addr: env_or("PIXELFORGE_BIND_ADDR", "0.0.0.0:8080"),
            api_token,
            synth_url: env_or("PIXELFORGE_SYNTH_URL", "http://127.0.0.1:5000/generate"),
            artifact_dir: PathBuf::from(env_or("PIXELFORGE_ARTIFACT_DIR", "./artifacts")),
            artifact_base_url: env_or("PIXELFORGE_ARTIFACT_BASE_URL", "/artifacts"),
            queue_max_attempts,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
