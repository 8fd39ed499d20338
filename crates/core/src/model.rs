//! Model selector for image synthesis.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Which synthesis model a job runs against.
///
/// Fixed small enum; the concrete model endpoints behind each selector live
/// in infrastructure configuration, not here.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageModel {
    /// Low-latency model, the default.
    Fast,
    /// Middle ground between latency and fidelity.
    Balanced,
    /// Slowest, highest fidelity.
    Quality,
}

impl ImageModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageModel::Fast => "fast",
            ImageModel::Balanced => "balanced",
            ImageModel::Quality => "quality",
        }
    }
}

impl Default for ImageModel {
    fn default() -> Self {
        ImageModel::Fast
    }
}

impl core::fmt::Display for ImageModel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageModel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(ImageModel::Fast),
            "balanced" => Ok(ImageModel::Balanced),
            "quality" => Ok(ImageModel::Quality),
            other => Err(DomainError::validation(format!(
                "unknown model '{other}': must be one of fast, balanced, quality"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("FAST".parse::<ImageModel>().unwrap(), ImageModel::Fast);
        assert_eq!("quality".parse::<ImageModel>().unwrap(), ImageModel::Quality);
    }

    #[test]
    fn unknown_model_is_a_validation_error() {
        assert!(matches!(
            "sdxl-turbo".parse::<ImageModel>(),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn default_is_the_fast_model() {
        assert_eq!(ImageModel::default(), ImageModel::Fast);
    }
}
