//! Marketing copy generation.
//!
//! [`prompt`] turns the seller context into instructions, [`gemini`] ships the images and the
//! prompt to the hosted model and parses its schema-constrained JSON answer. Handlers only see the
//! [`ContentGenerator`] trait, so tests can swap the hosted model for a fake.

pub mod gemini;
pub mod prompt;

use crate::api::models::content::{ContentRequest, ContentResponse};
use crate::ingest::Bitmap;
use async_trait::async_trait;
use tracing::{info, instrument, warn};

pub use gemini::GeminiClient;
pub use prompt::PlatformStyle;

/// Number of hashtags the model is instructed to return.
pub const EXPECTED_HASHTAGS: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation client not initialized")]
    NotInitialized,

    #[error("could not reach generation service: {0}")]
    Connection(#[source] reqwest::Error),

    #[error("generation request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("generation service returned {status}: {body}")]
    Upstream { status: reqwest::StatusCode, body: String },

    #[error("generation service returned no content: {reason}")]
    EmptyResponse { reason: String },

    #[error("generation service response could not be decoded: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    #[error("generated content did not match the response schema: {0}")]
    MalformedOutput(#[source] serde_json::Error),
}

impl GenerationError {
    /// Classify transport failures: connect and timeout errors mean the service is unreachable.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            GenerationError::Connection(err)
        } else {
            GenerationError::Transport(err)
        }
    }

    /// Whether the failure means the service could not be used at all (as opposed to a bad answer).
    pub fn is_unavailable(&self) -> bool {
        matches!(self, GenerationError::NotInitialized | GenerationError::Connection(_))
    }
}

/// Produces marketing copy for a set of product images.
///
/// One call is one best-effort round trip: implementations do not retry, cache, or repair output.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, images: &[Bitmap], request: &ContentRequest) -> Result<ContentResponse, GenerationError>;

    /// Model identifier, for logs
    fn model(&self) -> &str;
}

/// Run a generation with the process-wide generator, if one was configured.
#[instrument(skip_all, fields(images = images.len(), post_medium = %request.post_medium))]
pub async fn generate_content(
    generator: Option<&dyn ContentGenerator>,
    images: &[Bitmap],
    request: &ContentRequest,
) -> Result<ContentResponse, GenerationError> {
    let generator = generator.ok_or(GenerationError::NotInitialized)?;

    let response = generator.generate(images, request).await?;

    // Counts are instructions to the model, not a contract we enforce
    if response.hashtags.len() != EXPECTED_HASHTAGS {
        warn!(
            model = generator.model(),
            hashtags = response.hashtags.len(),
            expected = EXPECTED_HASHTAGS,
            "Model returned an unexpected number of hashtags"
        );
    }

    info!(model = generator.model(), "Generated product content");
    Ok(response)
}
