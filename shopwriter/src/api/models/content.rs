//! Request and response shapes for content generation.

use crate::errors::Error;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Seller-supplied context sent as the `context_data` form field (a JSON-encoded string).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ContentRequest {
    /// Target publishing surface, e.g. 'Instagram', 'Daraz', 'Etsy', 'eBay'.
    #[schema(example = "Instagram")]
    pub post_medium: String,
    /// The name of the company or store.
    #[serde(default)]
    #[schema(example = "Divelanka")]
    pub company_name: Option<String>,
    /// True if the post is for a sale or special offer.
    #[serde(default)]
    #[schema(example = true)]
    pub is_offer: bool,
    /// Contact number, website, or social handle.
    #[serde(default)]
    #[schema(example = "@StylishGoodsSL")]
    pub contact_info: Option<String>,
    /// Specific SEO keywords or selling points to emphasize.
    #[serde(default)]
    #[schema(example = "waterproof, durable, limited stock")]
    pub keywords: Option<String>,
}

impl ContentRequest {
    /// Parse the raw `context_data` form value.
    ///
    /// Fails with [`Error::Validation`] on malformed JSON, a missing `post_medium`, or a blank one.
    pub fn from_context_data(raw: &str) -> Result<Self, Error> {
        let request: Self = serde_json::from_str(raw).map_err(|e| Error::Validation { message: e.to_string() })?;

        if request.post_medium.trim().is_empty() {
            return Err(Error::Validation {
                message: "post_medium cannot be empty".to_string(),
            });
        }

        Ok(request)
    }
}

/// Generated marketing copy for the product shown in the uploaded images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ContentResponse {
    /// A short summary of the product, identified from the images.
    pub product_summary: String,
    /// A short, engaging caption optimized for the specified social media.
    pub social_caption: String,
    /// The main, professional, and SEO-optimized product description.
    pub seo_description: String,
    /// A list of 8 relevant, trending, and SEO-friendly hashtags.
    pub hashtags: Vec<String>,
}

/// Error body returned for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "AI content generation failed. Please try again later.")]
    pub detail: String,
}

/// Multipart body of `POST /content/generate` (documentation only).
#[derive(ToSchema)]
#[allow(unused)]
pub struct GenerateContentForm {
    /// One or more images of the product.
    #[schema(value_type = Vec<String>, format = Binary)]
    files: Vec<Vec<u8>>,
    /// JSON string of the required ContentRequest data.
    #[schema(example = r#"{"post_medium":"Instagram","company_name":"Divelanka","is_offer":true}"#)]
    context_data: String,
}

/// Welcome payload served at `/`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WelcomeResponse {
    pub message: String,
}
