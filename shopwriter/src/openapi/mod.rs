//! OpenAPI documentation for the content generation API.
//!
//! The document is served as JSON at `/openapi.json` and rendered with Scalar at `/docs`.

use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "E-commerce Content Generator AI",
        version = "2.0.0",
        description = "Generates product descriptions, social captions, and hashtags from product images using Gemini."
    ),
    paths(
        api::handlers::root::read_root,
        api::handlers::content::generate_content,
    ),
    components(
        schemas(
            api::models::content::ContentRequest,
            api::models::content::ContentResponse,
            api::models::content::ErrorResponse,
            api::models::content::GenerateContentForm,
            api::models::content::WelcomeResponse,
        )
    ),
    tags(
        (name = "content", description = "Generate marketing copy from product photographs.

Upload one or more `files` (images) together with a `context_data` JSON string describing:
- `post_medium`: the target platform (required, e.g. Instagram, Daraz, eBay)
- `company_name`, `contact_info`, `keywords`: optional seller details
- `is_offer`: whether the post promotes a sale

Instagram and Facebook receive short social copy; every other platform receives marketplace listing copy."),
        (name = "root", description = "Service information."),
    )
)]
pub struct ApiDoc;
