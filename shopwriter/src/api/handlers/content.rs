use crate::AppState;
use crate::api::models::content::{ContentRequest, ContentResponse, ErrorResponse, GenerateContentForm};
use crate::errors::{Error, Result};
use crate::generation;
use crate::ingest::{self, UploadedImage};
use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
};
use tracing::{debug, info};

/// Raw multipart form, before any validation.
struct GenerateForm {
    files: Vec<UploadedImage>,
    context_data: Option<String>,
}

fn multipart_error(e: MultipartError, max_body_size: usize) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge {
            message: format!("Request body exceeds the maximum allowed size of {max_body_size} bytes"),
        }
    } else {
        Error::InvalidInput {
            message: format!("Failed to parse multipart data: {}", e.body_text()),
        }
    }
}

async fn read_form(mut multipart: Multipart, max_body_size: usize) -> Result<GenerateForm> {
    let mut files = Vec::new();
    let mut context_data = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(e, max_body_size))? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "files" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(|e| multipart_error(e, max_body_size))?;

                debug!(filename = %filename, content_type = ?content_type, size = data.len(), "Received upload");
                files.push(UploadedImage {
                    filename,
                    content_type,
                    data,
                });
            }
            "context_data" => {
                context_data = Some(field.text().await.map_err(|e| multipart_error(e, max_body_size))?);
            }
            other => {
                debug!(field = other, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(GenerateForm { files, context_data })
}

#[utoipa::path(
    post,
    path = "/content/generate",
    tag = "content",
    summary = "Generate product content",
    description = "Analyzes one or more product images with user context to generate a product summary, \
                   a social caption, an SEO description, and hashtags.",
    request_body(
        content = GenerateContentForm,
        content_type = "multipart/form-data",
        description = "Product images (`files`, repeatable) and seller context (`context_data`, JSON string)"
    ),
    responses(
        (status = 200, description = "Generated content", body = ContentResponse),
        (status = 400, description = "No images, non-image file, or undecodable image", body = ErrorResponse),
        (status = 413, description = "Request body too large", body = ErrorResponse),
        (status = 422, description = "Invalid or incomplete context_data", body = ErrorResponse),
        (status = 500, description = "Content generation failed", body = ErrorResponse),
        (status = 503, description = "Generation service unavailable", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn generate_content(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<ContentResponse>> {
    let multipart = multipart.map_err(|e| Error::InvalidInput {
        message: format!("Failed to parse multipart data: {}", e.body_text()),
    })?;
    let limits = &state.config.uploads;

    let form = read_form(multipart, limits.max_body_size).await?;

    // Upload count is checked before the context so an empty upload is always a 400
    ingest::ensure_upload_count(&form.files, limits)?;

    let request = ContentRequest::from_context_data(form.context_data.as_deref().unwrap_or_default())?;

    let images = ingest::process_images(form.files, limits).await?;

    let response = generation::generate_content(state.generator.as_deref(), &images, &request).await?;

    info!(images = images.len(), post_medium = %request.post_medium, "Generated content for upload");
    Ok(Json(response))
}
