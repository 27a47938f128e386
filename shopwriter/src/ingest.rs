//! Image ingestion: validates uploaded product photos and prepares them for generation.
//!
//! Decoding is CPU-bound and synchronous, so every file is decoded on tokio's blocking pool while
//! the request task waits. Each decode is bounded in dimensions and in pixel-buffer size, and the
//! pixels are released before the request moves on to the upstream call.

use crate::config::UploadConfig;
use crate::errors::{Error, Result};
use bytes::Bytes;
use image::{DynamicImage, ImageError, ImageFormat, ImageReader, Limits};
use std::io::Cursor;
use tracing::{debug, instrument};

/// A file part received in the multipart body.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub filename: String,
    /// Declared media type of the part, if the client sent one
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedImage {
    fn is_declared_image(&self) -> bool {
        self.content_type.as_deref().is_some_and(|ct| ct.starts_with("image/"))
    }
}

/// A validated product image, ready to forward to the generation service.
///
/// Only the dimensions survive decoding; the pixel buffer is dropped on the blocking pool. The
/// forwarded encoding is the upload itself for JPEG, PNG and WebP, and a PNG re-encode of the
/// decoded pixels for every other format.
#[derive(Debug, Clone)]
pub struct Bitmap {
    width: u32,
    height: u32,
    source_format: ImageFormat,
    format: ImageFormat,
    encoded: Bytes,
}

impl Bitmap {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Format detected in the uploaded bytes
    pub fn source_format(&self) -> ImageFormat {
        self.source_format
    }

    /// Format of [`Bitmap::encoded`]
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// MIME type of the forwarded encoding (e.g. `image/jpeg`)
    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }
}

/// Formats the generation service accepts as inline image data.
fn is_forwardable(format: ImageFormat) -> bool {
    matches!(format, ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP)
}

/// Bounds applied to every single decode.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DecodeLimits {
    pub max_dimension: u32,
    pub max_decoded_bytes: u64,
}

impl From<&UploadConfig> for DecodeLimits {
    fn from(config: &UploadConfig) -> Self {
        Self {
            max_dimension: config.max_image_dimension,
            max_decoded_bytes: config.max_decoded_bytes,
        }
    }
}

/// Check the upload count before any other request work happens.
pub fn ensure_upload_count(files: &[UploadedImage], limits: &UploadConfig) -> Result<()> {
    if files.is_empty() {
        return Err(Error::InvalidInput {
            message: "No product images uploaded. At least one image is required.".to_string(),
        });
    }

    if files.len() > limits.max_images {
        return Err(Error::InvalidInput {
            message: format!(
                "Too many images uploaded ({}). At most {} images are allowed.",
                files.len(),
                limits.max_images
            ),
        });
    }

    Ok(())
}

/// Validate and decode the uploaded files, preserving their order.
#[instrument(skip_all, fields(count = files.len()))]
pub async fn process_images(files: Vec<UploadedImage>, limits: &UploadConfig) -> Result<Vec<Bitmap>> {
    ensure_upload_count(&files, limits)?;

    let mut images = Vec::with_capacity(files.len());
    for file in files {
        if !file.is_declared_image() {
            return Err(Error::InvalidInput {
                message: format!("File {} is not a valid image type.", file.filename),
            });
        }

        let decode_limits = DecodeLimits::from(limits);
        let data = file.data.clone();
        let decoded = tokio::task::spawn_blocking(move || decode(data, decode_limits))
            .await
            .map_err(|e| Error::Internal {
                operation: format!("join image decoding task: {e}"),
            })?;

        let bitmap = decoded.map_err(|e| {
            tracing::warn!(filename = %file.filename, error = ?e, "Failed to decode uploaded image");
            Error::InvalidInput {
                message: format!(
                    "Could not process image file: {}. Reason: {}: {}",
                    file.filename,
                    error_kind(&e),
                    e
                ),
            }
        })?;

        debug!(
            filename = %file.filename,
            source_format = ?bitmap.source_format(),
            format = ?bitmap.format(),
            width = bitmap.width(),
            height = bitmap.height(),
            "Decoded uploaded image"
        );
        images.push(bitmap);
    }

    Ok(images)
}

/// Blocking decode of a single image.
///
/// Both axes are capped at `max_dimension` and the pixel buffer at `max_decoded_bytes`.
pub(crate) fn decode(data: Bytes, limits: DecodeLimits) -> image::ImageResult<Bitmap> {
    let source_format = image::guess_format(&data)?;

    let mut decoder_limits = Limits::default();
    decoder_limits.max_image_width = Some(limits.max_dimension);
    decoder_limits.max_image_height = Some(limits.max_dimension);
    decoder_limits.max_alloc = Some(limits.max_decoded_bytes);

    let mut reader = ImageReader::with_format(Cursor::new(data.as_ref()), source_format);
    reader.limits(decoder_limits);
    let pixels = reader.decode()?;

    let (format, encoded) = if is_forwardable(source_format) {
        (source_format, data)
    } else {
        (ImageFormat::Png, encode_png(&pixels)?)
    };

    Ok(Bitmap {
        width: pixels.width(),
        height: pixels.height(),
        source_format,
        format,
        encoded,
    })
}

/// PNG re-encode at 8 bits per channel; float and 16-bit sources are narrowed first.
fn encode_png(pixels: &DynamicImage) -> image::ImageResult<Bytes> {
    let narrowed = if pixels.color().has_alpha() {
        DynamicImage::ImageRgba8(pixels.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(pixels.to_rgb8())
    };

    let mut buf = Vec::new();
    narrowed.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(Bytes::from(buf))
}

/// Name of the decoder error class, reported back to the uploader.
#[allow(unreachable_patterns)]
fn error_kind(err: &ImageError) -> &'static str {
    match err {
        ImageError::Decoding(_) => "DecodingError",
        ImageError::Encoding(_) => "EncodingError",
        ImageError::Parameter(_) => "ParameterError",
        ImageError::Limits(_) => "LimitError",
        ImageError::Unsupported(_) => "UnsupportedError",
        ImageError::IoError(_) => "IoError",
        _ => "ImageError",
    }
}
