//! Shared fixtures for unit and handler tests.

use crate::api::models::content::{ContentRequest, ContentResponse};
use crate::config::Config;
use crate::generation::{ContentGenerator, GenerationError};
use crate::ingest::{Bitmap, UploadedImage};
use crate::{AppState, Application};
use async_trait::async_trait;
use axum_test::TestServer;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::{Arc, Mutex, Once};

/// reqwest is built without a default crypto provider; install one once per test binary.
pub fn install_crypto_provider() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    });
}

/// Encode a small gradient image in `format`.
pub fn sample_image_bytes(format: ImageFormat, width: u32, height: u32) -> Bytes {
    let image = RgbImage::from_fn(width, height, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 128]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut buf), format)
        .expect("Failed to encode sample image");
    Bytes::from(buf)
}

pub fn sample_bitmap(format: ImageFormat, width: u32, height: u32) -> Bitmap {
    let limits = crate::ingest::DecodeLimits {
        max_dimension: u32::MAX,
        max_decoded_bytes: u64::MAX,
    };
    crate::ingest::decode(sample_image_bytes(format, width, height), limits).expect("Failed to decode sample image")
}

pub fn upload(filename: &str, content_type: &str, data: Bytes) -> UploadedImage {
    UploadedImage {
        filename: filename.to_string(),
        content_type: Some(content_type.to_string()),
        data,
    }
}

pub fn sample_content_response() -> ContentResponse {
    ContentResponse {
        product_summary: "Waterproof trail running shoes for weekend hikers who want grip and comfort.".to_string(),
        social_caption: "Conquer every trail this weekend with shoes built for the wild! 🥾".to_string(),
        seo_description: "Lightweight waterproof trail running shoes with a grippy outsole, breathable mesh upper, \
                          and cushioned midsole for all-day comfort on rugged terrain."
            .to_string(),
        hashtags: [
            "#TrailRunning",
            "#HikingShoes",
            "#Waterproof",
            "#OutdoorGear",
            "#RunningShoes",
            "#AdventureReady",
            "#SriLankaShopping",
            "#NewArrivals",
        ]
        .into_iter()
        .map(String::from)
        .collect(),
    }
}

/// What a [`FakeGenerator`] saw on one call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub request: ContentRequest,
    pub image_sizes: Vec<(u32, u32)>,
    pub image_mime_types: Vec<&'static str>,
}

enum FakeOutcome {
    Respond(ContentResponse),
    Malformed,
}

/// In-memory [`ContentGenerator`] that records its inputs.
pub struct FakeGenerator {
    outcome: FakeOutcome,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeGenerator {
    pub fn returning(response: ContentResponse) -> Self {
        Self {
            outcome: FakeOutcome::Respond(response),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fails every call as if the model answered with the wrong JSON shape.
    pub fn malformed() -> Self {
        Self {
            outcome: FakeOutcome::Malformed,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentGenerator for FakeGenerator {
    async fn generate(&self, images: &[Bitmap], request: &ContentRequest) -> Result<ContentResponse, GenerationError> {
        self.calls.lock().unwrap().push(RecordedCall {
            request: request.clone(),
            image_sizes: images.iter().map(|image| (image.width(), image.height())).collect(),
            image_mime_types: images.iter().map(Bitmap::mime_type).collect(),
        });

        match &self.outcome {
            FakeOutcome::Respond(response) => Ok(response.clone()),
            FakeOutcome::Malformed => Err(GenerationError::MalformedOutput(
                serde_json::from_str::<ContentResponse>(r#"{"product_summary":"only"}"#).unwrap_err(),
            )),
        }
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        gemini: crate::config::GeminiConfig {
            api_key: Some("test-key".to_string()),
            ..Default::default()
        },
        // The Prometheus recorder is process-global and can only be installed once
        enable_metrics: false,
        enable_otel_export: false,
        ..Default::default()
    }
}

pub fn create_test_app(generator: Option<Arc<dyn ContentGenerator>>) -> TestServer {
    create_test_app_with_config(create_test_config(), generator)
}

pub fn create_test_app_with_config(config: Config, generator: Option<Arc<dyn ContentGenerator>>) -> TestServer {
    let state = AppState::builder().config(config).maybe_generator(generator).build();
    Application::from_state(state)
        .expect("Failed to create application")
        .into_test_server()
}
