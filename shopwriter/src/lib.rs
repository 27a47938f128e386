//! # shopwriter: product copy from product photos
//!
//! `shopwriter` is a small HTTP service for online sellers. A client uploads one or more
//! photographs of a product together with a little context (target platform, store name, whether
//! the post is a sale, contact details, keywords) and gets back ready-to-post marketing copy: a
//! one-sentence product summary, a social caption, an SEO description, and eight hashtags.
//!
//! ## Request Flow
//!
//! `POST /content/generate` takes a multipart form with repeated `files` parts and one
//! `context_data` part holding a JSON string. The handler:
//!
//! 1. rejects uploads with no files (400),
//! 2. parses `context_data` into a [`api::models::content::ContentRequest`] (422 on failure),
//! 3. checks and decodes every image in upload order ([`ingest`], 400 on failure),
//! 4. builds a platform-specific prompt and makes one schema-constrained call to Gemini
//!    ([`generation`]), answering 503 when the service cannot be reached and 500 when it returns
//!    something unusable.
//!
//! Nothing is stored. The generation client is built once at startup and shared through
//! [`AppState`]; tests swap it for an in-memory fake via the [`generation::ContentGenerator`]
//! trait.
//!
//! ## Other Endpoints
//!
//! - `GET /`: welcome message
//! - `GET /healthz`: liveness probe
//! - `GET /docs`, `GET /openapi.json`: API reference
//! - `GET /internal/metrics`: Prometheus metrics, when `enable_metrics` is set
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod config;
pub mod errors;
pub mod generation;
pub mod ingest;
mod openapi;
pub mod telemetry;

#[cfg(test)]
pub mod test_utils;

use crate::config::CorsOrigin;
use crate::generation::{ContentGenerator, GeminiClient};
use crate::openapi::ApiDoc;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{Json, Router, routing::get, routing::post};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Application state shared across all request handlers.
///
/// `generator` is `None` only when no generation client could be configured; the content
/// endpoint then answers 503.
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .generator(Arc::new(client))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub generator: Option<Arc<dyn ContentGenerator>>,
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let allow_origin = if config.cors.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Origins never carry a path, and Url always renders one
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(config.cors.allow_credentials);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// # Errors
///
/// Returns an error if the CORS configuration is invalid.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let router = Router::new()
        .route("/", get(api::handlers::root::read_root))
        .route("/healthz", get(|| async { "OK" }))
        .route("/content/generate", post(api::handlers::content::generate_content))
        .with_state(state.clone())
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(state.config.uploads.max_body_size));

    let cors_layer = create_cors_layer(&state.config)?;
    let mut router = router.layer(cors_layer);

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Top-level container owning the router and configuration.
///
/// 1. **Create**: [`Application::new`] builds the generation client and the router
/// 2. **Serve**: [`Application::serve`] binds the configured address and handles requests until
///    the shutdown future resolves, then flushes telemetry
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application with a Gemini client built from `config`.
    ///
    /// Fails if the API key is missing or the HTTP client cannot be built.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting shopwriter with configuration: {:#?}", config);

        let client = GeminiClient::new(&config.gemini)?;
        info!(model = client.model(), endpoint = %client.endpoint(), "Gemini client initialized");
        let generator: Arc<dyn ContentGenerator> = Arc::new(client);

        let state = AppState::builder().config(config).generator(generator).build();
        Self::from_state(state)
    }

    /// Create an application around prepared state.
    pub fn from_state(state: AppState) -> anyhow::Result<Self> {
        let router = build_router(&state)?;
        Ok(Self {
            router,
            config: state.config,
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "shopwriter listening on http://{}, docs at http://localhost:{}/docs",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeGenerator, create_test_app_with_config, create_test_config, sample_content_response};
    use axum::http::{HeaderName, StatusCode, header};

    #[test]
    fn test_application_requires_api_key() {
        let mut config = create_test_config();
        config.gemini.api_key = None;

        assert!(Application::new(config).is_err());
    }

    #[test]
    fn test_cors_layer_accepts_wildcard_without_credentials() {
        let mut config = create_test_config();
        config.cors.allowed_origins = vec![CorsOrigin::Wildcard];
        config.cors.allow_credentials = false;

        assert!(create_cors_layer(&config).is_ok());
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_configured_origin() {
        let generator: Arc<dyn ContentGenerator> = Arc::new(FakeGenerator::returning(sample_content_response()));
        let server = create_test_app_with_config(create_test_config(), Some(generator));

        let response = server
            .method(axum::http::Method::OPTIONS, "/content/generate")
            .add_header(header::ORIGIN, HeaderValue::from_static("http://localhost:8080"))
            .add_header(header::ACCESS_CONTROL_REQUEST_METHOD, HeaderValue::from_static("POST"))
            .add_header(
                HeaderName::from_static("access-control-request-headers"),
                HeaderValue::from_static("content-type"),
            )
            .await;

        response.assert_status(StatusCode::OK);
        assert_eq!(
            response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            HeaderValue::from_static("http://localhost:8080")
        );
        assert_eq!(
            response.header(header::ACCESS_CONTROL_ALLOW_CREDENTIALS),
            HeaderValue::from_static("true")
        );
    }

    #[tokio::test]
    async fn test_cors_ignores_unknown_origin() {
        let server = create_test_app_with_config(create_test_config(), None);

        let response = server
            .get("/")
            .add_header(header::ORIGIN, HeaderValue::from_static("https://evil.example.com"))
            .await;

        response.assert_status_ok();
        assert!(response.maybe_header(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}
