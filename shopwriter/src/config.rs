//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `SHOPWRITER_CONFIG`
//! environment variable. A missing file is not an error: every field has a default except the
//! Gemini API key.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `SHOPWRITER_` override YAML values
//! 3. **GEMINI_API_KEY** - Special case: overrides `gemini.api_key` if set
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `SHOPWRITER_GEMINI__MODEL=gemini-2.5-pro` sets the `gemini.model` field.
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Credential for the generation service (required)
//! GEMINI_API_KEY="..."
//!
//! # Override server port
//! SHOPWRITER_PORT=8080
//!
//! # Allow larger uploads
//! SHOPWRITER_UPLOADS__MAX_BODY_SIZE=52428800
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};
use url::Url;

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "SHOPWRITER_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment variables.
/// All fields have defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Connection settings for the hosted generation service
    pub gemini: GeminiConfig,
    /// Limits applied to uploaded product images
    pub uploads: UploadConfig,
    /// Cross-origin settings for browser clients
    pub cors: CorsConfig,
    /// Enable Prometheus metrics endpoint at `/internal/metrics`
    pub enable_metrics: bool,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

/// Generation service settings.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeminiConfig {
    /// API key sent as `x-goog-api-key`. Usually supplied through `GEMINI_API_KEY`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL of the Generative Language API
    pub api_base: Url,
    /// Model identifier used for every generation request
    pub model: String,
    /// Upper bound on a single generation round trip
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

// Hand-written so the API key never ends up in logs.
impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base.as_str())
            .field("model", &self.model)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Upload limits for the content generation endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Maximum size of the whole multipart body in bytes
    pub max_body_size: usize,
    /// Maximum number of images accepted in one request
    pub max_images: usize,
    /// Maximum width or height (in pixels) the decoder will accept
    pub max_image_dimension: u32,
    /// Maximum pixel buffer (in bytes) the decoder may allocate for a single image
    pub max_decoded_bytes: u64,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://shop.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            gemini: GeminiConfig::default(),
            uploads: UploadConfig::default(),
            cors: CorsConfig::default(),
            enable_metrics: true,
            enable_otel_export: false,
        }
    }
}

impl GeminiConfig {
    pub const DEFAULT_MODEL: &'static str = "gemini-2.5-flash";
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: Url::parse("https://generativelanguage.googleapis.com").expect("static URL is valid"),
            model: Self::DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_body_size: 20 * 1024 * 1024, // 20 MB
            max_images: 10,
            max_image_dimension: 8192,
            max_decoded_bytes: 256 * 1024 * 1024, // 8192x8192 RGBA
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                CorsOrigin::Url(Url::parse("http://localhost:8080").expect("static URL is valid")),
                CorsOrigin::Url(Url::parse("http://127.0.0.1:3000").expect("static URL is valid")),
            ],
            allow_credentials: true,
            max_age: Some(3600), // Cache preflight for 1 hour
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.api_key().is_none() {
            return Err(Error::InvalidConfig {
                message: "GEMINI_API_KEY is not set. \
                     Please set the GEMINI_API_KEY environment variable or add gemini.api_key to the config file."
                    .to_string(),
            });
        }

        if self.gemini.model.trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: "gemini.model cannot be empty".to_string(),
            });
        }

        if self.gemini.request_timeout.is_zero() {
            return Err(Error::InvalidConfig {
                message: "gemini.request_timeout must be greater than zero".to_string(),
            });
        }

        let uploads = &self.uploads;
        if uploads.max_body_size == 0
            || uploads.max_images == 0
            || uploads.max_image_dimension == 0
            || uploads.max_decoded_bytes == 0
        {
            return Err(Error::InvalidConfig {
                message: "upload limits (max_body_size, max_images, max_image_dimension, max_decoded_bytes) must be non-zero"
                    .to_string(),
            });
        }

        // tower-http refuses to build a credentialed CORS layer with a wildcard origin
        if self.cors.allow_credentials && self.cors.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
            return Err(Error::InvalidConfig {
                message: "cors.allowed_origins cannot contain '*' when cors.allow_credentials is true".to_string(),
            });
        }

        Ok(())
    }

    /// The configured API key, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        self.gemini.api_key.as_deref().map(str::trim).filter(|key| !key.is_empty())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("SHOPWRITER_").ignore(&["CONFIG"]).split("__"))
            // The conventional credential variable
            .merge(Env::raw().only(&["GEMINI_API_KEY"]).map(|_| "gemini.api_key".into()))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
