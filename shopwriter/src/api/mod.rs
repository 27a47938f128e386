//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//!
//! # API Structure
//!
//! - **Content** (`/content/generate`): multipart upload of product images plus seller context,
//!   answered with generated marketing copy
//! - **Root** (`/`): welcome message pointing at the interactive docs
//!
//! All endpoints are documented with `utoipa`; the interactive reference is served at `/docs`.

pub mod handlers;
pub mod models;
