//! HTTP request handlers.
//!
//! - [`content`]: product content generation from uploaded images
//! - [`root`]: welcome message
//!
//! Handlers return [`crate::errors::Error`], which converts to a status code and a JSON
//! `{ "detail": ... }` body.

pub mod content;
pub mod root;
