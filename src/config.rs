//! Configuration management.
//!
//! Loads configuration from environment variables using dotenvy.
//! All settings are loaded at startup and stored in a thread-safe Arc.

mod error;
mod settings;

pub use error::{RelayError, Result};
pub use settings::{
    Config, DEFAULT_PLACEHOLDER_TEXT, DEFAULT_SECRET_KEY, PublicScheme, QueryPolicy,
};
