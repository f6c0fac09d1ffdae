//! # People-Finder Common Library
//!
//! Shared code for the contact-discovery pipeline:
//! - Common error type
//! - Configuration loading and data-directory resolution

pub mod config;
pub mod error;

pub use error::{Error, Result};
