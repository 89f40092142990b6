//! # Gearpoll Common Library
//!
//! Shared code for the gearpoll survey service including:
//! - Error types
//! - Configuration loading
//! - Database initialization and record access
//! - Catalog loading (gear descriptions and images)
//! - Pairing engine (pair generation, resume filter, session progress)

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod pairing;

pub use error::{Error, Result};
pub use models::{AnswerRecord, AnswerResult, CatalogItem, Language, RespondentIdentity};
