//! KYC Profile Lookup API Library
//!
//! Looks up a social-media handle, fans out to two generative AI backends
//! (Gemini, OpenAI) and the Instagram profile scrape, and merges the results
//! into one fully populated profile record.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core business logic.
//! - `data`: Data access layer.
//! - `integrations`: External service integrations.
//! - `obs`: Observability and logging.
//! - `cache_validator`: Checksummed history entries.
//! - `circuit_breaker`: Circuit breaker for archive writes.
//! - `config`: Configuration management.
//! - `db_storage`: Postgres report archive (pool, schema, queries).
//! - `enrichment`: Handle normalization and profile aggregation.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `history`: Bounded per-handle lookup history.
//! - `model_output`: Tolerant parsing of model responses.
//! - `models`: Core data models.
//! - `prompts`: Prompt and schema text sent to the models.
//! - `report`: Plain-text profile report.
//! - `services`: External service clients (Gemini, OpenAI, Instagram).

pub mod api;
pub mod core;
pub mod data;
pub mod integrations;
pub mod obs;

// Re-export primary modules for shared use in tests and other binaries
pub mod cache_validator;
pub mod circuit_breaker;
pub mod config;
pub mod db_storage;
pub mod enrichment;
pub mod errors;
pub mod handlers;
pub mod history;
pub mod model_output;
pub mod models;
pub mod prompts;
pub mod report;
pub mod services;
