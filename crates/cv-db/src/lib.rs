//! cv-db: database access and persistence layer.
//!
//! This crate provides SQLite-backed storage for upload batches and per-file
//! metadata, with connection pooling, embedded migrations, and typed models.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
