//! Metadata acquisition adapters.
//!
//! Two interchangeable implementations of
//! [`SchemaSource`](crate::core::traits::SchemaSource): a live PostgreSQL
//! catalog reader and a parser for previously generated SQL file sets.

pub mod files;
pub mod postgres;
