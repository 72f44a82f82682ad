//! Generated-file metadata adapter.
//!
//! Parses a directory of previously generated `schema.sql` / `procs.sql` /
//! `triggers.sql` files back into descriptors, so two file sets (or a file
//! set and a live database) can be diffed without any connection.

mod reader;

pub use reader::FileSource;

/// File names the generator writes and this adapter reads.
pub const SCHEMA_FILE: &str = "schema.sql";
pub const PROCS_FILE: &str = "procs.sql";
pub const TRIGGERS_FILE: &str = "triggers.sql";
