//! # GPDB Common Library
//!
//! Core of the community registry of creators, layouts, collabs, music
//! and artists:
//! - Duration codec for `1h3min2s`-style lengths
//! - Record store over SQLite, including pending-request review
//! - Reconciliation of name references and derived counters
//! - Single-writer task queue that serializes every mutation
//! - Bootstrap configuration loading

pub mod config;
pub mod db;
pub mod duration;
pub mod error;
pub mod queue;

pub use db::{EntityKind, Store, Submission};
pub use error::{Error, Result};
pub use queue::{WriteOp, WriteQueue};
