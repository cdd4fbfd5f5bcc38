//! # copycheck core
//!
//! Pure logic for copycheck: the submission data model, k-shingle Jaccard
//! similarity, best-match selection, and the collaborator traits the
//! submission pipeline is written against.
//!
//! This crate contains no tokio, sqlx, or filesystem I/O. Concrete
//! backends (SQLite, local blob directory, HTTP) live in the `copycheck`
//! crate; [`store::memory`] provides in-memory backends for tests.

pub mod error;
pub mod extract;
pub mod matching;
pub mod models;
pub mod similarity;
pub mod store;

pub use error::{Error, Result};
