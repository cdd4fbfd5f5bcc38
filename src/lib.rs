//! # copycheck
//!
//! Plagiarism checking for assignment submissions.
//!
//! A submission is stored, registered as a work, and compared against every
//! earlier work of the same assignment with a k-shingle Jaccard detector.
//! The best match becomes a report that can be read back from the CLI or
//! the HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌────────────────────┐
//! │ CLI/HTTP │──▶│  Submission  │──▶│ SQLite records +   │
//! │          │   │  pipeline    │   │ local blob dir     │
//! └──────────┘   └──────┬───────┘   └────────────────────┘
//!                       │
//!                       ▼
//!              ┌─────────────────┐
//!              │ copycheck-core  │
//!              │ shingle/Jaccard │
//!              └─────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! copycheck init
//! copycheck submit essay.txt --assignment <uuid> --student <uuid>
//! copycheck report <work_id>
//! copycheck serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite record stores |
//! | [`blob`] | Local blob storage |
//! | [`extract`] | Plain-text extraction |
//! | [`submission`] | Submission pipeline |
//! | [`reports`] | Report retrieval |
//! | [`wordcloud`] | Word-cloud links |
//! | [`services`] | Startup wiring |
//! | [`server`] | HTTP API |

pub mod blob;
pub mod config;
pub mod db;
pub mod extract;
pub mod migrate;
pub mod reports;
pub mod server;
pub mod services;
pub mod sqlite_store;
pub mod submission;
pub mod wordcloud;
