//! # Digital Initiative Index
//!
//! Turns corporate reports (annual, governance, sustainability) into a
//! structured catalogue of digital transformation initiatives. An LLM does
//! the reading; this crate handles everything around it: segmenting long
//! documents, prompting, validating the engine's JSON, and storing the
//! results in SQLite for querying.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────┐
//! │  Reports     │──▶│ Pages+Chunks │──▶│  Extraction  │──▶│  SQLite  │
//! │  PDF / TXT   │   │  (boundary)  │   │ prompt → LLM │   │  store   │
//! └──────────────┘   └──────────────┘   └──────────────┘   └────┬─────┘
//!                                                                │
//!                                          ┌─────────────────────┤
//!                                          ▼                     ▼
//!                                     ┌──────────┐         ┌──────────┐
//!                                     │  query   │         │  export  │
//!                                     │  stats   │         │  (JSON)  │
//!                                     └──────────┘         └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ide init                       # create database
//! ide check                      # verify API key and data directory
//! ide process --max-chunks 5     # extract initiatives
//! ide stats
//! ide query company "Acme Corp"
//! ide export --output ./outputs/export.json
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`filename`] | Company, report type, and year from a filename |
//! | [`scan`] | Report file discovery |
//! | [`extract`] | Per-page text extraction |
//! | [`chunk`] | Boundary-aware overlapping chunking |
//! | [`prompt`] | Extraction prompt template |
//! | [`llm`] | Extraction engine abstraction |
//! | [`initiatives`] | Per-chunk extraction protocol |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`store`] | Companies, reports, and initiatives |
//! | [`ingest`] | Processing pipeline |
//! | [`progress`] | Run progress on stderr |
//! | [`stats`] | Statistics overview |
//! | [`query`] | Query commands |
//! | [`export`] | JSON export |

pub mod chunk;
pub mod config;
pub mod db;
pub mod export;
pub mod extract;
pub mod filename;
pub mod ingest;
pub mod initiatives;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod progress;
pub mod prompt;
pub mod query;
pub mod scan;
pub mod stats;
pub mod store;
