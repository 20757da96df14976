//! # commercetxt-core
//!
//! Core functionality for CommerceTXT — a plain-text commerce description
//! format: a hierarchy of documents, each a sequence of named sections
//! whose entries describe an e-commerce entity (store identity, product,
//! offer, inventory, variants, reviews, etc.).
//!
//! This crate is a pure data pipeline: text in, structured and validated
//! data out, retrieval shards out. It never fetches remote documents,
//! computes embeddings, or renders output for any particular UI — those
//! are a host's job.
//!
//! ## Architecture
//!
//! Data flows one-directionally through four stages:
//!
//! - **[`parser`]** — turns UTF-8 text into a [`types::ParseResult`],
//!   never failing; malformed lines degrade to warnings.
//! - **[`resolver`]** — merges an ancestor document's context into a
//!   descendant, and resolves `@LOCALES` references.
//! - **[`validator`]** — enforces cross-section protocol invariants
//!   (R1–R20) and derives coarse trust flags.
//! - **[`shard`]** — turns a merged, validated document into a
//!   deduplicated, ordered set of retrieval units.
//! - **[`bridge`]** — renders a compact AI prompt and a readiness score.
//!
//! ## Quick Start
//!
//! ```rust
//! use commercetxt_core::{Parser, resolver, validator, shard::ShardGenerator, bridge::Bridge};
//!
//! let root = Parser::new().parse("# @IDENTITY\nName: Acme\nCurrency: USD\n");
//! let mut doc = Parser::new().parse("# @PRODUCT\nName: Widget\n# @OFFER\nPrice: 19.99\nAvailability: InStock\n");
//! doc = resolver::merge(&root, &doc);
//! validator::validate(&mut doc, false)?;
//!
//! let shards = ShardGenerator::new().generate(&doc);
//! let report = Bridge::new().readiness(&doc);
//! println!("{} shards, readiness {}", shards.len(), report.score);
//! # Ok::<(), commercetxt_core::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! Two channels exist and are never conflated: document-level
//! diagnostics live as plain strings in
//! [`types::ParseResult::errors`]/`.warnings`, while failures of the
//! pipeline machinery itself (loader I/O, config corruption, strict-mode
//! termination) are [`Error`] values.

/// Bridge: AI prompt rendering and readiness scoring.
pub mod bridge;
/// Configuration for parser limits and validator allowlists.
pub mod config;
/// Error types and result alias.
pub mod error;
/// The line-oriented CommerceTXT parser.
pub mod parser;
/// The inheritance resolver: document merge and locale resolution.
pub mod resolver;
/// The shard generator: retrieval units, brand tagging, dedup.
pub mod shard;
/// Core data types: `ParseResult`, section values, trust flags.
pub mod types;
/// A concrete, conservative `is_safe_url` predicate.
pub mod url_safety;
/// The rule-based validator (R1–R20).
pub mod validator;

// Re-export commonly used types.
pub use bridge::{Bridge, ReadinessReport};
pub use config::{Config, Limits};
pub use error::{Error, Result};
pub use parser::Parser;
pub use shard::{Shard, ShardGenerator, ShardMetadata};
pub use types::{ListEntry, ParseResult, SectionValue, TrustFlag};
pub use url_safety::is_safe_url;
