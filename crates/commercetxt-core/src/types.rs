//! Core data types shared by every pipeline stage: the parsed document,
//! its section values, list entries, and trust flags.
//!
//! These types carry no behavior beyond small accessors — the stages in
//! [`crate::parser`], [`crate::validator`], [`crate::resolver`], and
//! [`crate::shard`] all operate on [`ParseResult`] by reference or by
//! value, mutating only the fields each stage owns (see the module docs
//! on `ParseResult` for the mutation contract).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// A single entry in a list-shaped section, e.g. one `- Name: value | Key: value` line.
///
/// Modeled as an ordered map rather than a fixed struct because
/// continuation attributes are open-ended (`VARIANTS.Options` entries
/// carry arbitrary pipe-separated keys). The conventional `name` and
/// `path` keys are populated from `- Name: value` syntax; anything
/// after a `|` becomes an additional key.
pub type ListEntry = IndexMap<String, String>;

/// The value held by one section (the block introduced by `# @NAME`).
///
/// A section's shape is determined by which keys appear on its lines,
/// not declared up front — see [`crate::parser`] for how each variant
/// is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionValue {
    /// An ordered `Key: value` mapping, e.g. `IDENTITY` or `OFFER`.
    Flat(IndexMap<String, String>),
    /// An ordered sequence of list entries under the reserved `items` key,
    /// e.g. `SPECS` or `IMAGES`.
    List(Vec<ListEntry>),
    /// Flat keys alongside one reserved list-valued key, e.g.
    /// `VARIANTS` (`Type` flat, `Options` a list).
    Hybrid {
        /// The section's flat `Key: value` entries.
        flat: IndexMap<String, String>,
        /// The name of the nested list key (e.g. `"Options"`).
        list_key: String,
        /// The nested list's entries.
        list: Vec<ListEntry>,
    },
}

impl SectionValue {
    /// Returns the flat map view of this section, if it has one.
    ///
    /// `Hybrid` sections return their flat portion; `List` sections
    /// have none.
    #[must_use]
    pub fn flat(&self) -> Option<&IndexMap<String, String>> {
        match self {
            Self::Flat(map) => Some(map),
            Self::Hybrid { flat, .. } => Some(flat),
            Self::List(_) => None,
        }
    }

    /// Returns a mutable flat map view of this section, if it has one.
    pub fn flat_mut(&mut self) -> Option<&mut IndexMap<String, String>> {
        match self {
            Self::Flat(map) => Some(map),
            Self::Hybrid { flat, .. } => Some(flat),
            Self::List(_) => None,
        }
    }

    /// Returns the top-level list entries of a `List` section, if this is one.
    #[must_use]
    pub fn items(&self) -> Option<&[ListEntry]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the nested list entries of a `Hybrid` section whose
    /// `list_key` matches `key`, if any.
    #[must_use]
    pub fn nested_list(&self, key: &str) -> Option<&[ListEntry]> {
        match self {
            Self::Hybrid { list_key, list, .. } if list_key == key => Some(list),
            _ => None,
        }
    }

    /// Convenience lookup of a flat key's value, empty string if absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.flat().and_then(|m| m.get(key)).map(String::as_str)
    }
}

/// A short token attached to a document to flag a reliability concern.
///
/// Kept as an enum (per the format's design notes) rather than bare
/// strings, to rule out typos propagating silently through the
/// validator → bridge → shard pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustFlag {
    /// Inventory `LastUpdated` is between 72 hours and 7 days old.
    InventoryStale,
    /// Inventory `LastUpdated` is more than 7 days old.
    InventoryVeryStale,
    /// A review's `Source` domain is not in the trusted set.
    ReviewsUnverified,
}

impl TrustFlag {
    /// The wire-format token used in JSON output and prompt text.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InventoryStale => "inventory_stale",
            Self::InventoryVeryStale => "inventory_very_stale",
            Self::ReviewsUnverified => "reviews_unverified",
        }
    }
}

impl std::fmt::Display for TrustFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The central value threaded through the whole pipeline: a parsed,
/// merged, and/or validated `CommerceTXT` document.
///
/// ## Mutation contract
///
/// A freshly parsed `ParseResult` is populated by [`crate::parser`]
/// alone. [`crate::resolver::merge`] may only rewrite `directives` and
/// union `errors`/`warnings`/`trust_flags`. [`crate::validator::validate`]
/// may only append to `errors`/`warnings`/`trust_flags`. No stage ever
/// removes or rewrites an entry another stage appended.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseResult {
    /// The `@VERSION` directive's `Version` value, if present.
    pub version: Option<String>,
    /// Section name (uppercase) to section value.
    pub directives: IndexMap<String, SectionValue>,
    /// Human-readable error strings, append-only.
    pub errors: Vec<String>,
    /// Human-readable warning strings, append-only.
    pub warnings: Vec<String>,
    /// Reliability concerns flagged during validation.
    pub trust_flags: BTreeSet<TrustFlag>,
    /// Origin path, used by the resolver for locale relativization.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl ParseResult {
    /// An empty result with no directives, errors, or warnings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a section by name, returning its value if present.
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&SectionValue> {
        self.directives.get(name)
    }

    /// Shorthand for `self.section(section).and_then(|s| s.get(key))`.
    #[must_use]
    pub fn field(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section).and_then(|s| s.get(key))
    }

    /// `VALID` / `WARN` / `INVALID` status per the CLI's status rules.
    #[must_use]
    pub fn status(&self) -> &'static str {
        if !self.errors.is_empty() {
            "INVALID"
        } else if !self.warnings.is_empty() {
            "WARN"
        } else {
            "VALID"
        }
    }
}
