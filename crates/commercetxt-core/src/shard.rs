//! The shard generator: turns a merged, validated [`ParseResult`] into
//! an ordered sequence of retrieval units (shards), with deterministic
//! brand tagging and content-hash deduplication.
//!
//! See `spec.md` §4.4. Emission order is stable (section order, then
//! insertion order within a section) and independent of the dedup
//! hash; dedup drops later-in-order duplicates, never reorders.

use crate::types::ParseResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// One retrieval unit: short text plus traceability metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shard {
    /// Short natural-language-looking text.
    pub text: String,
    /// Traceability and classification metadata.
    pub metadata: ShardMetadata,
}

/// Metadata accompanying a [`Shard`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardMetadata {
    /// Position at emit time within its producing document.
    pub index: usize,
    /// Coarse classification, e.g. `subject_anchor`, `offer`, `review`.
    pub attr_type: String,
    /// The originating flat map subset, for traceability.
    pub original_data: Map<String, Value>,
}

impl Shard {
    fn new(index: usize, attr_type: &str, text: impl Into<String>, original_data: Map<String, Value>) -> Self {
        Self {
            text: text.into(),
            metadata: ShardMetadata {
                index,
                attr_type: attr_type.to_string(),
                original_data,
            },
        }
    }

    /// The content hash used for cross-shard deduplication: SHA-256 over
    /// the lower-cased, trimmed `text` plus `attr_type`, explicitly
    /// excluding `index` and `original_data` — two shards from different
    /// products stating the same fact must collide.
    #[must_use]
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.trim().to_lowercase().as_bytes());
        hasher.update(b"\0");
        hasher.update(self.metadata.attr_type.as_bytes());
        hex::encode(hasher.finalize())
    }
}

fn obj(pairs: &[(&str, &str)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), Value::String((*v).to_string())))
        .collect()
}

/// Computes the canonical brand tag `brand_<slug>_<hash6>` for a brand
/// name, per `spec.md` §4.4.
///
/// `slug` is the lower-cased, trimmed brand with non-alphanumeric runs
/// collapsed to a single `_`, leading/trailing `_` stripped, truncated
/// to 80 characters. `hash6` is the first 6 hex characters of SHA-256
/// over `trim(lower(brand))`.
#[must_use]
pub fn brand_tag(brand: &str) -> String {
    let normalized = brand.trim().to_lowercase();
    let mut slug = String::new();
    let mut last_was_sep = true;
    for c in normalized.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('_');
            last_was_sep = true;
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug.truncate(80);

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    let digest = hasher.finalize();
    let hash6 = hex::encode(&digest[..3]);

    format!("brand_{slug}_{hash6}")
}

/// Generates shards and semantic tags from a merged, validated document.
///
/// Dedup within a single document is always on: two identical
/// `{text, attr_type}` shards from the same document collapse to one.
/// Cross-document dedup is opt-in via [`ShardGenerator::generate_batch`].
#[derive(Debug, Default)]
pub struct ShardGenerator {
    seen_hashes: HashSet<String>,
}

impl ShardGenerator {
    /// A generator with an empty dedup set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties the dedup set, as if the generator were newly constructed.
    pub fn reset_deduplication(&mut self) {
        self.seen_hashes.clear();
    }

    /// Generates shards for one document. Within-document dedup always
    /// applies; cross-document dedup applies only if `seen_hashes`
    /// already carries state from a prior [`Self::generate`] or
    /// [`Self::generate_batch`] call with `deduplicate_across_products = on`.
    #[must_use]
    pub fn generate(&mut self, doc: &ParseResult) -> Vec<Shard> {
        let span = tracing::debug_span!("generate_shards", sections = doc.directives.len());
        let _enter = span.enter();

        let mut shards = Vec::new();
        let mut index = 0usize;
        let mut local_seen: HashSet<String> = HashSet::new();

        macro_rules! push {
            ($attr_type:expr, $text:expr, $data:expr) => {{
                let shard = Shard::new(index, $attr_type, $text, $data);
                let hash = shard.content_hash();
                if local_seen.insert(hash.clone()) && self.seen_hashes.insert(hash) {
                    index += 1;
                    shards.push(shard);
                }
            }};
        }

        if let Some(identity) = doc.section("IDENTITY") {
            if let Some(name) = identity.get("Name") {
                push!("subject_anchor", format!("Store: {name}"), obj(&[("Name", name)]));
            }
            if let Some(currency) = identity.get("Currency") {
                push!("currency", format!("Currency: {currency}"), obj(&[("Currency", currency)]));
            }
        }

        if let Some(product) = doc.section("PRODUCT") {
            if let Some(name) = product.get("Name") {
                push!("subject_anchor", format!("Product: {name}"), obj(&[("Name", name)]));
            }
            for key in ["Brand", "SKU", "GTIN", "Description"] {
                if let Some(value) = product.get(key) {
                    if !value.trim().is_empty() {
                        push!("specification", format!("{key}: {value}"), obj(&[(key, value)]));
                    }
                }
            }
        }

        if let Some(offer) = doc.section("OFFER") {
            if let Some(flat) = offer.flat() {
                for (key, value) in flat {
                    if value.trim().is_empty() {
                        continue;
                    }
                    push!("offer", format!("{key}: {value}"), obj(&[(key.as_str(), value.as_str())]));
                }
            }
        }

        for name in ["INVENTORY", "SHIPPING", "PAYMENT"] {
            let attr_type = name.to_lowercase();
            let Some(section) = doc.section(name) else { continue };
            if let Some(flat) = section.flat() {
                for (key, value) in flat {
                    if value.trim().is_empty() {
                        continue;
                    }
                    push!(attr_type.as_str(), format!("{key}: {value}"), obj(&[(key.as_str(), value.as_str())]));
                }
            }
            let items = section.items().or_else(|| section.nested_list("items"));
            for entry in items.into_iter().flatten() {
                let text = list_entry_text(entry);
                let data: Map<String, Value> = entry
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                push!(attr_type.as_str(), text, data);
            }
        }

        if let Some(specs) = doc.section("SPECS") {
            let items = specs.items().or_else(|| specs.nested_list("items"));
            for entry in items.into_iter().flatten() {
                let text = list_entry_text(entry);
                let data: Map<String, Value> = entry
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                push!("specification", text, data);
            }
        }

        if let Some(variants) = doc.section("VARIANTS") {
            let options = variants.nested_list("Options").or_else(|| variants.items());
            for entry in options.into_iter().flatten() {
                let text = list_entry_text(entry);
                let data: Map<String, Value> = entry
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                push!("variant", text, data);
            }
        }

        if let Some(reviews) = doc.section("REVIEWS") {
            if let Some(flat) = reviews.flat() {
                for (key, value) in flat {
                    if value.trim().is_empty() {
                        continue;
                    }
                    push!("review", format!("{key}: {value}"), obj(&[(key.as_str(), value.as_str())]));
                }
            }
            let items = reviews.items().or_else(|| reviews.nested_list("items"));
            for entry in items.into_iter().flatten() {
                let text = list_entry_text(entry);
                let data: Map<String, Value> = entry
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                push!("review", text, data);
            }
        }

        if let Some(images) = doc.section("IMAGES") {
            let items = images.items().or_else(|| images.nested_list("items"));
            for entry in items.into_iter().flatten() {
                let text = list_entry_text(entry);
                let data: Map<String, Value> = entry
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                push!("image", text, data);
            }
        }

        if let Some(policies) = doc.section("POLICIES") {
            let items = policies.items().or_else(|| policies.nested_list("items"));
            for entry in items.into_iter().flatten() {
                let text = list_entry_text(entry);
                let data: Map<String, Value> = entry
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                push!("policy", text, data);
            }
            if let Some(flat) = policies.flat() {
                for (key, value) in flat {
                    if value.trim().is_empty() {
                        continue;
                    }
                    push!("policy", format!("{key}: {value}"), obj(&[(key.as_str(), value.as_str())]));
                }
            }
        }

        if let Some(logic) = doc.section("SEMANTIC_LOGIC") {
            let items = logic.items().or_else(|| logic.nested_list("items"));
            for entry in items.into_iter().flatten() {
                let text = list_entry_text(entry);
                let data: Map<String, Value> = entry
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                push!("semantic_tag", text, data);
            }
        }

        if let Some(brand) = find_brand(doc) {
            let tag = brand_tag(&brand);
            push!("semantic_tag", tag, obj(&[("Brand", &brand)]));
        }

        shards
    }

    /// Iterates `docs`, generating shards for each. When
    /// `deduplicate_across_products` is on, the `seen_hashes` set is
    /// shared across documents so a fact repeated across a catalog
    /// (e.g. the same `CURRENCY` on every product) emits only once
    /// batch-wide; when off, each document's within-document dedup
    /// still applies but the set resets between documents.
    #[must_use]
    pub fn generate_batch(&mut self, docs: &[ParseResult], deduplicate_across_products: bool) -> Vec<Vec<Shard>> {
        let mut results = Vec::with_capacity(docs.len());
        for doc in docs {
            if !deduplicate_across_products {
                self.reset_deduplication();
            }
            results.push(self.generate(doc));
        }
        results
    }
}

/// Finds a `BRAND` value anywhere in the document: a top-level
/// `@BRAND` section's `Name`, or nested `Brand`/`BRAND` keys in
/// `PRODUCT` or `IDENTITY`.
fn find_brand(doc: &ParseResult) -> Option<String> {
    if let Some(brand_section) = doc.section("BRAND") {
        if let Some(name) = brand_section.get("Name") {
            return Some(name.to_string());
        }
    }
    for section_name in ["PRODUCT", "IDENTITY"] {
        if let Some(value) = doc.field(section_name, "Brand") {
            return Some(value.to_string());
        }
    }
    None
}

fn list_entry_text(entry: &crate::types::ListEntry) -> String {
    let name = entry.get("name").map(String::as_str);
    let path = entry.get("path").map(String::as_str);
    match (name, path) {
        (Some(name), Some(path)) if !path.is_empty() => format!("{name}: {path}"),
        (Some(name), _) => name.to_string(),
        (None, Some(path)) => path.to_string(),
        (None, None) => entry
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

/// Flattens shards down to their `text` fields, for `as_text = on`
/// callers per `spec.md` §6.
#[must_use]
pub fn as_text(shards: &[Shard]) -> Vec<String> {
    shards.iter().map(|s| s.text.clone()).collect()
}
