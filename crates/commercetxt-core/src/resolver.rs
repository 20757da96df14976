//! The inheritance resolver: merges an ancestor document into a
//! descendant, and resolves `@LOCALES` references to a concrete path.
//!
//! Merge and locale resolution are independent operations that happen
//! to live in the same module because both are about combining a
//! document with context from elsewhere — an ancestor file for merge,
//! a requested locale code for [`resolve_locale`].

use crate::error::{Error, Result};
use crate::types::{ParseResult, SectionValue};
use indexmap::IndexMap;

/// Merges ancestor document `a` into descendant document `d`, returning
/// a new [`ParseResult`] per `spec.md` §4.3(a):
///
/// - Flat maps merge key-by-key, `d` overriding `a`.
/// - List sections concatenate, `a`'s items first.
/// - Hybrid sections merge their flat portion and concatenate their list.
/// - `version` takes `d`'s value if set, else `a`'s.
/// - `errors`/`warnings` concatenate in `a`-then-`d` order; `trust_flags` unions.
///
/// Idempotent: `merge(a, empty) == a`, `merge(empty, d) == d`, and
/// `merge(merge(a, b), b)` is semantically `merge(a, b)` (directives
/// converge; only the error/warning logs grow, which is expected of an
/// append-only log replayed twice).
#[must_use]
pub fn merge(a: &ParseResult, d: &ParseResult) -> ParseResult {
    let span = tracing::debug_span!("merge", ancestor_sections = a.directives.len(), descendant_sections = d.directives.len());
    let _enter = span.enter();

    let mut directives: IndexMap<String, SectionValue> = IndexMap::new();

    for (name, value) in &a.directives {
        directives.insert(name.clone(), value.clone());
    }
    for (name, value) in &d.directives {
        match directives.get_mut(name) {
            Some(existing) => *existing = merge_section(existing, value),
            None => {
                directives.insert(name.clone(), value.clone());
            }
        }
    }

    let mut errors = a.errors.clone();
    errors.extend(d.errors.iter().cloned());
    let mut warnings = a.warnings.clone();
    warnings.extend(d.warnings.iter().cloned());
    let mut trust_flags = a.trust_flags.clone();
    trust_flags.extend(d.trust_flags.iter().copied());

    ParseResult {
        version: d.version.clone().or_else(|| a.version.clone()),
        directives,
        errors,
        warnings,
        trust_flags,
        source_path: d.source_path.clone().or_else(|| a.source_path.clone()),
    }
}

/// Merges one section present in both documents.
fn merge_section(ancestor: &SectionValue, descendant: &SectionValue) -> SectionValue {
    match (ancestor, descendant) {
        (SectionValue::Flat(a_map), SectionValue::Flat(d_map)) => {
            SectionValue::Flat(merge_flat(a_map, d_map))
        }
        (SectionValue::List(a_items), SectionValue::List(d_items)) => {
            let mut items = a_items.clone();
            items.extend(d_items.iter().cloned());
            SectionValue::List(items)
        }
        (
            SectionValue::Hybrid { flat: a_flat, list: a_list, list_key },
            SectionValue::Hybrid { flat: d_flat, list: d_list, .. },
        ) => {
            let mut list = a_list.clone();
            list.extend(d_list.iter().cloned());
            SectionValue::Hybrid {
                flat: merge_flat(a_flat, d_flat),
                list_key: list_key.clone(),
                list,
            }
        }
        // Shape mismatch between ancestor and descendant for the same
        // section name: the descendant's shape wins, since it's the more
        // specific document (`spec.md` doesn't define cross-shape merge,
        // and descendant-wins matches the key-level override rule).
        (_, other) => other.clone(),
    }
}

fn merge_flat(a: &IndexMap<String, String>, d: &IndexMap<String, String>) -> IndexMap<String, String> {
    let mut merged = a.clone();
    for (k, v) in d {
        merged.insert(k.clone(), v.clone());
    }
    merged
}

/// An entry from `@LOCALES`, resolved into its three relevant fields.
struct LocaleEntry<'a> {
    code: &'a str,
    path: &'a str,
    is_current: bool,
}

/// Resolves a requested locale `L = language[-REGION]` against a root
/// document's `@LOCALES` section, per `spec.md` §4.3(b):
///
/// 1. Exact match on `L`.
/// 2. Match on the language prefix (first component before `-`).
/// 3. The entry marked `(Current)`, if any.
/// 4. The literal string `"/"`.
///
/// The ancestor's locale list is consulted in its original order; this
/// function never reorders it.
#[must_use]
pub fn resolve_locale(root: &ParseResult, requested: &str) -> String {
    let Some(locales) = root.section("LOCALES") else {
        return "/".to_string();
    };
    let Some(items) = locales.items().or_else(|| locales.nested_list("items")) else {
        return "/".to_string();
    };

    let entries: Vec<LocaleEntry<'_>> = items
        .iter()
        .filter_map(|entry| {
            let code = entry.get("name")?;
            let path = entry.get("path").map(String::as_str).unwrap_or_default();
            let is_current = path.contains("(Current)") || entry.values().any(|v| v.contains("(Current)"));
            Some(LocaleEntry { code, path, is_current })
        })
        .collect();

    if let Some(exact) = entries.iter().find(|e| e.code == requested) {
        return strip_current_marker(exact.path);
    }

    let prefix = requested.split('-').next().unwrap_or(requested);
    if let Some(prefix_match) = entries.iter().find(|e| e.code.split('-').next() == Some(prefix)) {
        return strip_current_marker(prefix_match.path);
    }

    if let Some(current) = entries.iter().find(|e| e.is_current) {
        return strip_current_marker(current.path);
    }

    "/".to_string()
}

fn strip_current_marker(path: &str) -> String {
    path.replace("(Current)", "").trim().to_string()
}

/// Rejects a URL before it reaches a loader: blocked unsafe URLs never
/// invoke `loader`. `is_safe_url` is the external security predicate
/// from `spec.md` §4.3(b)/§9 — callers typically pass
/// [`crate::url_safety::is_safe_url`], but the signature keeps it
/// pluggable so a host can substitute its own policy.
///
/// On success, parses the loaded content with `parser` and returns the
/// resulting [`ParseResult`] with `source_path` unset (callers that
/// care about locale relativization should set it themselves from `url`).
pub fn resolve_path<L, S>(
    url: &str,
    loader: L,
    is_safe_url: S,
    parser: &crate::parser::Parser,
) -> Result<ParseResult>
where
    L: FnOnce(&str) -> std::result::Result<String, String>,
    S: FnOnce(&str) -> bool,
{
    if !is_safe_url(url) {
        return Err(Error::InvalidUrl(format!("Security: blocked unsafe URL {url}")));
    }
    let content = loader(url).map_err(|e| Error::NotFound(format!("Load failed: {e}")))?;
    Ok(parser.parse(&content))
}
