//! The line-oriented `CommerceTXT` parser.
//!
//! Turns a UTF-8 text blob into a [`ParseResult`] without ever raising:
//! malformed lines degrade to warnings, well-formed siblings survive.
//! Resource limits ([`crate::config::Limits`]) bound memory and section
//! counts; breaching one truncates or drops the offending input and
//! records a warning rather than aborting.
//!
//! ## Grammar
//!
//! - `# @NAME` opens a section named `NAME` (upper-cased), closing
//!   whatever section was previously open.
//! - `Key: value` inside a section adds a flat entry.
//! - `- Name: value | Key: value | Key: value` appends a list entry;
//!   the first segment becomes `{name, path}`, later `|`-separated
//!   segments become additional keys. A bare `- Name` omits `path`.
//! - When constructed with `nested = true`, a flat line `Key:` with no
//!   value after the colon opens a sub-list attached to `Key`; indented
//!   `- Name: value` lines that follow belong to that sub-list until a
//!   non-indented line appears.
//! - Blank lines and full-line comments (`#` not followed by `@`) are
//!   skipped silently. Anything else becomes an "Unknown syntax" warning.

use crate::config::Limits;
use crate::types::{ListEntry, ParseResult, SectionValue};
use indexmap::IndexMap;
use regex::Regex;
use std::sync::OnceLock;

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#\s*@([A-Za-z0-9_]+)\s*$").expect("valid regex"))
}

/// Accumulates one section's content while its lines are being consumed.
#[derive(Default)]
struct SectionBuilder {
    flat: IndexMap<String, String>,
    items: Vec<ListEntry>,
    nested_key: Option<String>,
    nested_list: Vec<ListEntry>,
    entries_dropped_warned: bool,
}

impl SectionBuilder {
    fn finish(self) -> SectionValue {
        if let Some(list_key) = self.nested_key {
            SectionValue::Hybrid {
                flat: self.flat,
                list_key,
                list: self.nested_list,
            }
        } else if !self.flat.is_empty() && !self.items.is_empty() {
            SectionValue::Hybrid {
                flat: self.flat,
                list_key: "items".to_string(),
                list: self.items,
            }
        } else if !self.items.is_empty() {
            SectionValue::List(self.items)
        } else {
            SectionValue::Flat(self.flat)
        }
    }
}

/// The `CommerceTXT` line-oriented parser.
///
/// Construct with [`Parser::new`] and configure via the builder methods,
/// then call [`Parser::parse`] as many times as needed — the parser
/// itself holds no per-document state.
#[derive(Debug, Clone)]
pub struct Parser {
    nested: bool,
    strict: bool,
    limits: Limits,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// A parser with `nested = false`, `strict = false`, and default limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nested: false,
            strict: false,
            limits: Limits::default(),
        }
    }

    /// Enables sub-list parsing (`VARIANTS.Options`-style nesting).
    #[must_use]
    pub const fn with_nested(mut self, nested: bool) -> Self {
        self.nested = nested;
        self
    }

    /// Sets strict mode. The parser itself never fails regardless of
    /// this flag (per `spec.md` §4.1); it is threaded through so callers
    /// can pass the same flag to [`crate::validator::validate`].
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Overrides the default resource limits.
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Whether this parser was configured with `strict = true`.
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.strict
    }

    /// Parses `text` into a [`ParseResult`]. Never returns an error —
    /// see the module docs for the error/warning split.
    #[must_use]
    pub fn parse(&self, text: &str) -> ParseResult {
        let span = tracing::debug_span!("parse", bytes = text.len());
        let _enter = span.enter();

        let mut result = ParseResult::new();
        let mut sections: IndexMap<String, SectionBuilder> = IndexMap::new();
        let mut current: Option<String> = None;
        let mut sections_opened = 0usize;
        let mut section_limit_warned = false;
        let mut bytes_consumed: u64 = 0;

        for (idx, raw_line) in text.lines().enumerate() {
            let line_no = idx + 1;
            bytes_consumed += raw_line.len() as u64 + 1;
            if bytes_consumed > self.limits.max_total_bytes {
                let msg = "total size limit exceeded".to_string();
                tracing::warn!(line = line_no, "{msg}");
                result.warnings.push(msg);
                break;
            }

            let line = self.truncate_if_needed(raw_line, line_no, &mut result);
            let trimmed = line.trim_end();
            let indent = trimmed.len() - trimmed.trim_start().len();
            let content = trimmed.trim();

            if content.is_empty() {
                continue;
            }

            if let Some(caps) = header_re().captures(content) {
                let name = caps[1].to_uppercase();
                sections_opened += 1;
                if sections_opened > self.limits.max_sections {
                    if !section_limit_warned {
                        result.warnings.push("section limit exceeded".to_string());
                        section_limit_warned = true;
                    }
                    current = None;
                    continue;
                }
                if sections.contains_key(&name) {
                    result.warnings.push(format!(
                        "Duplicate section '@{name}' at line {line_no} overwrites previous occurrence"
                    ));
                }
                // A repeated header starts a fresh builder: the second
                // occurrence replaces the first rather than merging with it.
                sections.insert(name.clone(), SectionBuilder::default());
                current = Some(name);
                continue;
            }

            if content.starts_with('#') {
                // Full-line comment (any `#` not matching the header grammar).
                continue;
            }

            let Some(section_name) = current.clone() else {
                // Content before any section header, or inside a dropped
                // section past the section-count limit: ignored.
                continue;
            };

            if content.starts_with('-') {
                let rest = content[1..].trim_start();
                let entry = parse_list_entry(rest);

                if self.nested {
                    let builder = sections.get_mut(&section_name).expect("section exists");
                    if builder.nested_key.is_some() && indent > 0 {
                        push_bounded(
                            &mut builder.nested_list,
                            entry,
                            self.limits.max_entries_per_section,
                            &mut builder.entries_dropped_warned,
                            &mut result.warnings,
                            &section_name,
                        );
                        continue;
                    }
                }

                let builder = sections.get_mut(&section_name).expect("section exists");
                push_bounded(
                    &mut builder.items,
                    entry,
                    self.limits.max_entries_per_section,
                    &mut builder.entries_dropped_warned,
                    &mut result.warnings,
                    &section_name,
                );
                continue;
            }

            if let Some(colon) = content.find(':') {
                let key = content[..colon].trim().to_string();
                let value = content[colon + 1..].trim().to_string();

                if self.nested && value.is_empty() {
                    let builder = sections.get_mut(&section_name).expect("section exists");
                    if builder.nested_key.as_deref() != Some(key.as_str()) {
                        builder.nested_key = Some(key);
                        builder.nested_list.clear();
                    }
                    continue;
                }

                let builder = sections.get_mut(&section_name).expect("section exists");
                if builder.flat.len() >= self.limits.max_entries_per_section {
                    warn_entries_dropped(&mut builder.entries_dropped_warned, &section_name, &mut result.warnings);
                    continue;
                }
                builder.flat.insert(key, value);
                continue;
            }

            result
                .warnings
                .push(format!("Unknown syntax at line {line_no}: {content}"));
        }

        self.close_nested(&mut sections, current.as_deref());

        for (name, builder) in sections {
            if name == "VERSION" {
                if let Some(version) = builder.flat.get("Version") {
                    result.version = Some(version.clone());
                }
                continue;
            }
            result.directives.insert(name, builder.finish());
        }

        result
    }

    fn truncate_if_needed<'a>(
        &self,
        line: &'a str,
        line_no: usize,
        result: &mut ParseResult,
    ) -> std::borrow::Cow<'a, str> {
        if line.len() <= self.limits.max_line_length {
            return std::borrow::Cow::Borrowed(line);
        }
        result
            .warnings
            .push(format!("line {line_no} exceeds maximum length"));
        let mut boundary = self.limits.max_line_length;
        while boundary > 0 && !line.is_char_boundary(boundary) {
            boundary -= 1;
        }
        std::borrow::Cow::Owned(line[..boundary].to_string())
    }

    /// No-op when a section doesn't have an open nested list; kept as a
    /// named step so future nested-list post-processing has one place to live.
    fn close_nested(&self, _sections: &mut IndexMap<String, SectionBuilder>, _current: Option<&str>) {}
}

fn parse_list_entry(rest: &str) -> ListEntry {
    let mut entry = ListEntry::new();
    let mut parts = rest.split('|');
    if let Some(first) = parts.next() {
        let first = first.trim();
        if let Some(colon) = first.find(':') {
            entry.insert("name".to_string(), first[..colon].trim().to_string());
            entry.insert("path".to_string(), first[colon + 1..].trim().to_string());
        } else {
            entry.insert("name".to_string(), first.to_string());
        }
    }
    for cont in parts {
        let cont = cont.trim();
        if let Some(colon) = cont.find(':') {
            let key = cont[..colon].trim().to_string();
            let value = cont[colon + 1..].trim().to_string();
            entry.insert(key, value);
        }
    }
    entry
}

fn push_bounded(
    list: &mut Vec<ListEntry>,
    entry: ListEntry,
    limit: usize,
    warned: &mut bool,
    warnings: &mut Vec<String>,
    section_name: &str,
) {
    if list.len() >= limit {
        warn_entries_dropped(warned, section_name, warnings);
        return;
    }
    list.push(entry);
}

fn warn_entries_dropped(warned: &mut bool, section_name: &str, warnings: &mut Vec<String>) {
    if !*warned {
        warnings.push(format!("entry limit exceeded in section '@{section_name}'"));
        *warned = true;
    }
}
