//! Configuration for the parser's resource limits and the validator's
//! trusted review-source allowlist.
//!
//! `CommerceTXT` documents are bounded by design (see `spec.md` §4.1);
//! the bounds are configurable rather than hard-coded so a host embedding
//! this crate can raise or lower them for its own catalogs. Configuration
//! is stored in TOML format and supports environment variable overrides,
//! following the same load order the wider ecosystem uses for CLI tools.
//!
//! ## File Location
//!
//! Searched in order:
//! - XDG: `$XDG_CONFIG_HOME/commercetxt/config.toml` or `~/.config/commercetxt/config.toml`
//! - Dotfile fallback: `~/.commercetxt/config.toml`
//!
//! Missing files are not an error — [`Config::load`] falls back to
//! [`Config::default`].
//!
//! ## Examples
//!
//! ```rust
//! use commercetxt_core::Config;
//!
//! let config = Config::load()?;
//! println!("max line length: {}", config.limits.max_line_length);
//! # Ok::<(), commercetxt_core::Error>(())
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default for [`Limits::max_line_length`].
const fn default_max_line_length() -> usize {
    8_192
}

/// Default for [`Limits::max_sections`].
const fn default_max_sections() -> usize {
    1_000
}

/// Default for [`Limits::max_entries_per_section`].
const fn default_max_entries_per_section() -> usize {
    10_000
}

/// Default for [`Limits::max_total_bytes`].
const fn default_max_total_bytes() -> u64 {
    10 * 1024 * 1024
}

/// Default for [`Limits::trusted_review_domains`].
fn default_trusted_review_domains() -> Vec<String> {
    vec![
        "trustpilot.com".to_string(),
        "google.com".to_string(),
        "amazon.com".to_string(),
        "yelp.com".to_string(),
    ]
}

/// Parser resource limits and validator allowlists.
///
/// All four numeric limits correspond directly to `spec.md` §4.1's
/// resource-limit table; breaching any of them degrades parsing to a
/// warning rather than failing it (see [`crate::parser`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Lines longer than this are truncated; default 8,192 bytes.
    pub max_line_length: usize,
    /// Sections beyond this count are dropped; default 1,000.
    pub max_sections: usize,
    /// Entries beyond this count (per section) are dropped; default 10,000.
    pub max_entries_per_section: usize,
    /// Parsing stops once the input exceeds this many bytes; default 10 MiB.
    pub max_total_bytes: u64,
    /// Registrable domains considered trusted review sources (R14), in
    /// addition to the document's own domain when known.
    pub trusted_review_domains: Vec<String>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_line_length: default_max_line_length(),
            max_sections: default_max_sections(),
            max_entries_per_section: default_max_entries_per_section(),
            max_total_bytes: default_max_total_bytes(),
            trusted_review_domains: default_trusted_review_domains(),
        }
    }
}

/// Top-level configuration for `commercetxt-core`.
///
/// Currently this wraps [`Limits`] alone; it is a struct rather than a
/// bare `Limits` so future additions (e.g. per-section emission toggles)
/// don't require a breaking change to [`Config::load`]'s signature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Parser and validator resource limits.
    pub limits: Limits,
}

impl Config {
    /// Loads configuration from the platform config directory, applying
    /// `COMMERCETXT_*` environment variable overrides on top.
    ///
    /// Returns [`Config::default`] when no config file exists. A config
    /// file that exists but fails to parse is an [`Error::Config`].
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a specific TOML file, bypassing the
    /// platform search path. Useful for CLI `--config` flags and tests.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("reading {}: {e}", path.display())))?;
        toml::from_str(&text).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Writes this configuration to `path` as TOML, creating parent
    /// directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// The default config file location, if a home directory is resolvable.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "commercetxt")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_usize("COMMERCETXT_MAX_LINE_LENGTH") {
            self.limits.max_line_length = v;
        }
        if let Some(v) = env_usize("COMMERCETXT_MAX_SECTIONS") {
            self.limits.max_sections = v;
        }
        if let Some(v) = env_usize("COMMERCETXT_MAX_ENTRIES_PER_SECTION") {
            self.limits.max_entries_per_section = v;
        }
        if let Ok(raw) = std::env::var("COMMERCETXT_MAX_TOTAL_BYTES") {
            if let Ok(v) = raw.parse::<u64>() {
                self.limits.max_total_bytes = v;
            }
        }
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_values() {
        let limits = Limits::default();
        assert_eq!(limits.max_line_length, 8_192);
        assert_eq!(limits.max_sections, 1_000);
        assert_eq!(limits.max_entries_per_section, 10_000);
        assert_eq!(limits.max_total_bytes, 10 * 1024 * 1024);
        assert!(limits.trusted_review_domains.contains(&"amazon.com".to_string()));
    }

    #[test]
    fn round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn save_then_load_from_preserves_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.limits.max_sections = 42;
        config.save(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.limits.max_sections, 42);
    }

    #[test]
    fn load_from_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonexistent.toml");
        assert!(Config::load_from(&path).is_err());
    }
}
