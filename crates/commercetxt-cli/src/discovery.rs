//! Ancestor `commerce.txt` discovery.
//!
//! Per `spec.md` §4.3(a), a descendant document inherits context from
//! an ancestor document; per `SPEC_FULL.md` §10.3, this CLI's flavor of
//! "find the ancestor" is the simplest one: walk the target file's
//! parent directories up to the filesystem root, collecting any file
//! literally named `commerce.txt` along the way.

use std::path::{Path, PathBuf};

/// Returns the `commerce.txt` files found in `path`'s parent
/// directories, ordered furthest-ancestor-first so the caller can fold
/// them with [`commercetxt_core::resolver::merge`] in that order.
///
/// The target `path` itself is never included, even if it happens to
/// be named `commerce.txt`.
#[must_use]
pub fn discover_ancestors(path: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut dir = path.parent().map(Path::to_path_buf);

    while let Some(current) = dir {
        let candidate = current.join("commerce.txt");
        if candidate.is_file() && candidate != path {
            found.push(candidate);
        }
        dir = current.parent().map(Path::to_path_buf);
    }

    found.reverse();
    found
}
