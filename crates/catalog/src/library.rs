//! Loads the effect catalog from per-category JSON list files, hiding list
//! layout and partial failure from the engine. The frame driver hands it
//! effect ids, while it keeps the ordered descriptor list and the id lookup
//! table built at load time.
//!
//! Functions:
//!
//! - `EffectLibrary::load` reads every category list under a root directory,
//!   skipping unreadable or malformed files with a warning so a broken
//!   category never takes the whole catalog down.
//! - `EffectLibrary::get`/`entries` serve the frame driver's per-frame lookup
//!   and the host's "available effects" query.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::entry::EffectDescriptor;

/// Category list files expected under the library root, in display order.
pub const CATEGORY_LISTS: [&str; 6] = [
    "liquid-effects",
    "interactive-mouse",
    "visual-effects",
    "lighting-effects",
    "distortion",
    "artistic",
];

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("failed to read effect list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse effect list {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Immutable, ordered catalog of effect descriptors.
#[derive(Debug, Default)]
pub struct EffectLibrary {
    entries: Vec<EffectDescriptor>,
    by_id: HashMap<String, usize>,
}

impl EffectLibrary {
    /// Loads every category list under `root`. Fails soft: any list that is
    /// missing or malformed is skipped, and an unreadable root yields an
    /// empty library. Callers must treat an empty catalog as "no effects
    /// available", not as an error.
    pub fn load(root: &Path) -> Self {
        let mut entries = Vec::new();
        for category in CATEGORY_LISTS {
            let path = root.join(format!("{category}.json"));
            match load_list(&path) {
                Ok(mut list) => {
                    debug!(category, count = list.len(), "loaded effect list");
                    for entry in &mut list {
                        if entry.source.is_relative() && !entry.source.as_os_str().is_empty() {
                            entry.source = root.join(&entry.source);
                        }
                    }
                    entries.extend(list);
                }
                Err(err) => {
                    warn!(category, error = %err, "skipping effect list");
                }
            }
        }
        Self::from_entries(entries)
    }

    /// Builds a library from descriptors the caller already has. Later
    /// duplicates of an id are kept in the list but do not shadow the first
    /// occurrence in lookups; duplicate ids are a build-time concern of the
    /// list author.
    pub fn from_entries(entries: Vec<EffectDescriptor>) -> Self {
        let mut by_id = HashMap::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            by_id.entry(entry.id.clone()).or_insert(index);
        }
        Self { entries, by_id }
    }

    pub fn entries(&self) -> &[EffectDescriptor] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&EffectDescriptor> {
        self.by_id.get(id).map(|&index| &self.entries[index])
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn load_list(path: &Path) -> Result<Vec<EffectDescriptor>, LibraryError> {
    let text = fs::read_to_string(path).map_err(|source| LibraryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| LibraryError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_list(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(format!("{name}.json")), body).unwrap();
    }

    #[test]
    fn concatenates_category_lists_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_list(
            dir.path(),
            "liquid-effects",
            r#"[{"id": "ripple", "name": "Ripple", "source": "ripple.wgsl"}]"#,
        );
        write_list(
            dir.path(),
            "visual-effects",
            r#"[{"id": "plasma", "name": "Plasma", "source": "plasma.wgsl", "features": ["plasma"]}]"#,
        );

        let library = EffectLibrary::load(dir.path());
        assert_eq!(library.len(), 2);
        assert_eq!(library.entries()[0].id, "ripple");
        assert_eq!(library.entries()[1].id, "plasma");
    }

    #[test]
    fn malformed_list_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_list(dir.path(), "liquid-effects", "{not json");
        write_list(
            dir.path(),
            "artistic",
            r#"[{"id": "ok", "name": "Ok", "source": "ok.wgsl"}]"#,
        );

        let library = EffectLibrary::load(dir.path());
        assert_eq!(library.len(), 1);
        assert!(library.get("ok").is_some());
    }

    #[test]
    fn missing_root_yields_empty_library() {
        let dir = tempfile::tempdir().unwrap();
        let library = EffectLibrary::load(&dir.path().join("nope"));
        assert!(library.is_empty());
    }

    #[test]
    fn relative_sources_resolve_against_root() {
        let dir = tempfile::tempdir().unwrap();
        write_list(
            dir.path(),
            "distortion",
            r#"[{"id": "warp", "name": "Warp", "source": "effects/warp.wgsl"}]"#,
        );

        let library = EffectLibrary::load(dir.path());
        let warp = library.get("warp").unwrap();
        assert_eq!(warp.source, dir.path().join("effects/warp.wgsl"));
    }

    #[test]
    fn first_occurrence_wins_id_lookup() {
        let dir = tempfile::tempdir().unwrap();
        write_list(
            dir.path(),
            "liquid-effects",
            r#"[{"id": "dup", "name": "First", "source": "a.wgsl"}]"#,
        );
        write_list(
            dir.path(),
            "artistic",
            r#"[{"id": "dup", "name": "Second", "source": "b.wgsl"}]"#,
        );

        let library = EffectLibrary::load(dir.path());
        assert_eq!(library.len(), 2);
        assert_eq!(library.get("dup").unwrap().name, "First");
    }
}
