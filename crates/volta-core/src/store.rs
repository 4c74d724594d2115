//! ---
//! volta_section: "01-core-functionality"
//! volta_subsection: "module"
//! volta_type: "source"
//! volta_scope: "code"
//! volta_description: "Read-only design lookup consumed by the engine."
//! volta_version: "v0.0.0-prealpha"
//! volta_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;
use volta_sim::Design;
use walkdir::WalkDir;

use crate::errors::Result;

/// Source of saved designs. The engine only ever reads from it.
pub trait DesignStore: Send + Sync {
    fn get_design(&self, id: Uuid) -> Option<Design>;
}

/// Process-local design store, populated at start-up or by tests.
#[derive(Debug, Default)]
pub struct InMemoryDesignStore {
    designs: RwLock<HashMap<Uuid, Design>>,
}

impl InMemoryDesignStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a design, returning its id.
    pub fn insert(&self, design: Design) -> Uuid {
        let id = design.id;
        self.designs.write().insert(id, design);
        id
    }

    pub fn len(&self) -> usize {
        self.designs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.designs.read().is_empty()
    }

    /// Load every `*.json` design directly inside `dir`, in file-name order,
    /// so a later file wins when two share a design id. Files that fail to
    /// parse are skipped with a warning. Returns the number of designs loaded.
    pub fn load_dir(&self, dir: &Path) -> Result<usize> {
        if !dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("design directory {} does not exist", dir.display()),
            )
            .into());
        }
        let mut entries: Vec<PathBuf> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
            .collect();
        entries.sort();

        let mut loaded = 0usize;
        for path in entries {
            let parsed = fs::read_to_string(&path)
                .map_err(crate::EngineError::from)
                .and_then(|text| serde_json::from_str::<Design>(&text).map_err(Into::into));
            match parsed {
                Ok(design) => {
                    debug!(design = %design.id, path = %path.display(), "design loaded");
                    self.insert(design);
                    loaded += 1;
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable design file");
                }
            }
        }
        info!(directory = %dir.display(), loaded, "design directory loaded");
        Ok(loaded)
    }
}

impl DesignStore for InMemoryDesignStore {
    fn get_design(&self, id: Uuid) -> Option<Design> {
        self.designs.read().get(&id).cloned()
    }
}
