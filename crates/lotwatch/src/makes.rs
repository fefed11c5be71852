//! Nettikone make name to make ID lookup.
//!
//! The API filters by numeric make IDs while users configure make names, so
//! the mapping is loaded once from a JSON resource of
//! `[{ "id": 12, "name": "Volvo" }, ...]` entries.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum MakeTableError {
    #[error("Failed to read make table {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse make table: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeEntry {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct MakeTable {
    entries: Vec<MakeEntry>,
    by_name: HashMap<String, u32>,
}

impl MakeTable {
    pub fn from_entries(entries: Vec<MakeEntry>) -> Self {
        let by_name = entries
            .iter()
            .map(|e| (e.name.trim().to_lowercase(), e.id))
            .collect();
        Self { entries, by_name }
    }

    pub fn from_json(json: &str) -> Result<Self, MakeTableError> {
        let entries: Vec<MakeEntry> = serde_json::from_str(json)?;
        Ok(Self::from_entries(entries))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MakeTableError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| MakeTableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let table = Self::from_json(&json)?;
        log::info!("Loaded {} makes from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.by_name.get(&name.trim().to_lowercase()).copied()
    }

    /// Resolves every name it can. Unknown names are logged and left out.
    pub fn ids_for<'a, I>(&self, names: I) -> Vec<u32>
    where
        I: IntoIterator<Item = &'a String>,
    {
        names
            .into_iter()
            .filter_map(|name| {
                let id = self.id_of(name);
                if id.is_none() {
                    log::warn!("No Nettikone make ID known for '{}', skipping it", name);
                }
                id
            })
            .collect()
    }

    pub fn entries(&self) -> &[MakeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
