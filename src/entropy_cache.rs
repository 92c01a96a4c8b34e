//! Joint entropy table (JHT).
//!
//! Maps a frozen set of variable ids to the joint entropy (natural log) of
//! those variables. Every lookup counts as a read; lookups that find nothing
//! also count as misses. Both counters are persisted with the table.

use std::collections::HashMap;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::persist;
use crate::types::VarSet;

#[derive(Debug, Clone, Default)]
pub struct EntropyCache {
    entries: HashMap<VarSet, f64>,
    reads: u64,
    misses: u64,
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    variables: VarSet,
    entropy: f64,
}

#[derive(Serialize, Deserialize)]
struct Stored {
    entries: Vec<StoredEntry>,
    reads: u64,
    misses: u64,
}

impl EntropyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a saved table; a missing file yields an empty one.
    pub fn load(path: &Path) -> Result<Self> {
        let Some(stored) = persist::load_json::<Stored>(path)? else {
            return Ok(Self::new());
        };
        let cache = Self {
            entries: stored.entries.into_iter().map(|e| (e.variables, e.entropy)).collect(),
            reads: stored.reads,
            misses: stored.misses,
        };
        info!("Loaded {} joint entropies from {}", cache.len(), path.display());
        Ok(cache)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut entries: Vec<StoredEntry> = self
            .entries
            .iter()
            .map(|(variables, &entropy)| StoredEntry {
                variables: variables.clone(),
                entropy,
            })
            .collect();
        entries.sort_by(|a, b| a.variables.cmp(&b.variables));
        let stored = Stored {
            entries,
            reads: self.reads,
            misses: self.misses,
        };
        persist::save_json(path, &stored)
    }

    /// Looks up the joint entropy of `variables`, counting the read (and the miss).
    pub fn lookup(&mut self, variables: &VarSet) -> Option<f64> {
        self.reads += 1;
        let found = self.entries.get(variables).copied();
        if found.is_none() {
            self.misses += 1;
        }
        found
    }

    /// Looks up without touching the counters.
    pub fn peek(&self, variables: &VarSet) -> Option<f64> {
        self.entries.get(variables).copied()
    }

    pub fn insert(&mut self, variables: VarSet, entropy: f64) {
        self.entries.insert(variables, entropy);
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn shrink_to_fit(&mut self) {
        self.entries.shrink_to_fit();
    }
}
