use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::key::Key;
use crate::persist;
use crate::pmf::Pmf;
use crate::types::{Value, VarId, VarSet};

use super::{clamp_dof, DofCalculator};

/// Pairwise DoF table of one joint PMF.
#[derive(Debug, Clone, PartialEq)]
pub struct DofCacheEntry {
    /// Variable ids in the order of the joint PMF's keys.
    pub variables: Vec<VarId>,
    /// `(ix, iy) -> DoF`, stored for both orders of every pair.
    pub pairwise: HashMap<(usize, usize), u64>,
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    variables: Vec<VarId>,
    pairwise: Vec<(usize, usize, u64)>,
}

impl From<&DofCacheEntry> for StoredEntry {
    fn from(entry: &DofCacheEntry) -> Self {
        let mut pairwise: Vec<(usize, usize, u64)> =
            entry.pairwise.iter().map(|(&(ix, iy), &dof)| (ix, iy, dof)).collect();
        pairwise.sort_unstable();
        Self {
            variables: entry.variables.clone(),
            pairwise,
        }
    }
}

impl From<StoredEntry> for DofCacheEntry {
    fn from(stored: StoredEntry) -> Self {
        Self {
            variables: stored.variables,
            pairwise: stored
                .pairwise
                .into_iter()
                .map(|(ix, iy, dof)| ((ix, iy), dof))
                .collect(),
        }
    }
}

/// Structural DoF memoized per variable set.
///
/// Every joint PMF over more than one variable handed to
/// [`set_context_pmfs`][DofCalculator::set_context_pmfs] is turned into a
/// pairwise table, once per frozen set of ids. A later query `(X, Y, Z)` looks
/// up the table for `{X, Y} ∪ Z` and reads the entry for the positions of `X`
/// and `Y`.
#[derive(Debug, Default)]
pub struct CachedStructuralDof {
    cache: HashMap<VarSet, DofCacheEntry>,
    save_path: Option<PathBuf>,
}

impl CachedStructuralDof {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a previously saved cache; a missing file yields an empty cache.
    pub fn load(path: &Path) -> Result<Self> {
        let mut calculator = Self::new();
        if let Some(stored) = persist::load_json::<Vec<StoredEntry>>(path)? {
            for entry in stored {
                let entry = DofCacheEntry::from(entry);
                calculator.cache.insert(VarSet::from(entry.variables.clone()), entry);
            }
            info!("Loaded {} DoF tables from {}", calculator.cache.len(), path.display());
        }
        Ok(calculator)
    }

    pub fn set_save_path(&mut self, path: &Path) {
        self.save_path = Some(path.to_path_buf());
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut stored: Vec<StoredEntry> = self.cache.values().map(StoredEntry::from).collect();
        stored.sort_by(|a, b| a.variables.cmp(&b.variables));
        persist::save_json(path, &stored)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn get(&self, variables: &VarSet) -> Option<&DofCacheEntry> {
        self.cache.get(variables)
    }

    /// Builds and stores the pairwise table of `pmf`, unless its variable set is already known.
    pub fn cache_dofs_for_pmf(&mut self, pmf: &Pmf) {
        let variables = pmf.ids();
        if variables.len() <= 1 {
            return;
        }
        let key = VarSet::from(variables);
        if self.cache.contains_key(&key) {
            return;
        }
        debug!("cache_dofs_for_pmf(variables = {:?})", variables);
        let pairwise = calculate_pairwise_dofs(pmf, variables.len());
        self.cache.insert(
            key,
            DofCacheEntry {
                variables: variables.to_vec(),
                pairwise,
            },
        );
    }
}

/// Pairwise structural DoF over the support of a joint PMF with `keysize` variables.
///
/// For every pair of positions `ix < iy`, keys are partitioned by the values at
/// the remaining positions; each partition contributes
/// `(|distinct x| - 1)(|distinct y| - 1)`. Zero-probability keys are ignored.
pub fn calculate_pairwise_dofs(pmf: &Pmf, keysize: usize) -> HashMap<(usize, usize), u64> {
    let support: Vec<&Key> = pmf.items().filter(|&(_, p)| p != 0.0).map(|(k, _)| k).collect();

    let mut pairwise = HashMap::new();
    for ix in 0..keysize {
        for iy in ix + 1..keysize {
            let rest: Vec<usize> = (0..keysize).filter(|&i| i != ix && i != iy).collect();
            let mut per_z: BTreeMap<Key, (BTreeSet<Value>, BTreeSet<Value>)> = BTreeMap::new();
            for key in &support {
                let (xs, ys) = per_z.entry(key.project(&rest)).or_default();
                xs.insert(key.at(ix));
                ys.insert(key.at(iy));
            }

            let dof: u64 = per_z
                .values()
                .map(|(xs, ys)| (xs.len() as u64 - 1) * (ys.len() as u64 - 1))
                .sum();
            let dof = clamp_dof(dof);
            pairwise.insert((ix, iy), dof);
            pairwise.insert((iy, ix), dof);
        }
    }
    pairwise
}

impl DofCalculator for CachedStructuralDof {
    fn name(&self) -> &'static str {
        "CachedStructuralDof"
    }

    fn requires_pmfs(&self) -> bool {
        true
    }

    fn set_context_pmfs(
        &mut self,
        pr_xyz: Option<&Pmf>,
        pr_xz: Option<&Pmf>,
        pr_yz: Option<&Pmf>,
        pr_z: Option<&Pmf>,
    ) {
        for pmf in [pr_xyz, pr_xz, pr_yz, pr_z].into_iter().flatten() {
            self.cache_dofs_for_pmf(pmf);
        }
    }

    fn calculate_dof(&mut self, x: VarId, y: VarId, z: &VarSet) -> Result<u64> {
        let key = z.with(x).with(y);
        let entry = self.cache.get(&key).ok_or_else(|| Error::DofCacheMiss(key.to_vec()))?;
        let position = |id: VarId| {
            entry
                .variables
                .iter()
                .position(|&v| v == id)
                .ok_or(Error::UnknownVariable(id))
        };
        let (ix, iy) = (position(x)?, position(y)?);
        entry
            .pairwise
            .get(&(ix, iy))
            .copied()
            .ok_or_else(|| Error::DofCacheMiss(key.to_vec()))
    }

    fn needs_joint_pmf(&self, x: VarId, y: VarId, z: &VarSet) -> bool {
        !self.cache.contains_key(&z.with(x).with(y))
    }

    fn shrink_to_fit(&mut self) {
        self.cache.shrink_to_fit();
    }

    fn end(&mut self) -> Result<()> {
        if let Some(path) = &self.save_path {
            self.save(path)?;
        }
        Ok(())
    }
}
