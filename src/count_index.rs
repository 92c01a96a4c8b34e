//! Sparse count index over a dataset.
//!
//! The count-index G-test backend needs to answer "how many samples match this
//! partial assignment" and to produce marginal and conditional PMFs without
//! rescanning the dataset. The [`CountIndex`] trait is that query contract;
//! [`ContingencyIndex`] implements it by storing each distinct full row once,
//! with its multiplicity, so every query scans the (usually much smaller) set
//! of distinct rows instead of all `N` samples.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::{Duration, Instant};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::dataset::DatasetMatrix;
use crate::error::{Error, Result};
use crate::key::Key;
use crate::persist;
use crate::pmf::{Cpmf, Pmf};
use crate::types::{Value, VarId};

pub trait CountIndex {
    /// Number of samples.
    fn n(&self) -> u64;

    /// Number of samples matching every `(column, value)` pair of `assignment`.
    fn query_count(&self, assignment: &[(VarId, Value)]) -> Result<u64>;

    /// `Pr(vars)`, with keys ordered as `vars`. Empty `vars` yields Ω.
    fn make_pmf(&self, vars: &[VarId]) -> Result<Pmf>;

    /// `Pr(vars | given)`. Empty `given` wraps the marginal as conditioned on Ω.
    fn make_cpmf(&self, vars: &[VarId], given: &[VarId]) -> Result<Cpmf>;
}

/// Distinct full rows of a dataset with their counts.
#[derive(Debug, Clone)]
pub struct ContingencyIndex {
    column_values: Vec<Vec<Value>>,
    rows: HashMap<Key, u64>,
    n: u64,
    build_duration: Duration,
}

#[derive(Serialize, Deserialize)]
struct StoredRow {
    row: Key,
    count: u64,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    column_values: Vec<Vec<Value>>,
    rows: Vec<StoredRow>,
    n: u64,
}

impl ContingencyIndex {
    pub fn build(dataset: &DatasetMatrix) -> Self {
        let start = Instant::now();
        let mut rows: HashMap<Key, u64> = HashMap::new();
        for row in dataset.rows() {
            *rows.entry(Key::from_values(row)).or_insert(0) += 1;
        }
        let build_duration = start.elapsed();
        info!(
            "Built count index over {} rows: {} distinct, {:?}",
            dataset.n_rows(),
            rows.len(),
            build_duration
        );
        Self {
            column_values: dataset.values_per_column().to_vec(),
            rows,
            n: dataset.n_rows() as u64,
            build_duration,
        }
    }

    /// Loads a snapshot, or `None` if there is none at `path`.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let start = Instant::now();
        let Some(snapshot) = persist::load_json::<Snapshot>(path)? else {
            return Ok(None);
        };
        Ok(Some(Self {
            column_values: snapshot.column_values,
            rows: snapshot.rows.into_iter().map(|r| (r.row, r.count)).collect(),
            n: snapshot.n,
            build_duration: start.elapsed(),
        }))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut rows: Vec<StoredRow> = self
            .rows
            .iter()
            .map(|(row, &count)| StoredRow { row: row.clone(), count })
            .collect();
        rows.sort_by(|a, b| a.row.cmp(&b.row));
        let snapshot = Snapshot {
            column_values: self.column_values.clone(),
            rows,
            n: self.n,
        };
        persist::save_json(path, &snapshot)
    }

    /// Time spent building (or loading) the index.
    pub fn build_duration(&self) -> Duration {
        self.build_duration
    }

    pub fn distinct_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn column_values(&self) -> &[Vec<Value>] {
        &self.column_values
    }

    /// Fails with [`Error::CountIndexMismatch`] unless the index has the row
    /// count and column domains of `dataset`.
    pub fn check_matches(&self, dataset: &DatasetMatrix) -> Result<()> {
        let mismatch = |reason: String| Error::CountIndexMismatch {
            dataset: dataset.label().to_string(),
            reason,
        };
        if self.n != dataset.n_rows() as u64 {
            return Err(mismatch(format!("{} rows indexed, {} in dataset", self.n, dataset.n_rows())));
        }
        if self.column_values.len() != dataset.n_cols() {
            return Err(mismatch(format!(
                "{} columns indexed, {} in dataset",
                self.column_values.len(),
                dataset.n_cols()
            )));
        }
        let differing = self
            .column_values
            .iter()
            .zip(dataset.values_per_column())
            .position(|(indexed, actual)| indexed != actual);
        if let Some(column) = differing {
            return Err(mismatch(format!("column {} has different values", column)));
        }
        Ok(())
    }

    fn check_columns(&self, ids: &[VarId]) -> Result<()> {
        match ids.iter().find(|&&id| id >= self.column_values.len()) {
            Some(&id) => Err(Error::UnknownVariable(id)),
            None => Ok(()),
        }
    }

    fn project_counts(&self, ids: &[VarId]) -> BTreeMap<Key, u64> {
        let mut counts = BTreeMap::new();
        for (row, &count) in &self.rows {
            *counts.entry(row.project(ids)).or_insert(0) += count;
        }
        counts
    }
}

impl CountIndex for ContingencyIndex {
    fn n(&self) -> u64 {
        self.n
    }

    fn query_count(&self, assignment: &[(VarId, Value)]) -> Result<u64> {
        let ids: Vec<VarId> = assignment.iter().map(|&(id, _)| id).collect();
        self.check_columns(&ids)?;
        Ok(self
            .rows
            .iter()
            .filter(|(row, _)| assignment.iter().all(|&(id, value)| row.at(id) == value))
            .map(|(_, &count)| count)
            .sum())
    }

    fn make_pmf(&self, vars: &[VarId]) -> Result<Pmf> {
        if vars.is_empty() {
            return Ok(Pmf::omega());
        }
        self.check_columns(vars)?;
        Ok(Pmf::from_counts(vars.to_vec(), self.project_counts(vars)))
    }

    fn make_cpmf(&self, vars: &[VarId], given: &[VarId]) -> Result<Cpmf> {
        if given.is_empty() {
            return Ok(Cpmf::omega(self.make_pmf(vars)?));
        }
        self.check_columns(vars)?;
        self.check_columns(given)?;
        debug!("make_cpmf(vars = {:?}, given = {:?})", vars, given);

        let joint: Vec<VarId> = vars.iter().chain(given).copied().collect();
        let var_positions: Vec<usize> = (0..vars.len()).collect();
        let given_positions: Vec<usize> = (vars.len()..joint.len()).collect();

        let mut conditional: BTreeMap<Key, Pmf> = BTreeMap::new();
        for (key, count) in self.project_counts(&joint) {
            conditional
                .entry(key.project(&given_positions))
                .or_insert_with(|| Pmf::new().with_ids(vars.to_vec()))
                .count_instance(key.project(&var_positions), count);
        }

        let mut cpmf = Cpmf::new();
        for (key, mut pmf) in conditional {
            pmf.normalize();
            cpmf.insert(key, pmf);
        }
        Ok(cpmf)
    }
}
