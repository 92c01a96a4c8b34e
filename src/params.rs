//! Parameters of the CI tests and of the Markov-blanket search.
//!
//! The serializable subset mirrors the keys of the experiment definitions the
//! toolkit consumes (`ci_test_jht_path__load` and friends). Preloaded caches,
//! the ground-truth graph and the sufficiency predicate cannot be serialized
//! and are attached with the `with_*` builders instead.

use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::ci::CiTestKind;
use crate::count_index::ContingencyIndex;
use crate::dof::DofCalculatorKind;
use crate::entropy_cache::EntropyCache;
use crate::error::{Error, Result};
use crate::graph::DirectedGraph;
use crate::types::VarId;

/// Predicate `(dof, n) -> sufficient` deciding whether a G-test is reliable.
pub type SufficiencyCriterion = Rc<dyn Fn(u64, usize) -> bool>;

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub target: Option<VarId>,
    pub all_variables: Option<Vec<VarId>>,
    pub ci_test_class: Option<CiTestKind>,
    pub ci_test_significance: f64,
    pub ci_test_dof_calculator_class: DofCalculatorKind,
    /// Every this many tests the backend runs its maintenance pass; 0 disables it.
    pub ci_test_gc_collect_rate: usize,
    pub ci_test_debug: bool,

    #[serde(rename = "ci_test_ad_tree_path__load")]
    pub ci_test_ad_tree_path_load: Option<PathBuf>,
    #[serde(rename = "ci_test_ad_tree_path__save")]
    pub ci_test_ad_tree_path_save: Option<PathBuf>,
    #[serde(rename = "ci_test_jht_path__load")]
    pub ci_test_jht_path_load: Option<PathBuf>,
    #[serde(rename = "ci_test_jht_path__save")]
    pub ci_test_jht_path_save: Option<PathBuf>,
    #[serde(rename = "ci_test_dof_calculator_cache_path__load")]
    pub ci_test_dof_calculator_cache_path_load: Option<PathBuf>,
    #[serde(rename = "ci_test_dof_calculator_cache_path__save")]
    pub ci_test_dof_calculator_cache_path_save: Option<PathBuf>,
    #[serde(rename = "ci_test_results_path__save")]
    pub ci_test_results_path_save: Option<PathBuf>,

    pub pc_only: bool,
    pub algorithm_debug: u8,

    #[serde(skip)]
    pub ci_test_sufficient_samples_criterion: Option<SufficiencyCriterion>,
    #[serde(skip)]
    pub ci_test_ad_tree_preloaded: Option<Rc<ContingencyIndex>>,
    #[serde(skip)]
    pub ci_test_jht_preloaded: Option<Rc<RefCell<EntropyCache>>>,
    #[serde(skip)]
    pub source_bayesian_network: Option<Rc<DirectedGraph>>,
}

impl Parameters {
    pub fn new(target: VarId, ci_test_class: CiTestKind) -> Self {
        Self {
            target: Some(target),
            ci_test_class: Some(ci_test_class),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|source| Error::Serialization {
            path: PathBuf::from("<string>"),
            source,
        })
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| Error::Serialization {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn with_target(mut self, target: VarId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_all_variables(mut self, variables: Vec<VarId>) -> Self {
        self.all_variables = Some(variables);
        self
    }

    pub fn with_significance(mut self, significance: f64) -> Self {
        self.ci_test_significance = significance;
        self
    }

    pub fn with_dof_calculator(mut self, kind: DofCalculatorKind) -> Self {
        self.ci_test_dof_calculator_class = kind;
        self
    }

    pub fn with_gc_collect_rate(mut self, rate: usize) -> Self {
        self.ci_test_gc_collect_rate = rate;
        self
    }

    pub fn with_sufficiency_criterion(mut self, criterion: impl Fn(u64, usize) -> bool + 'static) -> Self {
        self.ci_test_sufficient_samples_criterion = Some(Rc::new(criterion));
        self
    }

    pub fn with_source_bayesian_network(mut self, graph: Rc<DirectedGraph>) -> Self {
        self.source_bayesian_network = Some(graph);
        self
    }

    pub fn with_ad_tree_preloaded(mut self, index: Rc<ContingencyIndex>) -> Self {
        self.ci_test_ad_tree_preloaded = Some(index);
        self
    }

    pub fn with_jht_preloaded(mut self, jht: Rc<RefCell<EntropyCache>>) -> Self {
        self.ci_test_jht_preloaded = Some(jht);
        self
    }

    pub fn with_pc_only(mut self, pc_only: bool) -> Self {
        self.pc_only = pc_only;
        self
    }

    pub fn with_algorithm_debug(mut self, level: u8) -> Self {
        self.algorithm_debug = level;
        self
    }

    pub fn target(&self) -> Result<VarId> {
        self.target.ok_or(Error::MissingParameter("target"))
    }

    pub fn ci_test_class(&self) -> Result<CiTestKind> {
        self.ci_test_class.ok_or(Error::MissingParameter("ci_test_class"))
    }
}

impl fmt::Debug for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameters")
            .field("target", &self.target)
            .field("ci_test_class", &self.ci_test_class)
            .field("ci_test_significance", &self.ci_test_significance)
            .field("ci_test_dof_calculator_class", &self.ci_test_dof_calculator_class)
            .field("pc_only", &self.pc_only)
            .field("algorithm_debug", &self.algorithm_debug)
            .field(
                "custom_sufficiency_criterion",
                &self.ci_test_sufficient_samples_criterion.is_some(),
            )
            .field("source_bayesian_network", &self.source_bayesian_network.is_some())
            .finish_non_exhaustive()
    }
}
