//! IPC-MB: Markov-blanket discovery by iterative parent/children recognition.
//!
//! The search runs in two phases over a single [`CiTest`]:
//!
//! 1. **Parents and children.** [`AlgorithmIpcmb::recognize_pc`] shrinks a
//!    candidate set by removing every node that some conditioning set drawn
//!    from the remaining candidates separates from the target. Conditioning
//!    sets grow by one element per round, and the first separating set found
//!    for a pair is cached. A candidate `X` of `T` joins `PC(T)` only if `T`
//!    is also recognized as a candidate of `X`.
//! 2. **Spouses.** For each `X` in `PC(T)`, every candidate of `X` that was
//!    separated from `T` by `S` becomes a spouse if `T` and it are dependent
//!    given `S ∪ {X}`.
//!
//! Nodes and conditioning sets are visited in ascending order, so a run is
//! reproducible query for query. When a test reports insufficient samples the
//! search leans towards a smaller blanket: the candidate is dropped in the
//! first phase and is not added in the second.

use std::rc::Rc;

use log::{debug, info, trace};

use crate::ci::{build_ci_test, CiOutcome, CiTest, CiTestKind, CiTestResult};
use crate::dataset::DatasetMatrix;
use crate::error::{Error, Result};
use crate::params::Parameters;
use crate::setcache::SetCache;
use crate::types::{VarId, VarSet};
use crate::utils::{binomial, combinations};

pub struct AlgorithmIpcmb {
    target: VarId,
    universe: VarSet,
    pc_only: bool,
    debug: u8,
    ci_test: Box<dyn CiTest>,
    sep_sets: SetCache<VarSet>,
    candidate_spouses: SetCache<VarSet>,
}

impl AlgorithmIpcmb {
    /// Prepares a search for `parameters.target`.
    ///
    /// The variable universe is `parameters.all_variables` if given, else
    /// every dataset column, else (for d-separation without data) every node
    /// of the source graph.
    pub fn new(parameters: &Parameters, dataset: Option<Rc<DatasetMatrix>>) -> Result<Self> {
        let target = parameters.target()?;
        let universe = Self::universe(parameters, dataset.as_deref())?;
        if !universe.contains(target) {
            return Err(Error::UnknownVariable(target));
        }
        let ci_test = build_ci_test(parameters, dataset)?;

        Ok(Self {
            target,
            universe,
            pc_only: parameters.pc_only,
            debug: parameters.algorithm_debug,
            ci_test,
            sep_sets: SetCache::new(),
            candidate_spouses: SetCache::new(),
        })
    }

    fn universe(parameters: &Parameters, dataset: Option<&DatasetMatrix>) -> Result<VarSet> {
        if let Some(variables) = &parameters.all_variables {
            return Ok(VarSet::from(variables.clone()));
        }
        if let Some(dataset) = dataset {
            return Ok((0..dataset.n_cols()).collect());
        }
        match (parameters.ci_test_class()?, &parameters.source_bayesian_network) {
            (CiTestKind::DSeparation, Some(graph)) => Ok(graph.nodes().into_iter().collect()),
            _ => Err(Error::MissingParameter("all_variables")),
        }
    }

    pub fn target(&self) -> VarId {
        self.target
    }

    pub fn universe_variables(&self) -> &VarSet {
        &self.universe
    }

    pub fn ci_test(&self) -> &dyn CiTest {
        self.ci_test.as_ref()
    }

    pub fn ci_test_results(&self) -> &[CiTestResult] {
        self.ci_test.results()
    }

    /// Separating sets found so far, keyed by unordered pair.
    pub fn sep_sets(&self) -> &SetCache<VarSet> {
        &self.sep_sets
    }

    /// Runs the search for the configured target and finalizes the CI test.
    ///
    /// Returns the Markov blanket (or only the parents and children, with
    /// `pc_only`), ascending.
    pub fn discover_mb(&mut self) -> Result<Vec<VarId>> {
        let mb = self.ipcmb(self.target)?;
        info!(
            "IPC-MB: target {} has blanket {:?} after {} CI tests",
            self.target,
            mb.as_slice(),
            self.ci_test.ci_test_counter()
        );
        self.ci_test.end()?;
        Ok(mb.to_vec())
    }

    pub fn ipcmb(&mut self, target: VarId) -> Result<VarSet> {
        if self.debug >= 1 {
            debug!("ipcmb(target = {})", target);
        }
        self.sep_sets.clear();
        self.candidate_spouses.clear();

        let candidates = self.recognize_pc(target, self.universe.without(target))?;
        if self.debug >= 1 {
            debug!("ipcmb: candidate PC of {} is {:?}", target, candidates.as_slice());
        }

        let mut pc = VarSet::new();
        for x in candidates.iter() {
            let candidates_x = self.recognize_pc(x, self.universe.without(x))?;
            if candidates_x.contains(target) {
                pc.insert(x);
                self.candidate_spouses.add(target, x, candidates_x.without(target));
            } else if self.debug >= 1 {
                debug!("ipcmb: {} does not recognize {}, dropped from PC", x, target);
            }
        }
        if self.debug >= 1 {
            debug!("ipcmb: PC of {} is {:?}", target, pc.as_slice());
        }

        if self.pc_only {
            return Ok(pc);
        }

        let mut mb = pc.clone();
        for x in pc.iter() {
            let spouses = self.candidate_spouses.get(target, x).cloned().unwrap_or_default();
            for y in spouses.iter() {
                if mb.contains(y) {
                    continue;
                }
                let z = self.sep_sets.get(target, y).cloned().unwrap_or_default().with(x);
                match self.ci_test.conditionally_independent(target, y, &z)? {
                    CiOutcome::Dependent => {
                        if self.debug >= 1 {
                            debug!("ipcmb: spouse {} of {} through {}", y, target, x);
                        }
                        mb.insert(y);
                    }
                    CiOutcome::Independent => {}
                    CiOutcome::InsufficientSamples { .. } => {
                        if self.debug >= 2 {
                            trace!("ipcmb: skipping spouse candidate {}, insufficient samples", y);
                        }
                    }
                }
            }
        }
        Ok(mb)
    }

    /// Shrinks `adjacent` to the nodes no subset of the other candidates separates from `target`.
    pub fn recognize_pc(&mut self, target: VarId, adjacent: VarSet) -> Result<VarSet> {
        if self.debug >= 1 {
            debug!("recognize_pc(target = {}, adjacent = {:?})", target, adjacent.as_slice());
        }
        let mut adjacent = adjacent;
        let mut cut_set_size = 0;

        loop {
            if self.debug >= 1 {
                debug!(
                    "recognize_pc: cut set size {}, up to {} conditioning sets per candidate",
                    cut_set_size,
                    binomial(adjacent.len().saturating_sub(1), cut_set_size)
                );
            }
            let mut non_pc = VarSet::new();
            for x in adjacent.iter() {
                let others = adjacent.without(x);
                for z in combinations(others.as_slice(), cut_set_size) {
                    let z = VarSet::from(z);
                    let outcome = self.ci_test.conditionally_independent(x, target, &z)?;
                    if self.debug >= 2 {
                        trace!("recognize_pc: {} vs {} given {:?}: {:?}", x, target, z.as_slice(), outcome);
                    }
                    match outcome {
                        CiOutcome::Independent => {
                            non_pc.insert(x);
                            self.sep_sets.add(target, x, z);
                            break;
                        }
                        CiOutcome::InsufficientSamples { .. } => {
                            non_pc.insert(x);
                        }
                        CiOutcome::Dependent => {}
                    }
                }
                if !self.sep_sets.contains(target, x) {
                    self.sep_sets.add(target, x, VarSet::new());
                }
            }

            adjacent = adjacent.difference(&non_pc);
            cut_set_size += 1;
            if self.debug >= 1 {
                debug!(
                    "recognize_pc: removed {:?}, {} candidates left",
                    non_pc.as_slice(),
                    adjacent.len()
                );
            }
            if adjacent.len() <= cut_set_size {
                break;
            }
        }
        Ok(adjacent)
    }
}
