//! Conditional-independence tests.
//!
//! Every backend answers the same query, "is `X ⊥ Y | Z`?", and logs one
//! [`CiTestResult`] per query:
//!
//! | Backend | Source of truth | Statistic |
//! |---------|-----------------|-----------|
//! | [`DSeparationCiTest`] | causal graph | none, exact answer |
//! | [`GTestUnoptimized`] | dataset, counted per query | G, from `I(X;Y\|Z)` over CPMFs |
//! | [`GTestCountIndex`] | dataset, through a [`CountIndex`][crate::count_index::CountIndex] | G, from `I(X;Y\|Z)` over CPMFs |
//! | [`GTestEntropyCache`] | dataset, through the joint entropy table | G, from `H(XZ) + H(YZ) - H(XYZ) - H(Z)` |
//!
//! For a fixed dataset, DoF calculator and significance, the three G-test
//! backends produce equal results (within the tolerances of [`CiTestResult`]).
//!
//! A G-test that does not have enough samples for its degrees of freedom
//! returns [`CiOutcome::InsufficientSamples`] rather than a decision.

mod dsep;
mod gtest;
mod gtest_count_index;
mod gtest_entropy;
mod gtest_unoptimized;
mod result;

use std::rc::Rc;

use serde::{Deserialize, Serialize};

pub use dsep::DSeparationCiTest;
pub use gtest_count_index::GTestCountIndex;
pub use gtest_entropy::GTestEntropyCache;
pub use gtest_unoptimized::GTestUnoptimized;
pub use result::{CiTestResult, DEFAULT_TOLERANCE_P_VALUE, DEFAULT_TOLERANCE_STATISTIC_VALUE};

use crate::dataset::DatasetMatrix;
use crate::error::{Error, Result};
use crate::params::Parameters;
use crate::types::{VarId, VarSet};

/// Outcome of a single CI query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CiOutcome {
    Independent,
    Dependent,
    /// The test was not reliable for this sample size; no decision was made.
    InsufficientSamples {
        x: VarId,
        y: VarId,
        z: VarSet,
        dof: u64,
        n: usize,
    },
}

impl CiOutcome {
    pub fn from_independence(independent: bool) -> Self {
        if independent {
            CiOutcome::Independent
        } else {
            CiOutcome::Dependent
        }
    }

    pub fn is_independent(&self) -> bool {
        matches!(self, CiOutcome::Independent)
    }

    pub fn is_insufficient(&self) -> bool {
        matches!(self, CiOutcome::InsufficientSamples { .. })
    }

    /// The decision, or [`Error::InsufficientSamples`] if none was made.
    pub fn into_independence(self) -> Result<bool> {
        match self {
            CiOutcome::Independent => Ok(true),
            CiOutcome::Dependent => Ok(false),
            CiOutcome::InsufficientSamples { x, y, z, dof, n } => Err(Error::InsufficientSamples { x, y, z, dof, n }),
        }
    }
}

pub trait CiTest {
    fn name(&self) -> &'static str;

    /// Tests `x ⊥ y | z` and appends the result to the log.
    fn conditionally_independent(&mut self, x: VarId, y: VarId, z: &VarSet) -> Result<CiOutcome>;

    /// The log of results, in query order.
    fn results(&self) -> &[CiTestResult];

    /// Number of queries answered so far.
    fn ci_test_counter(&self) -> usize {
        self.results().len()
    }

    /// Persists whatever the test accumulated. Called once, after the last query.
    fn end(&mut self) -> Result<()>;
}

/// Selects a [`CiTest`] backend.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum CiTestKind {
    DSeparation,
    GTestUnoptimized,
    GTestCountIndex,
    GTestEntropyCache,
}

impl CiTestKind {
    pub fn requires_dataset(self) -> bool {
        !matches!(self, CiTestKind::DSeparation)
    }
}

/// Builds the backend named by `parameters.ci_test_class`.
///
/// G-tests need `dataset`; the d-separation test needs
/// `parameters.source_bayesian_network`.
pub fn build_ci_test(parameters: &Parameters, dataset: Option<Rc<DatasetMatrix>>) -> Result<Box<dyn CiTest>> {
    let dataset = || dataset.clone().ok_or(Error::MissingParameter("dataset"));
    let test: Box<dyn CiTest> = match parameters.ci_test_class()? {
        CiTestKind::DSeparation => Box::new(DSeparationCiTest::new(parameters)?),
        CiTestKind::GTestUnoptimized => Box::new(GTestUnoptimized::new(parameters, dataset()?)?),
        CiTestKind::GTestCountIndex => Box::new(GTestCountIndex::new(parameters, dataset()?)?),
        CiTestKind::GTestEntropyCache => Box::new(GTestEntropyCache::new(parameters, dataset()?)?),
    };
    Ok(test)
}
