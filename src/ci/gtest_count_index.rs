use std::rc::Rc;
use std::time::Duration;

use log::info;

use crate::ci::gtest::{g_statistic, GTestCore};
use crate::ci::{CiOutcome, CiTest, CiTestResult};
use crate::count_index::{ContingencyIndex, CountIndex};
use crate::dataset::DatasetMatrix;
use crate::error::Result;
use crate::infotheory::{conditional_mutual_information, LogBase};
use crate::params::Parameters;
use crate::types::{VarId, VarSet};

/// G-test answering its distribution queries from a count index.
///
/// The index is taken from `ci_test_ad_tree_preloaded` if present, else
/// loaded from `ci_test_ad_tree_path__load`, else built from the dataset (and
/// then saved to `ci_test_ad_tree_path__save`, if given).
pub struct GTestCountIndex {
    core: GTestCore,
    index: Rc<ContingencyIndex>,
}

impl GTestCountIndex {
    pub fn new(parameters: &Parameters, dataset: Rc<DatasetMatrix>) -> Result<Self> {
        let index = Self::prepare_index(parameters, &dataset)?;
        Ok(Self {
            core: GTestCore::new(parameters, dataset)?,
            index,
        })
    }

    fn prepare_index(parameters: &Parameters, dataset: &DatasetMatrix) -> Result<Rc<ContingencyIndex>> {
        if let Some(index) = &parameters.ci_test_ad_tree_preloaded {
            info!("Using preloaded count index");
            index.check_matches(dataset)?;
            return Ok(Rc::clone(index));
        }
        if let Some(path) = &parameters.ci_test_ad_tree_path_load {
            if let Some(index) = ContingencyIndex::load(path)? {
                index.check_matches(dataset)?;
                return Ok(Rc::new(index));
            }
        }
        let index = ContingencyIndex::build(dataset);
        if let Some(path) = &parameters.ci_test_ad_tree_path_save {
            index.save(path)?;
        }
        Ok(Rc::new(index))
    }

    pub fn index(&self) -> &Rc<ContingencyIndex> {
        &self.index
    }

    /// Time spent building or loading the count index.
    pub fn build_duration(&self) -> Duration {
        self.index.build_duration()
    }
}

impl CiTest for GTestCountIndex {
    fn name(&self) -> &'static str {
        "GTestCountIndex"
    }

    fn conditionally_independent(&mut self, x: VarId, y: VarId, z: &VarSet) -> Result<CiOutcome> {
        let result = self.core.begin(x, y, z);
        let zs = z.as_slice();

        let pr_xycz = self.index.make_cpmf(&[x, y], zs)?;
        let pr_xcz = self.index.make_cpmf(&[x], zs)?;
        let pr_ycz = self.index.make_cpmf(&[y], zs)?;
        let pr_z = self.index.make_pmf(zs)?;

        let calculator = &mut self.core.dof_calculator;
        if calculator.requires_pmfs() {
            let with = |head: &[VarId]| -> Vec<VarId> { head.iter().copied().chain(z.iter()).collect() };
            let pr_xyz = self.index.make_pmf(&with(&[x, y]))?;
            let pr_xz = self.index.make_pmf(&with(&[x]))?;
            let pr_yz = self.index.make_pmf(&with(&[y]))?;
            let pr_z = (!z.is_empty()).then_some(&pr_z);
            calculator.set_context_pmfs(Some(&pr_xyz), Some(&pr_xz), Some(&pr_yz), pr_z);
        }
        if calculator.requires_cpmfs() {
            calculator.set_context_cpmfs(&pr_xycz, &pr_xcz, &pr_ycz, &pr_z);
        }
        let dof = calculator.calculate_dof(x, y, z)?;

        let n = self.core.n();
        let outcome = self.core.conclude(result, x, y, z, dof, || {
            let cmi = conditional_mutual_information(&pr_xycz, &pr_xcz, &pr_ycz, &pr_z, LogBase::E);
            Ok(g_statistic(n, cmi))
        })?;

        if self.core.maintenance_due() {
            self.core.release_spare_capacity();
        }
        Ok(outcome)
    }

    fn results(&self) -> &[CiTestResult] {
        self.core.results()
    }

    fn end(&mut self) -> Result<()> {
        self.core.end()
    }
}
