use std::rc::Rc;

use crate::ci::gtest::{g_statistic, GTestCore};
use crate::ci::{CiOutcome, CiTest, CiTestResult};
use crate::dataset::DatasetMatrix;
use crate::error::Result;
use crate::infotheory::{conditional_mutual_information, LogBase};
use crate::params::Parameters;
use crate::pmf::{make_cpmf_xcz, make_cpmf_xycz, Cpmf, Pmf};
use crate::types::{VarId, VarSet};

/// G-test counting every distribution it needs from the dataset, per query.
///
/// The conditional PMFs are derived from the joint PMFs by division, so the
/// dataset is scanned four times per query (`XYZ`, `XZ`, `YZ`, `Z`).
pub struct GTestUnoptimized {
    core: GTestCore,
}

struct Distributions {
    pr_xycz: Cpmf,
    pr_xcz: Cpmf,
    pr_ycz: Cpmf,
    pr_z: Pmf,
}

impl GTestUnoptimized {
    pub fn new(parameters: &Parameters, dataset: Rc<DatasetMatrix>) -> Result<Self> {
        Ok(Self {
            core: GTestCore::new(parameters, dataset)?,
        })
    }

    fn joint_pmf(&self, ids: &[VarId]) -> Result<Pmf> {
        Ok(Pmf::from_observed(&self.core.dataset.get_variables(ids)?))
    }

    /// Computes the distributions of the query and feeds the DoF calculator its joint PMFs.
    fn distributions(&mut self, x: VarId, y: VarId, z: &VarSet) -> Result<Distributions> {
        if z.is_empty() {
            let pr_xy = self.joint_pmf(&[x, y])?;
            let pr_x = self.joint_pmf(&[x])?;
            let pr_y = self.joint_pmf(&[y])?;
            self.core
                .dof_calculator
                .set_context_pmfs(Some(&pr_xy), Some(&pr_x), Some(&pr_y), None);
            return Ok(Distributions {
                pr_xycz: Cpmf::omega(pr_xy),
                pr_xcz: Cpmf::omega(pr_x),
                pr_ycz: Cpmf::omega(pr_y),
                pr_z: Pmf::omega(),
            });
        }

        let with = |head: &[VarId]| -> Vec<VarId> { head.iter().copied().chain(z.iter()).collect() };
        let pr_xyz = self.joint_pmf(&with(&[x, y]))?;
        let pr_xz = self.joint_pmf(&with(&[x]))?;
        let pr_yz = self.joint_pmf(&with(&[y]))?;
        let pr_z = self.joint_pmf(z.as_slice())?;
        self.core
            .dof_calculator
            .set_context_pmfs(Some(&pr_xyz), Some(&pr_xz), Some(&pr_yz), Some(&pr_z));

        Ok(Distributions {
            pr_xycz: make_cpmf_xycz(z.len(), &pr_xyz, &pr_z),
            pr_xcz: make_cpmf_xcz(z.len(), &pr_xz, &pr_z),
            pr_ycz: make_cpmf_xcz(z.len(), &pr_yz, &pr_z),
            pr_z,
        })
    }
}

impl CiTest for GTestUnoptimized {
    fn name(&self) -> &'static str {
        "GTestUnoptimized"
    }

    fn conditionally_independent(&mut self, x: VarId, y: VarId, z: &VarSet) -> Result<CiOutcome> {
        let result = self.core.begin(x, y, z);
        let d = self.distributions(x, y, z)?;

        let calculator = &mut self.core.dof_calculator;
        if calculator.requires_cpmfs() {
            calculator.set_context_cpmfs(&d.pr_xycz, &d.pr_xcz, &d.pr_ycz, &d.pr_z);
        }
        let dof = calculator.calculate_dof(x, y, z)?;

        let n = self.core.n();
        let outcome = self.core.conclude(result, x, y, z, dof, || {
            let cmi = conditional_mutual_information(&d.pr_xycz, &d.pr_xcz, &d.pr_ycz, &d.pr_z, LogBase::E);
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
