use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use log::{debug, info};

use crate::ci::gtest::{g_statistic, GTestCore};
use crate::ci::{CiOutcome, CiTest, CiTestResult};
use crate::dataset::DatasetMatrix;
use crate::entropy_cache::EntropyCache;
use crate::error::{Error, Result};
use crate::params::Parameters;
use crate::pmf::Pmf;
use crate::types::{VarId, VarSet};

/// G-test computing `I(X;Y|Z)` from cached joint entropies:
///
/// ```text
/// I(X;Y|Z) = H(X,Z) + H(Y,Z) - H(X,Y,Z) - H(Z)
/// ```
///
/// Each joint entropy is computed once per variable set and kept in the joint
/// entropy table (JHT). Since joint PMFs are only computed on JHT misses, the
/// DoF calculator can only be one that learns from joint PMFs (or needs
/// nothing); calculators requiring conditional PMFs are rejected.
pub struct GTestEntropyCache {
    core: GTestCore,
    jht: Rc<RefCell<EntropyCache>>,
    jht_path_save: Option<PathBuf>,
}

impl GTestEntropyCache {
    pub fn new(parameters: &Parameters, dataset: Rc<DatasetMatrix>) -> Result<Self> {
        let core = GTestCore::new(parameters, dataset)?;
        if core.dof_calculator.requires_cpmfs() {
            return Err(Error::IncompatibleDofCalculator {
                backend: "GTestEntropyCache",
                calculator: core.dof_calculator.name(),
            });
        }

        let jht = match (&parameters.ci_test_jht_preloaded, &parameters.ci_test_jht_path_load) {
            (Some(jht), _) => {
                info!("Using preloaded JHT");
                Rc::clone(jht)
            }
            (None, Some(path)) => Rc::new(RefCell::new(EntropyCache::load(path)?)),
            (None, None) => Rc::new(RefCell::new(EntropyCache::new())),
        };

        Ok(Self {
            core,
            jht,
            jht_path_save: parameters.ci_test_jht_path_save.clone(),
        })
    }

    pub fn jht(&self) -> &Rc<RefCell<EntropyCache>> {
        &self.jht
    }

    pub fn jht_reads(&self) -> u64 {
        self.jht.borrow().reads()
    }

    pub fn jht_misses(&self) -> u64 {
        self.jht.borrow().misses()
    }

    fn joint_pmf(&self, variables: &VarSet) -> Result<Pmf> {
        Ok(Pmf::from_observed(&self.core.dataset.get_variables(variables.as_slice())?))
    }

    /// Joint entropy of `variables` in nats; the empty set has entropy 0.
    fn entropy_term(&mut self, variables: VarSet) -> Result<f64> {
        if variables.is_empty() {
            return Ok(0.0);
        }
        if let Some(h) = self.jht.borrow_mut().lookup(&variables) {
            return Ok(h);
        }

        let pmf = self.joint_pmf(&variables)?;
        let h = -pmf.expected_value(|_, p| p.ln());
        self.jht.borrow_mut().insert(variables, h);
        if self.core.dof_calculator.requires_pmfs() {
            self.core.dof_calculator.set_context_pmfs(Some(&pmf), None, None, None);
        }
        Ok(h)
    }

    fn g_value(&mut self, x: VarId, y: VarId, z: &VarSet) -> Result<f64> {
        let h_xyz = self.entropy_term(z.with(x).with(y))?;
        let h_xz = self.entropy_term(z.with(x))?;
        let h_yz = self.entropy_term(z.with(y))?;
        let h_z = self.entropy_term(z.clone())?;
        let cmi = h_yz + h_xz - h_xyz - h_z;
        Ok(g_statistic(self.core.n(), cmi))
    }
}

impl CiTest for GTestEntropyCache {
    fn name(&self) -> &'static str {
        "GTestEntropyCache"
    }

    fn conditionally_independent(&mut self, x: VarId, y: VarId, z: &VarSet) -> Result<CiOutcome> {
        let result = self.core.begin(x, y, z);

        // G comes first: a JHT miss is the only moment the joint PMFs exist,
        // and a caching DoF calculator must have seen them before it is asked.
        let g = self.g_value(x, y, z)?;

        if self.core.dof_calculator.needs_joint_pmf(x, y, z) {
            // The entropies were all JHT hits, yet the calculator never saw the joint.
            let pmf = self.joint_pmf(&z.with(x).with(y))?;
            self.core.dof_calculator.set_context_pmfs(Some(&pmf), None, None, None);
        }
        let dof = self.core.dof_calculator.calculate_dof(x, y, z)?;

        let outcome = self.core.conclude(result, x, y, z, dof, || Ok(g))?;

        if self.core.maintenance_due() {
            self.core.release_spare_capacity();
            let mut jht = self.jht.borrow_mut();
            jht.shrink_to_fit();
            debug!(
                "JHT: {} entries, {} reads, {} misses",
                jht.len(),
                jht.reads(),
                jht.misses()
            );
        }
        Ok(outcome)
    }

    fn results(&self) -> &[CiTestResult] {
        self.core.results()
    }

    fn end(&mut self) -> Result<()> {
        self.core.end()?;
        if let Some(path) = &self.jht_path_save {
            self.jht.borrow().save(path)?;
        }
        Ok(())
    }
}
