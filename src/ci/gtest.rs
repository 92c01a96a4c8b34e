//! Machinery shared by the G-test backends.
//!
//! A backend computes the degrees of freedom and (lazily) the G statistic of a
//! query its own way; [`GTestCore::conclude`] then applies the sufficiency
//! heuristic, converts G into a p-value, decides, and logs the result.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

use log::{debug, info};

use crate::ci::{CiOutcome, CiTestResult};
use crate::dataset::DatasetMatrix;
use crate::dof::DofCalculator;
use crate::error::Result;
use crate::graph::DirectedGraph;
use crate::params::{Parameters, SufficiencyCriterion};
use crate::persist;
use crate::stats::chi2_cdf;
use crate::types::{VarId, VarSet};

/// `G = 2 N I(X;Y|Z)`, with the mutual information in nats.
pub(crate) fn g_statistic(n: usize, cmi: f64) -> f64 {
    2.0 * n as f64 * cmi
}

pub(crate) struct GTestCore {
    pub(crate) dataset: Rc<DatasetMatrix>,
    pub(crate) dof_calculator: Box<dyn DofCalculator>,
    significance: f64,
    criterion: Option<SufficiencyCriterion>,
    gc_collect_rate: usize,
    results_path_save: Option<PathBuf>,
    source_graph: Option<Rc<DirectedGraph>>,
    debug: bool,
    results: Vec<CiTestResult>,
    maintenance_passes: usize,
}

impl GTestCore {
    pub(crate) fn new(parameters: &Parameters, dataset: Rc<DatasetMatrix>) -> Result<Self> {
        let dof_calculator = parameters.ci_test_dof_calculator_class.build(
            &dataset,
            parameters.ci_test_dof_calculator_cache_path_load.as_deref(),
            parameters.ci_test_dof_calculator_cache_path_save.as_deref(),
        )?;
        Ok(Self {
            dataset,
            dof_calculator,
            significance: parameters.ci_test_significance,
            criterion: parameters.ci_test_sufficient_samples_criterion.clone(),
            gc_collect_rate: parameters.ci_test_gc_collect_rate,
            results_path_save: parameters.ci_test_results_path_save.clone(),
            source_graph: parameters.source_bayesian_network.clone(),
            debug: parameters.ci_test_debug,
            results: Vec::new(),
            maintenance_passes: 0,
        })
    }

    /// Sample count `N`.
    pub(crate) fn n(&self) -> usize {
        self.dataset.n_rows()
    }

    pub(crate) fn results(&self) -> &[CiTestResult] {
        &self.results
    }

    /// Starts a query: resets the DoF calculator and starts the clock.
    pub(crate) fn begin(&mut self, x: VarId, y: VarId, z: &VarSet) -> CiTestResult {
        self.dof_calculator.reset();
        self.dof_calculator.set_context_variables(x, y, z);
        let mut result = CiTestResult::new();
        result.start_timing();
        result
    }

    /// Default: reliable when `5 · DoF < N`.
    pub(crate) fn sufficient_samples(&self, dof: u64) -> bool {
        let n = self.n();
        match &self.criterion {
            Some(criterion) => criterion(dof, n),
            None => 5u64.saturating_mul(dof) < n as u64,
        }
    }

    /// Finishes a query whose DoF is known; `statistic` is only evaluated if the sample suffices.
    pub(crate) fn conclude(
        &mut self,
        mut result: CiTestResult,
        x: VarId,
        y: VarId,
        z: &VarSet,
        dof: u64,
        statistic: impl FnOnce() -> Result<f64>,
    ) -> Result<CiOutcome> {
        let index = self.results.len() + 1;
        if let Some(graph) = &self.source_graph {
            result.computed_d_separation = Some(graph.d_separated(x, y, z)?);
        }

        if !self.sufficient_samples(dof) {
            result.end_timing();
            result.index = index;
            result.set_insufficient_samples();
            result.set_variables(x, y, z);
            result.extra_info = Some(format!(" DoF {}", dof));
            self.record(result);
            return Ok(CiOutcome::InsufficientSamples {
                x,
                y,
                z: z.clone(),
                dof,
                n: self.n(),
            });
        }

        let g = statistic()?;
        let p = chi2_cdf(g, dof);
        let independent = p < self.significance;

        result.end_timing();
        result.index = index;
        result.set_independent(independent, self.significance);
        result.set_variables(x, y, z);
        result.set_statistic("G", g, BTreeMap::new());
        result.set_distribution("chi2", p, [("DoF".to_string(), dof as f64)].into());
        result.extra_info = Some(format!(" DoF {}", dof));
        self.record(result);
        Ok(CiOutcome::from_independence(independent))
    }

    fn record(&mut self, result: CiTestResult) {
        if self.debug {
            info!("{}", result);
        } else {
            debug!("{}", result);
        }
        self.results.push(result);
    }

    /// Whether the test just logged is due for a maintenance pass.
    pub(crate) fn maintenance_due(&self) -> bool {
        self.gc_collect_rate != 0 && self.results.len() % self.gc_collect_rate == 0
    }

    /// Releases spare capacity of the result log and the DoF calculator's tables.
    pub(crate) fn release_spare_capacity(&mut self) {
        self.results.shrink_to_fit();
        self.dof_calculator.shrink_to_fit();
        self.maintenance_passes += 1;
        debug!(
            "Maintenance pass {} after {} CI tests",
            self.maintenance_passes,
            self.results.len()
        );
    }

    #[cfg(test)]
    pub(crate) fn maintenance_passes(&self) -> usize {
        self.maintenance_passes
    }

    /// Saves the result log (if requested) and ends the DoF calculator.
    pub(crate) fn end(&mut self) -> Result<()> {
        if let Some(path) = &self.results_path_save {
            persist::save_json(path, &self.results)?;
        }
        self.dof_calculator.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::ci::CiTestKind;

    fn core(n: usize, parameters: Parameters) -> GTestCore {
        let column: Vec<u32> = (0..n as u32).map(|i| i % 2).collect();
        let dataset = DatasetMatrix::from_columns("d", vec![column.clone(), column]).unwrap();
        GTestCore::new(&parameters, Rc::new(dataset)).unwrap()
    }

    #[test]
    fn test_default_sufficiency_is_strict() {
        let core = core(20, Parameters::new(0, CiTestKind::GTestUnoptimized));
        assert!(core.sufficient_samples(3));
        assert!(!core.sufficient_samples(4));
    }

    #[test]
    fn test_custom_sufficiency() {
        let params = Parameters::new(0, CiTestKind::GTestUnoptimized).with_sufficiency_criterion(|_, _| true);
        let core = core(4, params);
        assert!(core.sufficient_samples(1000));
    }

    #[test]
    fn test_insufficient_skips_statistic() {
        let mut core = core(10, Parameters::new(0, CiTestKind::GTestUnoptimized));
        let z = VarSet::new();
        let result = core.begin(0, 1, &z);
        let outcome = core
            .conclude(result, 0, 1, &z, 2, || panic!("statistic must not be computed"))
            .unwrap();
        assert!(outcome.is_insufficient());
        assert_eq!(core.results().len(), 1);
        assert!(core.results()[0].insufficient_samples);
        assert_eq!(core.results()[0].index, 1);
    }

    #[test]
    fn test_decision_compares_cdf_with_significance() {
        let params = Parameters::new(0, CiTestKind::GTestUnoptimized).with_significance(0.5);
        let mut core = core(100, params);
        let z = VarSet::new();

        // Small G: CDF close to 0, below the significance.
        let r = core.begin(0, 1, &z);
        assert!(core.conclude(r, 0, 1, &z, 1, || Ok(0.01)).unwrap().is_independent());
        // Large G: CDF close to 1.
        let r = core.begin(0, 1, &z);
        assert!(!core.conclude(r, 0, 1, &z, 1, || Ok(50.0)).unwrap().is_independent());

        let last = &core.results()[1];
        assert_eq!(last.index, 2);
        assert_eq!(last.dof(), Some(1));
        assert_eq!(last.statistic, "G");
        assert_eq!(last.extra_info.as_deref(), Some(" DoF 1"));
    }

    #[test]
    fn test_maintenance_rate() {
        let mut core = core(100, Parameters::new(0, CiTestKind::GTestUnoptimized).with_gc_collect_rate(2));
        let z = VarSet::new();
        let r = core.begin(0, 1, &z);
        core.conclude(r, 0, 1, &z, 1, || Ok(1.0)).unwrap();
        assert!(!core.maintenance_due());
        let r = core.begin(0, 1, &z);
        core.conclude(r, 0, 1, &z, 1, || Ok(1.0)).unwrap();
        assert!(core.maintenance_due());
        core.release_spare_capacity();
        assert_eq!(core.maintenance_passes(), 1);
        assert_eq!(core.results().len(), 2);
    }

    #[test]
    fn test_ground_truth_recorded_for_insufficient_results() {
        let params = Parameters::new(0, CiTestKind::GTestUnoptimized)
            .with_source_bayesian_network(Rc::new(DirectedGraph::from_edges([(0, 1)])));
        let mut core = core(10, params);
        let z = VarSet::new();

        let r = core.begin(0, 1, &z);
        assert!(core.conclude(r, 0, 1, &z, 2, || Ok(1.0)).unwrap().is_insufficient());
        let r = core.begin(0, 1, &z);
        assert!(!core.conclude(r, 0, 1, &z, 1, || Ok(50.0)).unwrap().is_insufficient());

        let insufficient = &core.results()[0];
        assert_eq!(insufficient.computed_d_separation, Some(false));
        assert_eq!(insufficient.accurate(), None);
        let decided = &core.results()[1];
        assert_eq!(decided.computed_d_separation, Some(false));
        assert_eq!(decided.accurate(), Some(true));
    }
}
