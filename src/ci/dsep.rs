use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

use log::debug;

use crate::ci::{CiOutcome, CiTest, CiTestResult};
use crate::error::{Error, Result};
use crate::graph::DirectedGraph;
use crate::params::Parameters;
use crate::persist;
use crate::types::{VarId, VarSet};

/// Exact CI oracle backed by a known causal graph.
pub struct DSeparationCiTest {
    graph: Rc<DirectedGraph>,
    results: Vec<CiTestResult>,
    results_path_save: Option<PathBuf>,
}

impl DSeparationCiTest {
    pub fn new(parameters: &Parameters) -> Result<Self> {
        let graph = parameters
            .source_bayesian_network
            .clone()
            .ok_or(Error::MissingParameter("source_bayesian_network"))?;
        Ok(Self::with_graph(graph).save_results_to(parameters.ci_test_results_path_save.clone()))
    }

    pub fn with_graph(graph: Rc<DirectedGraph>) -> Self {
        Self {
            graph,
            results: Vec::new(),
            results_path_save: None,
        }
    }

    fn save_results_to(mut self, path: Option<PathBuf>) -> Self {
        self.results_path_save = path;
        self
    }

    pub fn graph(&self) -> &DirectedGraph {
        &self.graph
    }
}

impl CiTest for DSeparationCiTest {
    fn name(&self) -> &'static str {
        "DSeparationCiTest"
    }

    fn conditionally_independent(&mut self, x: VarId, y: VarId, z: &VarSet) -> Result<CiOutcome> {
        let mut result = CiTestResult::new();
        result.start_timing();
        let independent = self.graph.d_separated(x, y, z)?;
        result.end_timing();

        result.index = self.results.len() + 1;
        result.set_variables(x, y, z);
        result.set_independent(independent, 0.0);
        result.set_statistic("None", 0.0, BTreeMap::new());
        result.set_distribution("None", 0.0, BTreeMap::new());
        result.computed_d_separation = Some(independent);

        debug!("{}", result);
        self.results.push(result);
        Ok(CiOutcome::from_independence(independent))
    }

    fn results(&self) -> &[CiTestResult] {
        &self.results
    }

    fn end(&mut self) -> Result<()> {
        if let Some(path) = &self.results_path_save {
            persist::save_json(path, &self.results)?;
        }
        Ok(())
    }
}
