use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::types::{VarId, VarRepr, VarSet};

pub const DEFAULT_TOLERANCE_STATISTIC_VALUE: f64 = 1e-8;
pub const DEFAULT_TOLERANCE_P_VALUE: f64 = 1e-7;

fn default_tolerance_statistic_value() -> f64 {
    DEFAULT_TOLERANCE_STATISTIC_VALUE
}

fn default_tolerance_p_value() -> f64 {
    DEFAULT_TOLERANCE_P_VALUE
}

fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Record of one conditional-independence query.
///
/// Equality compares every field that describes the outcome, with the
/// statistic and p-value compared within tolerance. Timing, index and extra
/// info are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CiTestResult {
    /// 1-based position in the log of the test that produced it.
    pub index: usize,
    pub independent: Option<bool>,
    pub dependent: Option<bool>,
    pub insufficient_samples: bool,
    pub x: VarRepr,
    pub y: VarRepr,
    pub z: VarRepr,
    pub statistic: String,
    pub statistic_value: f64,
    pub statistic_parameters: BTreeMap<String, f64>,
    pub test_distribution: String,
    pub test_distribution_parameters: BTreeMap<String, f64>,
    pub p_value: f64,
    pub significance: Option<f64>,
    /// Ground-truth independence, when a causal graph was supplied.
    pub computed_d_separation: Option<bool>,
    pub extra_info: Option<String>,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    #[serde(skip, default = "default_tolerance_statistic_value")]
    pub tolerance_statistic_value: f64,
    #[serde(skip, default = "default_tolerance_p_value")]
    pub tolerance_p_value: f64,
}

impl Default for CiTestResult {
    fn default() -> Self {
        Self {
            index: 0,
            independent: None,
            dependent: None,
            insufficient_samples: false,
            x: VarRepr::Unnamed,
            y: VarRepr::Unnamed,
            z: VarRepr::Omega,
            statistic: String::new(),
            statistic_value: 0.0,
            statistic_parameters: BTreeMap::new(),
            test_distribution: String::new(),
            test_distribution_parameters: BTreeMap::new(),
            p_value: 0.0,
            significance: None,
            computed_d_separation: None,
            extra_info: None,
            start_time: 0.0,
            end_time: 0.0,
            duration: 0.0,
            tolerance_statistic_value: DEFAULT_TOLERANCE_STATISTIC_VALUE,
            tolerance_p_value: DEFAULT_TOLERANCE_P_VALUE,
        }
    }
}

impl CiTestResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_timing(&mut self) {
        self.start_time = now();
    }

    pub fn end_timing(&mut self) {
        self.end_time = now();
        self.duration = self.end_time - self.start_time;
    }

    pub fn set_variables(&mut self, x: VarId, y: VarId, z: &VarSet) {
        self.x = VarRepr::Id(x);
        self.y = VarRepr::Id(y);
        self.z = VarRepr::of_set(z);
    }

    pub fn set_independent(&mut self, independent: bool, significance: f64) {
        self.independent = Some(independent);
        self.dependent = Some(!independent);
        self.significance = Some(significance);
        self.insufficient_samples = false;
    }

    pub fn set_dependent(&mut self, dependent: bool, significance: f64) {
        self.set_independent(!dependent, significance);
    }

    /// Marks the test as unreliable: no decision and sentinel statistic and p-value.
    pub fn set_insufficient_samples(&mut self) {
        self.insufficient_samples = true;
        self.independent = None;
        self.dependent = None;
        self.significance = None;
        self.statistic_value = -1.0;
        self.p_value = -1.0;
    }

    pub fn set_statistic(&mut self, name: &str, value: f64, parameters: BTreeMap<String, f64>) {
        self.statistic = name.to_string();
        self.statistic_value = value;
        self.statistic_parameters = parameters;
    }

    pub fn set_distribution(&mut self, name: &str, p_value: f64, parameters: BTreeMap<String, f64>) {
        self.test_distribution = name.to_string();
        self.p_value = p_value;
        self.test_distribution_parameters = parameters;
    }

    /// Degrees of freedom of the reference distribution, if recorded.
    pub fn dof(&self) -> Option<u64> {
        self.test_distribution_parameters.get("DoF").map(|&d| d as u64)
    }

    /// Whether the decision agrees with the ground truth, if one was recorded.
    pub fn accurate(&self) -> Option<bool> {
        match (self.computed_d_separation, self.independent) {
            (Some(truth), Some(independent)) => Some(truth == independent),
            _ => None,
        }
    }

    /// Describes the first field in which `self` and `other` differ.
    pub fn diff(&self, other: &Self) -> Option<String> {
        fn differing<T: fmt::Debug + PartialEq>(name: &str, a: &T, b: &T) -> Option<String> {
            (a != b).then(|| format!("Differing '{}': {:?} vs {:?}", name, a, b))
        }

        differing("insufficient_samples", &self.insufficient_samples, &other.insufficient_samples)
            .or_else(|| differing("independent", &self.independent, &other.independent))
            .or_else(|| differing("dependent", &self.dependent, &other.dependent))
            .or_else(|| differing("X", &self.x, &other.x))
            .or_else(|| differing("Y", &self.y, &other.y))
            .or_else(|| differing("Z", &self.z, &other.z))
            .or_else(|| differing("statistic", &self.statistic, &other.statistic))
            .or_else(|| {
                ((self.statistic_value - other.statistic_value).abs() > self.tolerance_statistic_value).then(|| {
                    format!(
                        "Differing 'statistic_value': {} vs {}",
                        self.statistic_value, other.statistic_value
                    )
                })
            })
            .or_else(|| differing("statistic_parameters", &self.statistic_parameters, &other.statistic_parameters))
            .or_else(|| differing("test_distribution", &self.test_distribution, &other.test_distribution))
            .or_else(|| {
                differing(
                    "test_distribution_parameters",
                    &self.test_distribution_parameters,
                    &other.test_distribution_parameters,
                )
            })
            .or_else(|| {
                ((self.p_value - other.p_value).abs() > self.tolerance_p_value)
                    .then(|| format!("Differing 'p_value': {} vs {}", self.p_value, other.p_value))
            })
            .or_else(|| differing("significance", &self.significance, &other.significance))
            .or_else(|| differing("computed_d_separation", &self.computed_d_separation, &other.computed_d_separation))
    }
}

impl PartialEq for CiTestResult {
    fn eq(&self, other: &Self) -> bool {
        self.diff(other).is_none()
    }
}

impl fmt::Display for CiTestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CI test {}: {:>4} ⊥ {:<4} | {:<20}: ",
            self.index, self.x, self.y, self.z
        )?;
        if self.insufficient_samples {
            write!(f, "INSUFFICIENT SAMPLES")?;
        } else {
            let i_or_d = if self.independent == Some(true) { "I" } else { "D" };
            let check = match self.accurate() {
                Some(true) => "✔",
                Some(false) => "✘",
                None => "",
            };
            write!(
                f,
                "{}{} @ {:6.4} with {}={:>8.6} at p={:<8.6} on {}",
                i_or_d,
                check,
                self.significance.unwrap_or(0.0),
                self.statistic,
                self.statistic_value,
                self.p_value,
                self.test_distribution
            )?;
        }
        write!(f, ", Δt={:>10.4}s", self.duration)?;
        if let Some(extra) = &self.extra_info {
            write!(f, "{}", extra)?;
        }
        Ok(())
    }
}
