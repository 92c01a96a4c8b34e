//! Empirical probability mass functions.
//!
//! A [`Pmf`] is built by counting the keys observed for a variable (simple or
//! joint) and normalizing the counts by the total. A [`Cpmf`] maps each value
//! of a conditioning variable to the PMF of the conditioned variable restricted
//! to the samples where that value was observed.
//!
//! Lookups never fail: absent keys have probability `0.0`, and conditioning on
//! an absent key yields an empty PMF.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use crate::error::{Error, Result};
use crate::key::{Key, KeyPart};
use crate::types::{VarId, OMEGA_VALUE};
use crate::variable::Observed;

/// Default tolerance used when comparing probabilities.
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone)]
pub struct Pmf {
    ids: Vec<VarId>,
    counts: BTreeMap<Key, u64>,
    probabilities: BTreeMap<Key, f64>,
    total: u64,
    tolerance: f64,
}

impl Default for Pmf {
    fn default() -> Self {
        Self::new()
    }
}

impl Pmf {
    /// An empty PMF, usable as an accumulator.
    pub fn new() -> Self {
        Self {
            ids: Vec::new(),
            counts: BTreeMap::new(),
            probabilities: BTreeMap::new(),
            total: 0,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Counts the keys of `variable` and normalizes them.
    pub fn from_observed(variable: &impl Observed) -> Self {
        let counts = Self::count(variable);
        let total = variable.len() as u64;
        let mut pmf = Self {
            ids: variable.ids(),
            counts,
            probabilities: BTreeMap::new(),
            total,
            tolerance: DEFAULT_TOLERANCE,
        };
        pmf.normalize();
        pmf
    }

    /// Builds a PMF from precomputed counts.
    pub fn from_counts(ids: Vec<VarId>, counts: impl IntoIterator<Item = (Key, u64)>) -> Self {
        let mut pmf = Self::new().with_ids(ids);
        for (key, count) in counts {
            pmf.count_instance(key, count);
        }
        pmf.normalize();
        pmf
    }

    /// Builds a PMF directly from probabilities, without counts.
    pub fn from_probabilities(ids: Vec<VarId>, probabilities: impl IntoIterator<Item = (Key, f64)>) -> Self {
        let mut pmf = Self::new().with_ids(ids);
        pmf.probabilities = probabilities.into_iter().collect();
        pmf
    }

    /// The PMF of Ω: the single value [`OMEGA_VALUE`] with probability 1.
    pub fn omega() -> Self {
        Self::from_probabilities(Vec::new(), [(Key::scalar(OMEGA_VALUE), 1.0)])
    }

    /// Counts how many times each key occurs in `variable`.
    pub fn count(variable: &impl Observed) -> BTreeMap<Key, u64> {
        let mut counts = BTreeMap::new();
        for row in 0..variable.len() {
            *counts.entry(variable.key_at(row)).or_insert(0) += 1;
        }
        counts
    }

    pub fn count_instance(&mut self, key: Key, count: u64) {
        *self.counts.entry(key).or_insert(0) += count;
        self.total += count;
    }

    /// Recomputes the probabilities as `count / total`.
    pub fn normalize(&mut self) -> &BTreeMap<Key, f64> {
        let total = self.total as f64;
        self.probabilities = self
            .counts
            .iter()
            .map(|(key, &count)| (key.clone(), count as f64 / total))
            .collect();
        &self.probabilities
    }

    /// Probability of `key`, or `0.0` if it was never observed.
    pub fn p(&self, key: impl KeyPart) -> f64 {
        self.probabilities.get(&Key::of(key)).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = (&Key, f64)> {
        self.probabilities.iter().map(|(k, &p)| (k, p))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.probabilities.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.probabilities.values().copied()
    }

    pub fn counts(&self) -> &BTreeMap<Key, u64> {
        &self.counts
    }

    pub fn total_count(&self) -> u64 {
        self.total
    }

    /// Ids of the variables making up the keys, in key order.
    pub fn ids(&self) -> &[VarId] {
        &self.ids
    }

    pub fn with_ids(mut self, ids: Vec<VarId>) -> Self {
        self.ids = ids;
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = tolerance;
    }

    /// Drops entries whose probability is exactly zero.
    pub fn remove_zeros(&mut self) {
        self.probabilities.retain(|_, p| *p != 0.0);
    }

    /// Marginalizes out the variable `id`.
    ///
    /// Probabilities of keys differing only in the position of `id` are summed.
    pub fn sum_over(&self, id: VarId) -> Result<Pmf> {
        let index = self
            .ids
            .iter()
            .position(|&v| v == id)
            .ok_or(Error::UnknownVariable(id))?;

        let mut probabilities: BTreeMap<Key, f64> = BTreeMap::new();
        for (key, &p) in &self.probabilities {
            *probabilities.entry(key.without(index)).or_insert(0.0) += p;
        }

        let mut ids = self.ids.clone();
        ids.remove(index);
        Ok(Pmf::from_probabilities(ids, probabilities))
    }

    /// `Σ p(v) · f(v, p(v))` over the support.
    pub fn expected_value(&self, f: impl Fn(&Key, f64) -> f64) -> f64 {
        self.items().map(|(k, p)| p * f(k, p)).sum()
    }

    /// Smallest sample count able to represent the least likely nonzero key.
    pub fn min_instance_count_for_accuracy(&self) -> Option<u64> {
        self.values()
            .filter(|&p| p > 0.0)
            .min_by(|a, b| a.total_cmp(b))
            .map(|p| (1.0 / p).round() as u64)
    }

    /// Splits this joint PMF into a conditional PMF given the variables of `cond`.
    ///
    /// Every key of `self` is divided into its conditioning part (the
    /// positions of `cond.ids()`, in that order) and the remainder; the
    /// probability stored is `p(joint) / p(cond)`.
    pub fn condition_on(&self, cond: &Pmf) -> Result<Cpmf> {
        if cond.ids().is_empty() {
            return Ok(Cpmf::omega(self.clone()));
        }
        let cond_positions = positions_of(&self.ids, cond.ids())?;
        let rest: Vec<VarId> = self.ids.iter().copied().filter(|id| !cond.ids().contains(id)).collect();
        let rest_positions = positions_of(&self.ids, &rest)?;
        Ok(split_joint(self, &rest_positions, &cond_positions, cond))
    }
}

fn positions_of(ids: &[VarId], wanted: &[VarId]) -> Result<Vec<usize>> {
    wanted
        .iter()
        .map(|w| ids.iter().position(|id| id == w).ok_or(Error::UnknownVariable(*w)))
        .collect()
}

fn split_joint(joint: &Pmf, var_positions: &[usize], cond_positions: &[usize], cond: &Pmf) -> Cpmf {
    let mut cpmf = Cpmf::new();
    for (key, p) in joint.items() {
        let cond_key = key.project(cond_positions);
        let var_key = key.project(var_positions);
        let pz = cond.p(&cond_key);
        let pmf = cpmf.conditional.entry(cond_key).or_default();
        if pz != 0.0 {
            pmf.probabilities.insert(var_key, p / pz);
        }
    }
    cpmf
}

/// `Pr(X, Y | Z)` from the joint `Pr(X, Y, Z)` (keys ordered `[x, y, z...]`) and `Pr(Z)`.
pub fn make_cpmf_xycz(z_len: usize, pr_xyz: &Pmf, pr_z: &Pmf) -> Cpmf {
    let cond_positions: Vec<usize> = (2..2 + z_len).collect();
    split_joint(pr_xyz, &[0, 1], &cond_positions, pr_z)
}

/// `Pr(X | Z)` from the joint `Pr(X, Z)` (keys ordered `[x, z...]`) and `Pr(Z)`.
pub fn make_cpmf_xcz(z_len: usize, pr_xz: &Pmf, pr_z: &Pmf) -> Cpmf {
    let cond_positions: Vec<usize> = (1..1 + z_len).collect();
    split_joint(pr_xz, &[0], &cond_positions, pr_z)
}

impl PartialEq for Pmf {
    fn eq(&self, other: &Self) -> bool {
        if self.probabilities.len() != other.probabilities.len() {
            return false;
        }
        self.probabilities.iter().all(|(key, &p)| match other.probabilities.get(key) {
            Some(&q) => (p - q).abs() <= self.tolerance,
            None => false,
        })
    }
}

impl fmt::Display for Pmf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, p) in self.items() {
            writeln!(f, "{}: {}", key, p)?;
        }
        Ok(())
    }
}

/// A conditional PMF: conditioning key → PMF.
#[derive(Debug, Clone, Default)]
pub struct Cpmf {
    conditional: BTreeMap<Key, Pmf>,
    empty: Pmf,
}

impl Cpmf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts `variable` separately for each value of `given`.
    pub fn from_observed(variable: &impl Observed, given: &impl Observed) -> Result<Self> {
        if variable.len() != given.len() {
            return Err(Error::UnequalInstanceCount {
                first: format!("{:?}", variable.labels()),
                second: format!("{:?}", given.labels()),
                first_len: variable.len(),
                second_len: given.len(),
            });
        }
        let mut cpmf = Self::new();
        for row in 0..variable.len() {
            cpmf.conditional
                .entry(given.key_at(row))
                .or_default()
                .count_instance(variable.key_at(row), 1);
        }
        for pmf in cpmf.conditional.values_mut() {
            pmf.normalize();
        }
        Ok(cpmf)
    }

    /// Wraps an unconditional PMF as conditioned on Ω.
    pub fn omega(pmf: Pmf) -> Self {
        let mut cpmf = Self::new();
        cpmf.conditional.insert(Key::scalar(OMEGA_VALUE), pmf);
        cpmf
    }

    pub fn insert(&mut self, key: Key, pmf: Pmf) {
        self.conditional.insert(key, pmf);
    }

    /// PMF conditioned on `key`, or an empty PMF if `key` was never observed.
    pub fn given(&self, key: impl KeyPart) -> &Pmf {
        self.conditional.get(&Key::of(key)).unwrap_or(&self.empty)
    }

    pub fn len(&self) -> usize {
        self.conditional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditional.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.conditional.keys()
    }

    pub fn items(&self) -> impl Iterator<Item = (&Key, &Pmf)> {
        self.conditional.iter()
    }
}

impl PartialEq for Cpmf {
    fn eq(&self, other: &Self) -> bool {
        self.conditional.len() == other.conditional.len()
            && self
                .conditional
                .iter()
                .all(|(key, pmf)| other.conditional.get(key).is_some_and(|o| pmf == o))
    }
}

impl fmt::Display for Cpmf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, pmf) in &self.conditional {
            writeln!(f, "{}:", key)?;
            for (k, p) in pmf.items() {
                writeln!(f, "\t{}: {}", k, p)?;
            }
        }
        Ok(())
    }
}

/// Side-by-side table of two PMFs; rows differing by more than the tolerance are marked with `*`.
pub fn pmf_diff(a: &Pmf, b: &Pmf) -> String {
    let mut keys: Vec<&Key> = a.keys().chain(b.keys()).collect();
    keys.sort();
    keys.dedup();
    let width = keys.iter().map(|k| k.to_string().len()).max().unwrap_or(1);

    let mut out = String::new();
    for key in keys {
        let (pa, pb) = (a.p(key), b.p(key));
        let mark = if (pa - pb).abs() > a.tolerance() { "*" } else { " " };
        let _ = writeln!(out, "{}| {:>width$} | {:>8.6} | {:>8.6} |", mark, key.to_string(), pa, pb);
    }
    out
}

/// Side-by-side table of two conditional PMFs, one block per conditioning key.
pub fn cpmf_diff(a: &Cpmf, b: &Cpmf) -> String {
    let mut cond_keys: Vec<&Key> = a.keys().chain(b.keys()).collect();
    cond_keys.sort();
    cond_keys.dedup();

    let mut out = String::new();
    for key in cond_keys {
        let _ = writeln!(out, "{}:", key);
        out.push_str(&pmf_diff(a.given(key), b.given(key)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::types::Value;
    use crate::variable::{JointVariable, Variable};

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "{} != {}", a, b);
    }

    #[test]
    fn test_pmf_from_variable() {
        let x = Variable::new(vec![0, 1, 1, 2, 1, 0, 1, 2]);
        let pmf = Pmf::from_observed(&x);
        assert_eq!(pmf.len(), 3);
        assert_eq!(pmf.total_count(), 8);
        assert_close(pmf.p(0 as Value), 0.25);
        assert_close(pmf.p(1 as Value), 0.5);
        assert_close(pmf.p(2 as Value), 0.25);
        assert_eq!(pmf.p(9 as Value), 0.0);
        assert_close(pmf.values().sum::<f64>(), 1.0);
    }

    #[test]
    fn test_joint_pmf_key_shapes() {
        let x = Variable::new(vec![0, 1, 1, 0]).with_id(0);
        let y = Variable::new(vec![1, 1, 0, 1]).with_id(1);
        let pmf = Pmf::from_observed(&JointVariable::new([x, y]).unwrap());
        let (a, b): (Value, Value) = (0, 1);
        assert_close(pmf.p((a, b)), 0.5);
        assert_close(pmf.p([a, b]), 0.5);
        assert_close(pmf.p((Key::scalar(a), b)), 0.5);
        assert_close(pmf.p(Key::from_values(vec![1, 0])), 0.25);
        assert_eq!(pmf.ids(), &[0, 1]);
    }

    #[test]
    fn test_empty_pmf_accumulates() {
        let mut pmf = Pmf::new();
        assert!(pmf.is_empty());
        pmf.count_instance(Key::scalar(3), 1);
        pmf.count_instance(Key::scalar(4), 3);
        pmf.normalize();
        assert_close(pmf.p(3 as Value), 0.25);
        assert_close(pmf.p(4 as Value), 0.75);
    }

    #[test]
    fn test_sum_over() {
        let x = Variable::new(vec![0, 1, 1, 0, 1]).with_id(4);
        let y = Variable::new(vec![1, 1, 0, 1, 0]).with_id(7);
        let z = Variable::new(vec![2, 2, 2, 3, 3]).with_id(9);
        let xyz = Pmf::from_observed(&JointVariable::new([x.clone(), y, z.clone()]).unwrap());
        let xz = xyz.sum_over(7).unwrap();
        let expected = Pmf::from_observed(&JointVariable::new([x, z]).unwrap());
        assert_eq!(xz, expected);
        assert_eq!(xz.ids(), &[4, 9]);
        assert!(matches!(xyz.sum_over(5), Err(Error::UnknownVariable(5))));
    }

    #[test]
    fn test_remove_zeros() {
        let mut pmf = Pmf::from_probabilities(
            vec![0],
            [(Key::scalar(0), 0.0), (Key::scalar(1), 0.4), (Key::scalar(2), 0.6)],
        );
        assert_eq!(pmf.len(), 3);
        pmf.remove_zeros();
        assert_eq!(pmf.len(), 2);
        assert_eq!(pmf.p(0 as Value), 0.0);
    }

    #[test]
    fn test_equality_tolerance() {
        let a = Pmf::from_probabilities(vec![], [(Key::scalar(0), 0.3), (Key::scalar(1), 0.7)]);
        let b = Pmf::from_probabilities(vec![], [(Key::scalar(0), 0.3 + 1e-12), (Key::scalar(1), 0.7)]);
        let c = Pmf::from_probabilities(vec![], [(Key::scalar(0), 0.31), (Key::scalar(1), 0.69)]);
        let d = Pmf::from_probabilities(vec![], [(Key::scalar(0), 0.3), (Key::scalar(2), 0.7)]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert!(pmf_diff(&a, &c).contains('*'));
        assert!(!pmf_diff(&a, &b).contains('*'));
    }

    #[test]
    fn test_cpmf_given() {
        let x = Variable::new(vec![0, 1, 1, 0, 1, 1]);
        let z = Variable::new(vec![5, 5, 5, 6, 6, 6]);
        let cpmf = Cpmf::from_observed(&x, &z).unwrap();
        assert_eq!(cpmf.len(), 2);
        assert_close(cpmf.given(5 as Value).p(0 as Value), 1.0 / 3.0);
        assert_close(cpmf.given(6 as Value).p(1 as Value), 2.0 / 3.0);
        assert!(cpmf.given(7 as Value).is_empty());
        assert_eq!(cpmf.given(7 as Value).p(0 as Value), 0.0);
    }

    #[test]
    fn test_cpmf_unequal_lengths() {
        let x = Variable::new(vec![0, 1, 1]);
        let z = Variable::new(vec![5, 5]);
        assert!(matches!(
            Cpmf::from_observed(&x, &z),
            Err(Error::UnequalInstanceCount { .. })
        ));
    }

    #[test]
    fn test_division_matches_counting() {
        let x = Variable::new(vec![0, 1, 1, 0, 1, 1, 0, 0]).with_id(0);
        let y = Variable::new(vec![1, 1, 0, 1, 0, 0, 1, 0]).with_id(1);
        let z = Variable::new(vec![2, 2, 2, 3, 3, 3, 2, 3]).with_id(2);

        let pr_xyz = Pmf::from_observed(&JointVariable::new([x.clone(), y.clone(), z.clone()]).unwrap());
        let pr_xz = Pmf::from_observed(&JointVariable::new([x.clone(), z.clone()]).unwrap());
        let pr_z = Pmf::from_observed(&JointVariable::new([z.clone()]).unwrap());

        let counted_xycz = Cpmf::from_observed(&JointVariable::new([x.clone(), y]).unwrap(), &z).unwrap();
        let counted_xcz = Cpmf::from_observed(&x, &z).unwrap();

        assert_eq!(make_cpmf_xycz(1, &pr_xyz, &pr_z), counted_xycz);
        assert_eq!(make_cpmf_xcz(1, &pr_xz, &pr_z), counted_xcz);
        assert_eq!(pr_xz.condition_on(&pr_z).unwrap(), counted_xcz);
        assert!(cpmf_diff(&counted_xcz, &counted_xcz).lines().count() > 0);
    }

    #[test]
    fn test_omega_wrappers() {
        let omega = Pmf::omega();
        assert_eq!(omega.p(OMEGA_VALUE), 1.0);
        let x = Pmf::from_observed(&Variable::new(vec![0, 1]));
        let cpmf = Cpmf::omega(x.clone());
        assert_eq!(cpmf.given(OMEGA_VALUE), &x);
        assert_eq!(x.condition_on(&omega).unwrap(), cpmf);
    }

    #[test]
    fn test_expected_value_and_accuracy() {
        let pmf = Pmf::from_observed(&Variable::new(vec![0, 0, 0, 1]));
        let entropy = -pmf.expected_value(|_, p| p.ln());
        assert_close(entropy, -(0.75f64 * 0.75f64.ln() + 0.25 * 0.25f64.ln()));
        assert_eq!(pmf.min_instance_count_for_accuracy(), Some(4));
        assert_eq!(Pmf::new().min_instance_count_for_accuracy(), None);
    }
}
