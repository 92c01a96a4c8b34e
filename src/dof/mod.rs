//! Degrees-of-freedom calculators for the G-test.
//!
//! The chi-squared reference distribution of a G-test is parametrized by its
//! degrees of freedom. This module provides three interchangeable strategies:
//!
//! | Implementation | Needs | Cost per query | Persistent |
//! |----------------|-------|----------------|------------|
//! | [`UnadjustedDof`] | column domains | O(\|Z\|) | No |
//! | [`StructuralDof`] | `Pr(X\|Z)`, `Pr(Y\|Z)`, `Pr(Z)` | O(support) | No |
//! | [`CachedStructuralDof`] | joint PMFs | O(1) after first sight | Yes |
//!
//! # Choosing a calculator
//!
//! - **Textbook behaviour?** Use [`UnadjustedDof`]; it ignores which value
//!   combinations were actually observed
//! - **Sparse data?** Use [`StructuralDof`] (default), which only counts the
//!   values that co-occur with each observed conditioning value
//! - **Many queries over the same variable sets?** Use [`CachedStructuralDof`],
//!   which agrees with [`StructuralDof`] and memoizes whole pairwise tables
//!
//! No calculator ever reports a DoF of 0; a zero is clamped to 1.
//!
//! # Protocol
//!
//! A backend drives a calculator once per CI query:
//!
//! 1. [`reset`][DofCalculator::reset]
//! 2. [`set_context_pmfs`][DofCalculator::set_context_pmfs] (if
//!    [`requires_pmfs`][DofCalculator::requires_pmfs]) and
//!    [`set_context_variables`][DofCalculator::set_context_variables]
//! 3. [`set_context_cpmfs`][DofCalculator::set_context_cpmfs] (if
//!    [`requires_cpmfs`][DofCalculator::requires_cpmfs])
//! 4. [`calculate_dof`][DofCalculator::calculate_dof]
//!
//! and calls [`end`][DofCalculator::end] once when the backend shuts down.

mod cached;
mod structural;
mod unadjusted;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use cached::CachedStructuralDof;
pub use structural::StructuralDof;
pub use unadjusted::UnadjustedDof;

use crate::dataset::DatasetMatrix;
use crate::error::Result;
use crate::pmf::{Cpmf, Pmf};
use crate::types::{VarId, VarSet};

pub trait DofCalculator {
    fn name(&self) -> &'static str;

    /// Whether the calculator must be handed the joint PMFs of the query.
    fn requires_pmfs(&self) -> bool {
        false
    }

    /// Whether the calculator must be handed the conditional PMFs of the query.
    fn requires_cpmfs(&self) -> bool {
        false
    }

    /// Forgets the context of the previous query.
    fn reset(&mut self) {}

    fn set_context_variables(&mut self, _x: VarId, _y: VarId, _z: &VarSet) {}

    /// Receives `Pr(X,Y,Z)`, `Pr(X,Z)`, `Pr(Y,Z)` and `Pr(Z)`; any of them may be absent.
    fn set_context_pmfs(
        &mut self,
        _pr_xyz: Option<&Pmf>,
        _pr_xz: Option<&Pmf>,
        _pr_yz: Option<&Pmf>,
        _pr_z: Option<&Pmf>,
    ) {
    }

    fn set_context_cpmfs(&mut self, _pr_xycz: &Cpmf, _pr_xcz: &Cpmf, _pr_ycz: &Cpmf, _pr_z: &Pmf) {}

    fn calculate_dof(&mut self, x: VarId, y: VarId, z: &VarSet) -> Result<u64>;

    /// Whether answering `(x, y, z)` still requires the joint PMF `Pr(X,Y,Z)`.
    ///
    /// Backends which can skip computing joint PMFs (the entropy cache) consult
    /// this before deciding to skip.
    fn needs_joint_pmf(&self, _x: VarId, _y: VarId, _z: &VarSet) -> bool {
        false
    }

    /// Releases spare capacity of any accumulated tables.
    fn shrink_to_fit(&mut self) {}

    /// Persists whatever the calculator accumulated.
    fn end(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Selects a [`DofCalculator`] implementation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
pub enum DofCalculatorKind {
    UnadjustedDof,
    #[default]
    StructuralDof,
    CachedStructuralDof,
}

impl DofCalculatorKind {
    pub fn name(self) -> &'static str {
        match self {
            DofCalculatorKind::UnadjustedDof => "UnadjustedDof",
            DofCalculatorKind::StructuralDof => "StructuralDof",
            DofCalculatorKind::CachedStructuralDof => "CachedStructuralDof",
        }
    }

    pub fn requires_cpmfs(self) -> bool {
        matches!(self, DofCalculatorKind::StructuralDof)
    }

    /// Builds the calculator for `dataset`.
    ///
    /// The cache paths only matter to [`CachedStructuralDof`].
    pub fn build(
        self,
        dataset: &DatasetMatrix,
        cache_load: Option<&Path>,
        cache_save: Option<&Path>,
    ) -> Result<Box<dyn DofCalculator>> {
        let calculator: Box<dyn DofCalculator> = match self {
            DofCalculatorKind::UnadjustedDof => Box::new(UnadjustedDof::for_dataset(dataset)),
            DofCalculatorKind::StructuralDof => Box::new(StructuralDof::new()),
            DofCalculatorKind::CachedStructuralDof => {
                let mut calculator = match cache_load {
                    Some(path) => CachedStructuralDof::load(path)?,
                    None => CachedStructuralDof::new(),
                };
                if let Some(path) = cache_save {
                    calculator.set_save_path(path);
                }
                Box::new(calculator)
            }
        };
        Ok(calculator)
    }
}

/// A DoF is never reported as zero.
pub(crate) fn clamp_dof(dof: u64) -> u64 {
    dof.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn test_kind_names_and_flags() {
        assert_eq!(DofCalculatorKind::default(), DofCalculatorKind::StructuralDof);
        assert!(DofCalculatorKind::StructuralDof.requires_cpmfs());
        assert!(!DofCalculatorKind::CachedStructuralDof.requires_cpmfs());
        assert!(!DofCalculatorKind::UnadjustedDof.requires_cpmfs());
        let dm = DatasetMatrix::from_columns("d", vec![vec![0, 1], vec![1, 1]]).unwrap();
        for kind in [
            DofCalculatorKind::UnadjustedDof,
            DofCalculatorKind::StructuralDof,
            DofCalculatorKind::CachedStructuralDof,
        ] {
            let calculator = kind.build(&dm, None, None).unwrap();
            assert_eq!(calculator.name(), kind.name());
            assert_eq!(calculator.requires_cpmfs(), kind.requires_cpmfs());
        }
    }

    #[test]
    fn test_kind_from_json() {
        let kind: DofCalculatorKind = serde_json::from_str("\"CachedStructuralDof\"").unwrap();
        assert_eq!(kind, DofCalculatorKind::CachedStructuralDof);
    }
}
