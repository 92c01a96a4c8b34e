use crate::error::{Error, Result};
use crate::pmf::{Cpmf, Pmf};
use crate::types::{VarId, VarSet};

use super::{clamp_dof, DofCalculator};

/// Counts only the X and Y values observed alongside each conditioning value.
///
/// The DoF is computed as soon as the conditional PMFs arrive, so the
/// calculator keeps no reference to them.
#[derive(Debug, Clone, Default)]
pub struct StructuralDof {
    dof: Option<u64>,
}

impl StructuralDof {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Σ_z (|{x : p(x|z) ≠ 0}| - 1)(|{y : p(y|z) ≠ 0}| - 1)` over `z` with `p(z) ≠ 0`.
    pub fn structural_dof(pr_xcz: &Cpmf, pr_ycz: &Cpmf, pr_z: &Pmf) -> u64 {
        let mut dof = 0u64;
        for (z, pz) in pr_z.items() {
            if pz == 0.0 {
                continue;
            }
            let x_val = pr_xcz.given(z).values().filter(|&p| p != 0.0).count() as u64;
            let y_val = pr_ycz.given(z).values().filter(|&p| p != 0.0).count() as u64;
            dof += x_val.saturating_sub(1) * y_val.saturating_sub(1);
        }
        clamp_dof(dof)
    }
}

impl DofCalculator for StructuralDof {
    fn name(&self) -> &'static str {
        "StructuralDof"
    }

    fn requires_cpmfs(&self) -> bool {
        true
    }

    fn reset(&mut self) {
        self.dof = None;
    }

    fn set_context_cpmfs(&mut self, _pr_xycz: &Cpmf, pr_xcz: &Cpmf, pr_ycz: &Cpmf, pr_z: &Pmf) {
        self.dof = Some(Self::structural_dof(pr_xcz, pr_ycz, pr_z));
    }

    fn calculate_dof(&mut self, x: VarId, y: VarId, z: &VarSet) -> Result<u64> {
        self.dof
            .ok_or_else(|| Error::DofCacheMiss(z.with(x).with(y).to_vec()))
    }
}
