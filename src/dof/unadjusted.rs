use crate::dataset::DatasetMatrix;
use crate::error::{Error, Result};
use crate::types::{VarId, VarSet};

use super::{clamp_dof, DofCalculator};

/// `(|X| - 1)(|Y| - 1) Π |z|` over the full column domains.
#[derive(Debug, Clone)]
pub struct UnadjustedDof {
    domain_sizes: Vec<usize>,
}

impl UnadjustedDof {
    pub fn new(domain_sizes: Vec<usize>) -> Self {
        Self { domain_sizes }
    }

    pub fn for_dataset(dataset: &DatasetMatrix) -> Self {
        Self::new(dataset.values_per_column().iter().map(|v| v.len()).collect())
    }

    fn domain_size(&self, id: VarId) -> Result<u64> {
        self.domain_sizes
            .get(id)
            .map(|&n| n as u64)
            .ok_or(Error::UnknownVariable(id))
    }
}

impl DofCalculator for UnadjustedDof {
    fn name(&self) -> &'static str {
        "UnadjustedDof"
    }

    fn calculate_dof(&mut self, x: VarId, y: VarId, z: &VarSet) -> Result<u64> {
        let x_val = self.domain_size(x)?;
        let y_val = self.domain_size(y)?;
        let mut z_val = 1u64;
        for id in z {
            z_val = z_val.saturating_mul(self.domain_size(id)?);
        }
        let dof = x_val.saturating_sub(1) * y_val.saturating_sub(1);
        Ok(clamp_dof(dof.saturating_mul(z_val)))
    }
}
