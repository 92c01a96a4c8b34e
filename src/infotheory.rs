//! Mutual information and conditional mutual information over PMFs.

use crate::error::Result;
use crate::pmf::{Cpmf, Pmf};
use crate::variable::{JointVariable, Observed, Variable};

/// Base of the logarithm used by the information measures.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub enum LogBase {
    E,
    #[default]
    Two,
    Ten,
    Custom(f64),
}

impl LogBase {
    pub fn log(self, x: f64) -> f64 {
        match self {
            LogBase::E => x.ln(),
            LogBase::Two => x.log2(),
            LogBase::Ten => x.log10(),
            LogBase::Custom(base) => x.ln() / base.ln(),
        }
    }
}

/// `I(X;Y) = Σ p(x,y) log(p(x,y) / (p(x) p(y)))`, skipping terms with a zero factor.
pub fn mutual_information(pr_xy: &Pmf, pr_x: &Pmf, pr_y: &Pmf, base: LogBase) -> f64 {
    let mut mi = 0.0;
    for (x, px) in pr_x.items() {
        for (y, py) in pr_y.items() {
            let pxy = pr_xy.p((x, y));
            if pxy == 0.0 || px == 0.0 || py == 0.0 {
                continue;
            }
            mi += pxy * base.log(pxy / (px * py));
        }
    }
    mi
}

/// `I(X;Y|Z) = Σ_z p(z) Σ p(x,y|z) log(p(x,y|z) / (p(x|z) p(y|z)))`.
pub fn conditional_mutual_information(
    pr_xycz: &Cpmf,
    pr_xcz: &Cpmf,
    pr_ycz: &Cpmf,
    pr_z: &Pmf,
    base: LogBase,
) -> f64 {
    let mut cmi = 0.0;
    for (z, pz) in pr_z.items() {
        let pr_xy = pr_xycz.given(z);
        let pr_y = pr_ycz.given(z);
        for (x, pxcz) in pr_xcz.given(z).items() {
            for (y, pycz) in pr_y.items() {
                let pxycz = pr_xy.p((x, y));
                if pxycz == 0.0 || pxcz == 0.0 || pycz == 0.0 {
                    continue;
                }
                cmi += pz * pxycz * base.log(pxycz / (pxcz * pycz));
            }
        }
    }
    cmi
}

/// Shannon entropy `-Σ p log p` of a PMF.
pub fn entropy(pmf: &Pmf, base: LogBase) -> f64 {
    -pmf.items()
        .filter(|&(_, p)| p > 0.0)
        .map(|(_, p)| p * base.log(p))
        .sum::<f64>()
}

/// `(Pr(X,Y), Pr(X), Pr(Y))`.
pub fn calculate_pmf_for_mi<'a>(x: &Variable<'a>, y: &Variable<'a>) -> Result<(Pmf, Pmf, Pmf)> {
    let xy = JointVariable::new([x.clone(), y.clone()])?;
    Ok((Pmf::from_observed(&xy), Pmf::from_observed(x), Pmf::from_observed(y)))
}

/// `(Pr(X,Y|Z), Pr(X|Z), Pr(Y|Z), Pr(Z))`, counted directly.
pub fn calculate_pmf_for_cmi<'a>(
    x: &Variable<'a>,
    y: &Variable<'a>,
    z: &impl Observed,
) -> Result<(Cpmf, Cpmf, Cpmf, Pmf)> {
    let xy = JointVariable::new([x.clone(), y.clone()])?;
    Ok((
        Cpmf::from_observed(&xy, z)?,
        Cpmf::from_observed(x, z)?,
        Cpmf::from_observed(y, z)?,
        Pmf::from_observed(z),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn mi(x: Vec<u32>, y: Vec<u32>) -> f64 {
        let (x, y) = (Variable::new(x), Variable::new(y));
        let (pr_xy, pr_x, pr_y) = calculate_pmf_for_mi(&x, &y).unwrap();
        mutual_information(&pr_xy, &pr_x, &pr_y, LogBase::Two)
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_mutual_information_known_values() {
        assert_close(mi(vec![1, 0, 0, 0, 0, 0, 0, 0], vec![1, 0, 0, 0, 0, 0, 0, 0]), 0.5435644431);
        assert_close(mi(vec![1, 0, 0, 0, 1, 0, 0, 0], vec![1, 0, 0, 0, 0, 0, 0, 0]), 0.2935644431);
        assert_close(mi(vec![1, 0, 0, 0, 1, 1, 0, 0], vec![1, 0, 1, 1, 0, 0, 0, 0]), 0.0032289436);
        assert_close(mi(vec![1, 0, 0, 0, 1, 1, 0, 0], vec![1, 0, 1, 1, 1, 1, 0, 0]), 0.3475898813);
        assert_close(mi(vec![0, 1, 0, 0, 1, 1, 0, 0], vec![1, 0, 1, 1, 0, 0, 1, 0]), 0.5487949406);
        assert_close(mi(vec![0, 1, 0, 0, 1, 1, 0, 1], vec![1, 0, 1, 1, 0, 0, 1, 0]), 1.0);
    }

    #[test]
    fn test_mutual_information_of_constants_is_zero() {
        assert_close(mi(vec![0; 8], vec![1; 8]), 0.0);
        assert_close(mi(vec![0; 8], vec![0, 1, 0, 1, 0, 1, 0, 1]), 0.0);
    }

    #[test]
    fn test_cmi_given_omega_equals_mi() {
        let x = Variable::new(vec![0, 1, 0, 0, 1, 1, 0, 0]);
        let y = Variable::new(vec![1, 0, 1, 1, 0, 0, 1, 0]);
        let omega = Variable::omega(8);
        let (xycz, xcz, ycz, z) = calculate_pmf_for_cmi(&x, &y, &omega).unwrap();
        let cmi = conditional_mutual_information(&xycz, &xcz, &ycz, &z, LogBase::Two);
        assert_close(cmi, 0.5487949406);
    }

    #[test]
    fn test_cmi_vanishes_when_z_explains_both() {
        // X and Y are both copies of Z, so given Z nothing is left.
        let z = Variable::new(vec![0, 1, 2, 0, 1, 2, 0, 1]);
        let x = Variable::new(z.iter().collect());
        let y = Variable::new(z.iter().collect());
        let (xycz, xcz, ycz, pz) = calculate_pmf_for_cmi(&x, &y, &z).unwrap();
        assert_close(conditional_mutual_information(&xycz, &xcz, &ycz, &pz, LogBase::E), 0.0);
    }

    #[test]
    fn test_pmfs_for_dataset_columns() {
        let dataset = crate::dataset::DatasetMatrix::from_columns(
            "d",
            vec![vec![0, 1, 0, 1], vec![0, 1, 0, 1], vec![0, 0, 1, 1]],
        )
        .unwrap();
        let x = dataset.get_variable(0).unwrap();
        let y = dataset.get_variable(1).unwrap();
        let z = dataset.get_variable(2).unwrap();

        let (pr_xy, pr_x, pr_y) = calculate_pmf_for_mi(&x, &y).unwrap();
        assert_close(mutual_information(&pr_xy, &pr_x, &pr_y, LogBase::Two), 1.0);

        let (xycz, xcz, ycz, pz) = calculate_pmf_for_cmi(&x, &y, &z).unwrap();
        assert_close(conditional_mutual_information(&xycz, &xcz, &ycz, &pz, LogBase::Two), 1.0);
    }

    #[test]
    fn test_entropy_and_bases() {
        let pmf = Pmf::from_observed(&Variable::new(vec![0, 1, 2, 3]));
        assert_close(entropy(&pmf, LogBase::Two), 2.0);
        assert_close(entropy(&pmf, LogBase::E), 4f64.ln());
        assert_close(entropy(&pmf, LogBase::Custom(4.0)), 1.0);
        assert_close(entropy(&pmf, LogBase::Ten), 4f64.log10());
    }
}
