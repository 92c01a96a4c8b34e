mod common;

use std::rc::Rc;

use mbtk_rs::ci::{build_ci_test, CiTestKind};
use mbtk_rs::dataset::DatasetMatrix;
use mbtk_rs::dof::DofCalculatorKind;
use mbtk_rs::ipcmb::AlgorithmIpcmb;
use mbtk_rs::params::Parameters;
use mbtk_rs::types::VarSet;
use test_log::test;

#[test]
fn test_cached_structural_matches_structural() {
    let dataset = common::sample_dataset(&common::pcmb_example(), 3, 800, 5);
    for target in [0, 1, 4] {
        let run = |dof: DofCalculatorKind| {
            let params = Parameters::new(target, CiTestKind::GTestUnoptimized)
                .with_significance(0.9)
                .with_dof_calculator(dof);
            let mut ipcmb = AlgorithmIpcmb::new(&params, Some(Rc::clone(&dataset))).unwrap();
            let mb = ipcmb.discover_mb().unwrap();
            (mb, ipcmb.ci_test_results().to_vec())
        };
        let (mb_structural, structural) = run(DofCalculatorKind::StructuralDof);
        let (mb_cached, cached) = run(DofCalculatorKind::CachedStructuralDof);
        assert_eq!(mb_structural, mb_cached);
        assert_eq!(structural.len(), cached.len());
        for (a, b) in structural.iter().zip(&cached) {
            assert_eq!(a.dof(), b.dof(), "{}", a);
            assert_eq!(a, b);
        }
    }
}

#[test]
fn test_structural_never_exceeds_unadjusted() {
    let dataset = common::sample_dataset(&common::diamond(), 3, 300, 2);
    let queries = [(0, 1, vec![]), (1, 3, vec![2]), (2, 3, vec![1]), (0, 5, vec![2, 3]), (4, 5, vec![0, 1, 2])];
    let results = |dof: DofCalculatorKind| {
        let params = Parameters::new(0, CiTestKind::GTestUnoptimized)
            .with_dof_calculator(dof)
            .with_sufficiency_criterion(|_, _| true);
        let mut test = build_ci_test(&params, Some(Rc::clone(&dataset))).unwrap();
        for (x, y, z) in &queries {
            test.conditionally_independent(*x, *y, &VarSet::from(z.clone())).unwrap();
        }
        test.results().iter().map(|r| r.dof().unwrap()).collect::<Vec<_>>()
    };
    let structural = results(DofCalculatorKind::StructuralDof);
    let unadjusted = results(DofCalculatorKind::UnadjustedDof);
    for (s, u) in structural.iter().zip(&unadjusted) {
        assert!(s <= u, "{} > {}", s, u);
    }
}

#[test]
fn test_dof_floor_on_constant_columns() {
    let n = 200;
    let constant = vec![0; n];
    let varying: Vec<u32> = (0..n).map(|i| (i % 2) as u32).collect();
    let dataset = Rc::new(DatasetMatrix::from_columns("flat", vec![constant.clone(), varying, constant]).unwrap());

    for (kind, dof) in [
        (CiTestKind::GTestUnoptimized, DofCalculatorKind::UnadjustedDof),
        (CiTestKind::GTestUnoptimized, DofCalculatorKind::StructuralDof),
        (CiTestKind::GTestCountIndex, DofCalculatorKind::StructuralDof),
        (CiTestKind::GTestEntropyCache, DofCalculatorKind::CachedStructuralDof),
    ] {
        let params = Parameters::new(0, kind).with_significance(0.95).with_dof_calculator(dof);
        let mut test = build_ci_test(&params, Some(Rc::clone(&dataset))).unwrap();
        test.conditionally_independent(0, 1, &VarSet::new()).unwrap();
        test.conditionally_independent(0, 2, &VarSet::from([1])).unwrap();
        for result in test.results() {
            assert_eq!(result.dof(), Some(1), "{} with {:?}", test.name(), dof);
            // A constant variable carries no information about anything.
            assert_eq!(result.independent, Some(true));
        }
    }
}
