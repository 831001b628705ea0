use proptest::prelude::*;
use scc_core::CouplingType;
use scc_rank::GaussRankMap;

fn fit(values: &[f64]) -> GaussRankMap {
    GaussRankMap::fit_values(0, values.iter().map(|v| (CouplingType::J2HC, *v))).unwrap()
}

proptest! {
    #[test]
    fn inverse_recovers_every_fitted_value(values in prop::collection::vec(-250.0f64..250.0, 1..200)) {
        let map = fit(&values);
        for v in &values {
            let score = map.forward(*v, CouplingType::J2HC).unwrap();
            prop_assert_eq!(map.inverse(score, CouplingType::J2HC).unwrap(), *v);
        }
    }

    #[test]
    fn forward_is_monotone(
        values in prop::collection::vec(-50.0f64..50.0, 1..100),
        mut probes in prop::collection::vec(-80.0f64..80.0, 2..60),
    ) {
        let map = fit(&values);
        probes.sort_by(f64::total_cmp);
        let scores: Vec<f64> = probes
            .iter()
            .map(|p| map.forward(*p, CouplingType::J2HC).unwrap())
            .collect();
        for pair in scores.windows(2) {
            prop_assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn inverse_is_monotone_and_bounded(
        values in prop::collection::vec(-50.0f64..50.0, 1..100),
        mut probes in prop::collection::vec(-6.0f64..6.0, 2..60),
    ) {
        let map = fit(&values);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        probes.sort_by(f64::total_cmp);
        let mut prev = f64::NEG_INFINITY;
        for p in probes {
            let raw = map.inverse(p, CouplingType::J2HC).unwrap();
            prop_assert!(raw >= prev);
            prop_assert!(raw >= min && raw <= max);
            prev = raw;
        }
    }
}
