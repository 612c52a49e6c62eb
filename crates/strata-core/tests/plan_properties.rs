use std::collections::BTreeMap;

use proptest::prelude::*;
use strata_core::{plan_from_counts, SamplePolicy, StrataError, StratumLabel};

fn counts_strategy() -> impl Strategy<Value = BTreeMap<StratumLabel, usize>> {
    prop::collection::btree_map(2000i32..2030, 1usize..5000, 1..8).prop_map(|map| {
        map.into_iter()
            .map(|(year, count)| (StratumLabel::from_year(year), count))
            .collect()
    })
}

proptest! {
    #[test]
    fn plan_strata_are_exactly_the_large_ones(counts in counts_strategy()) {
        let policy = SamplePolicy::default();
        let expected: Vec<&StratumLabel> = counts
            .iter()
            .filter(|(_, count)| **count >= 100)
            .map(|(label, _)| label)
            .collect();
        match plan_from_counts(counts.clone(), &policy) {
            Ok(plan) => {
                let retained: Vec<&StratumLabel> = plan.targets.keys().collect();
                prop_assert_eq!(retained, expected);
                for (label, target) in &plan.targets {
                    let population = counts[label];
                    prop_assert!(*target >= 1);
                    prop_assert_eq!(*target, (population * 10 + 99) / 100);
                }
            }
            Err(StrataError::EmptyPopulation(_)) => prop_assert!(expected.is_empty()),
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    #[test]
    fn plan_computation_is_idempotent(counts in counts_strategy()) {
        let policy = SamplePolicy::default();
        let first = plan_from_counts(counts.clone(), &policy);
        let second = plan_from_counts(counts, &policy);
        prop_assert_eq!(first, second);
    }
}
