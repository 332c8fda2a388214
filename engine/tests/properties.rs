mod common;

use common::{drive, settings};
use engine::core::storage::MemoryStore;
use engine::tasks::nback::{
    Modality, ModalitySet, NBackSession, SessionStatus, SilentPresenter, TrialOutcome,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn modality_set() -> impl Strategy<Value = ModalitySet> {
    (1u8..32).prop_map(|bits| {
        Modality::ALL
            .into_iter()
            .enumerate()
            .filter(|(i, _)| bits & (1 << i) != 0)
            .map(|(_, m)| m)
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn sessions_respect_scoring_invariants(
        n_level in 1u8..=8,
        modalities in modality_set(),
        total in 1usize..40,
        seed in any::<u64>(),
        presses in proptest::collection::vec(0u8..32, 40),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut session = NBackSession::start(
            settings(n_level, modalities, total),
            SilentPresenter,
            MemoryStore::new(),
            &mut rng,
        )
        .unwrap();

        drive(&mut session, |trial| {
            let bits = presses[trial];
            Modality::ALL
                .into_iter()
                .enumerate()
                .filter(|(i, _)| bits & (1 << i) != 0)
                .map(|(_, m)| m)
                .collect()
        });
        prop_assert_eq!(session.status(), SessionStatus::Finished);

        let n = usize::from(n_level);
        for modality in modalities.iter() {
            for index in 0..total.min(n) {
                prop_assert!(!session.sequences().is_match(modality, index));
            }
            let tally = session.tally(modality);
            prop_assert!(tally.scored() as usize <= total);
            prop_assert!(tally.correct + tally.missed <= total.saturating_sub(n) as u32);
        }

        for trial in session.trials() {
            for (modality, outcome) in trial.evaluation.iter() {
                prop_assert!(modalities.contains(modality));
                if trial.index < n {
                    prop_assert!(matches!(
                        outcome,
                        TrialOutcome::FalsePositive | TrialOutcome::Unscored
                    ));
                }
            }
        }

        let summary = session.summary().unwrap();
        prop_assert!(summary.next_level >= 1 && summary.next_level <= 8);
        prop_assert!((0.0..=100.0).contains(&summary.metrics.overall_accuracy));
        prop_assert_eq!(session.store().records().len(), 1);
    }
}
