mod common;

use std::time::Duration;

use common::{settings, stream_with_matches, Recorder, TRIAL_MS};
use engine::core::storage::MemoryStore;
use engine::tasks::nback::{
    run_session, session_channel, Modality, ModalitySet, NBackSession, Sequences, SessionEnd,
};
use tokio::time::{sleep_until, Instant};

const MATCHES: [usize; 4] = [2, 5, 9, 14];

fn session() -> NBackSession<Recorder, MemoryStore> {
    let sequences = Sequences::from_streams(
        2,
        [(Modality::Position, stream_with_matches(2, 20, &MATCHES))],
    );
    NBackSession::with_sequences(
        settings(2, ModalitySet::of(&[Modality::Position]), 20),
        sequences,
        11,
        Recorder::default(),
        MemoryStore::new(),
    )
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn runs_to_completion_on_the_timer() {
    let (handle, inbox) = session_channel();
    let start = Instant::now();
    let end = run_session(session(), inbox).await;

    assert_eq!(start.elapsed(), Duration::from_millis(20 * TRIAL_MS));
    let summary = match end {
        SessionEnd::Finished(summary) => summary,
        other => panic!("expected a finished session, got {other:?}"),
    };
    assert_eq!(summary.trials.len(), 20);
    assert_eq!(summary.metrics.per_modality[0].tally.missed, 4);
    assert!(summary.quality.is_clean());
    assert!(handle.is_closed());
}

#[tokio::test(start_paused = true)]
async fn flags_sent_mid_trial_are_scored() {
    let (handle, inbox) = session_channel();
    let start = Instant::now();

    let flagger = async {
        for trial in MATCHES {
            let at = (trial as u64) * TRIAL_MS + 100;
            sleep_until(start + Duration::from_millis(at)).await;
            handle.flag(Modality::Position);
            handle.flag(Modality::Position);
        }
    };
    let (end, ()) = tokio::join!(run_session(session(), inbox), flagger);

    let summary = match end {
        SessionEnd::Finished(summary) => summary,
        other => panic!("expected a finished session, got {other:?}"),
    };
    let score = summary.metrics.score(Modality::Position).unwrap();
    assert_eq!(score.tally.correct, 4);
    assert_eq!(score.tally.missed, 0);
    assert_eq!(score.tally.false_positive, 0);
    assert_eq!(summary.next_level, 3);
}

#[tokio::test(start_paused = true)]
async fn abort_ends_the_run_early() {
    let (handle, inbox) = session_channel();
    let start = Instant::now();

    let aborter = async {
        sleep_until(start + Duration::from_millis(2 * TRIAL_MS + 1000)).await;
        handle.abort();
    };
    let (end, ()) = tokio::join!(run_session(session(), inbox), aborter);

    assert_eq!(end, SessionEnd::Aborted { completed_trials: 2 });
    assert_eq!(start.elapsed(), Duration::from_millis(2 * TRIAL_MS + 1000));
}

#[tokio::test(start_paused = true)]
async fn dropping_every_handle_aborts() {
    let (handle, inbox) = session_channel();
    drop(handle);
    let end = run_session(session(), inbox).await;
    assert_eq!(end, SessionEnd::Aborted { completed_trials: 0 });
}
