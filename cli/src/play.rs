//! Interactive session loop: the engine runner on one side, keystrokes on the other.

use std::io::Write;

use anyhow::{Context, Result};
use engine::core::config::Settings;
use engine::core::format::{format_level, format_ms, format_percent};
use engine::core::storage::HistoryStore;
use engine::tasks::nback::{
    run_session, session_channel, LevelChange, NBackSession, SessionEnd, SessionSummary,
};
use futures_channel::mpsc::UnboundedReceiver;
use futures_util::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::input::{key_hint, Key, KeyReader, RawMode};
use crate::presenter::TerminalPresenter;

type StdinLines = Lines<BufReader<Stdin>>;

pub async fn play(
    mut settings: Settings,
    store: &mut dyn HistoryStore,
    keep_going: bool,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut rng = rand::thread_rng();

    loop {
        print_intro(&settings);
        let end = {
            let _raw = RawMode::enable().context("failed to switch the terminal to raw mode")?;
            let session =
                NBackSession::start(settings, TerminalPresenter, &mut *store, &mut rng)
                    .context("could not start session")?;
            let mut reader = KeyReader::spawn();
            drive(session, reader.keys()).await
        };
        let summary = match end {
            SessionEnd::Finished(summary) => summary,
            SessionEnd::Aborted { completed_trials } => {
                println!();
                println!("Session aborted after {completed_trials} trial(s). Nothing was saved.");
                return Ok(());
            }
        };

        print_summary(&summary);
        if !keep_going {
            return Ok(());
        }
        let prompt = format!("Continue at {}? [Y/n] ", format_level(summary.next_level));
        if !ask(&mut lines, &prompt, true).await? {
            return Ok(());
        }
        settings.session = settings.session.at_level(summary.next_level);
    }
}

async fn drive<H: HistoryStore>(
    session: NBackSession<TerminalPresenter, H>,
    keys: &mut UnboundedReceiver<Key>,
) -> SessionEnd {
    let (handle, inbox) = session_channel();
    let run = run_session(session, inbox);
    tokio::pin!(run);

    let mut keys_open = true;
    loop {
        tokio::select! {
            end = &mut run => return end,
            key = keys.next(), if keys_open => match key {
                Some(Key::Flag(modality)) => handle.flag(modality),
                Some(Key::Quit) => handle.abort(),
                // Reader gone; the session plays out without input.
                None => keys_open = false,
            },
        }
    }
}

fn print_intro(settings: &Settings) {
    let session = &settings.session;
    println!(
        "{} with {} over {} trials.",
        format_level(session.n_level),
        session.modalities,
        session.total_trials
    );
    println!(
        "Stimulus {}, response window {} per trial.",
        format_ms(settings.timing.stimulus_ms as f64),
        format_ms(settings.timing.trial_ms as f64)
    );
    let keys: Vec<String> = session
        .modalities
        .iter()
        .map(|m| format!("{}={}", key_hint(m), m.label()))
        .collect();
    println!("Keys: {}, q or Esc quits.", keys.join(" "));
}

fn print_summary(summary: &SessionSummary) {
    println!();
    println!("Session complete: {}", format_level(summary.config.n_level));
    for score in &summary.metrics.per_modality {
        println!(
            "  {:<10} {:>4}  correct {}  missed {}  false alarms {}",
            score.modality.label(),
            format_percent(score.accuracy),
            score.tally.correct,
            score.tally.missed,
            score.tally.false_positive
        );
    }
    println!(
        "  Overall    {:>4}",
        format_percent(summary.metrics.overall_accuracy)
    );

    let verdict = match summary.level_change {
        LevelChange::Up => "level up",
        LevelChange::Down => "level down",
        LevelChange::Same => "same level",
    };
    println!("Next: {} ({verdict})", format_level(summary.next_level));
    println!("{}", summary.quality.summary());
    if let Some(warning) = &summary.persist_warning {
        println!("{warning}");
    }
}

async fn ask(lines: &mut StdinLines, prompt: &str, default: bool) -> Result<bool> {
    print!("{prompt}");
    std::io::stdout().flush().context("failed to flush stdout")?;
    let Some(answer) = lines.next_line().await.context("failed to read stdin")? else {
        return Ok(false);
    };
    Ok(parse_answer(&answer, default))
}

/// Standalone yes/no prompt, defaulting to no.
pub async fn confirm(prompt: &str) -> Result<bool> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    ask(&mut lines, prompt, false).await
}

fn parse_answer(answer: &str, default: bool) -> bool {
    match answer.trim().to_ascii_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    }
}
