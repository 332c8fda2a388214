use std::io::{self, Write};

use engine::tasks::nback::{Modality, Presenter, Stimulus};

use crate::input::key_hint;

/// Prints stimuli as plain lines on stdout. The terminal is in raw mode while
/// a session runs, so every line ends with an explicit carriage return.
#[derive(Debug, Default)]
pub struct TerminalPresenter;

fn emit(text: &str) {
    let mut out = io::stdout().lock();
    let _ = write!(out, "{}\r\n", text.replace('\n', "\r\n"));
    let _ = out.flush();
}

impl TerminalPresenter {
    fn render_grid(position: usize) -> String {
        let mut rows = Vec::with_capacity(3);
        for row in 0..3 {
            let cells: String = (0..3)
                .map(|col| if row * 3 + col == position { "[#]" } else { "[ ]" })
                .collect();
            rows.push(format!("    {cells}"));
        }
        rows.join("\n")
    }
}

impl Presenter for TerminalPresenter {
    fn show_stimulus(&mut self, stimulus: Stimulus) {
        // Spoken channels are printed by `speak`.
        if stimulus.modality.is_spoken() {
            return;
        }
        match stimulus.modality {
            Modality::Position => emit(&Self::render_grid(stimulus.symbol.index())),
            _ => emit(&format!("    {:<8} {}", stimulus.modality.label(), stimulus.label())),
        }
    }

    fn hide_stimulus(&mut self) {}

    fn speak(&mut self, text: &str) {
        emit(&format!("    (voice) {text}"));
    }

    fn trial_started(&mut self, trial_index: usize, total_trials: usize) {
        emit("");
        emit(&format!("Trial {}/{}", trial_index + 1, total_trials));
    }

    fn show_feedback(&mut self, modality: Modality, is_match: bool) {
        let verdict = if is_match { "match" } else { "no match" };
        emit(&format!("    {} [{}]: {verdict}", modality.label(), key_hint(modality)));
    }
}
