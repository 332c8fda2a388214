//! Stimulus stream generation with a tunable n-back repeat rate.

use rand::Rng;

use super::modality::{Modality, ModalitySet, PerModality, Stimulus, Symbol};

/// One stream of symbols per enabled modality; disabled modalities stay empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequences {
    n_level: usize,
    streams: PerModality<Vec<Symbol>>,
}

impl Sequences {
    pub fn generate<R: Rng + ?Sized>(
        n_level: usize,
        total_trials: usize,
        modalities: ModalitySet,
        match_probability: f64,
        rng: &mut R,
    ) -> Self {
        let streams = PerModality::from_fn(|modality| {
            if modalities.contains(modality) {
                generate_stream(
                    n_level,
                    total_trials,
                    modality.alphabet().len(),
                    match_probability,
                    rng,
                )
            } else {
                Vec::new()
            }
        });

        Self { n_level, streams }
    }

    /// Build from explicit streams, e.g. to replay a known session.
    pub fn from_streams<I>(n_level: usize, streams: I) -> Self
    where
        I: IntoIterator<Item = (Modality, Vec<Symbol>)>,
    {
        let mut slots: PerModality<Vec<Symbol>> = PerModality::default();
        for (modality, stream) in streams {
            slots[modality] = stream;
        }
        Self {
            n_level,
            streams: slots,
        }
    }

    pub fn n_level(&self) -> usize {
        self.n_level
    }

    pub fn stream(&self, modality: Modality) -> &[Symbol] {
        &self.streams[modality]
    }

    pub fn value(&self, modality: Modality, index: usize) -> Option<Symbol> {
        self.streams[modality].get(index).copied()
    }

    pub fn stimulus(&self, modality: Modality, index: usize) -> Option<Stimulus> {
        self.value(modality, index)
            .map(|symbol| Stimulus { modality, symbol })
    }

    /// Ground truth: the value at `index` equals the one `n_level` steps back.
    /// Always false below `n_level`, whether or not the values coincide.
    pub fn is_match(&self, modality: Modality, index: usize) -> bool {
        if index < self.n_level {
            return false;
        }
        match (
            self.value(modality, index),
            self.value(modality, index - self.n_level),
        ) {
            (Some(current), Some(earlier)) => current == earlier,
            _ => false,
        }
    }
}

/// A forced repeat with `match_probability`, otherwise a fresh uniform draw.
/// The fresh draw may still land on the n-back value. A lag of 0 has no
/// earlier value to repeat, so every draw is fresh.
fn generate_stream<R: Rng + ?Sized>(
    n_level: usize,
    total_trials: usize,
    alphabet_len: usize,
    match_probability: f64,
    rng: &mut R,
) -> Vec<Symbol> {
    let repeat_probability = if match_probability.is_nan() {
        0.0
    } else {
        match_probability.clamp(0.0, 1.0)
    };
    let mut stream = Vec::with_capacity(total_trials);
    for index in 0..total_trials {
        let symbol = if n_level > 0 && index >= n_level && rng.gen_bool(repeat_probability) {
            stream[index - n_level]
        } else {
            Symbol::new(rng.gen_range(0..alphabet_len) as u8)
        };
        stream.push(symbol);
    }
    stream
}
