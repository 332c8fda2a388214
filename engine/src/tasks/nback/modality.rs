//! Stimulus channels, their alphabets, and small per-channel containers.

use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;

const POSITIONS: [&str; 9] = ["1", "2", "3", "4", "5", "6", "7", "8", "9"];
const LETTERS: [&str; 8] = ["C", "H", "K", "L", "Q", "R", "S", "T"];
const COLORS: [&str; 8] = [
    "red", "blue", "green", "yellow", "purple", "orange", "pink", "cyan",
];
const SHAPES: [&str; 8] = [
    "circle", "square", "triangle", "diamond", "star", "hexagon", "pentagon", "heart",
];
const DIGITS: [&str; 8] = ["1", "2", "3", "4", "5", "6", "7", "8"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Position,
    Audio,
    Color,
    Shape,
    Number,
}

impl Modality {
    pub const ALL: [Modality; 5] = [
        Modality::Position,
        Modality::Audio,
        Modality::Color,
        Modality::Shape,
        Modality::Number,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn alphabet(self) -> &'static [&'static str] {
        match self {
            Modality::Position => &POSITIONS,
            Modality::Audio => &LETTERS,
            Modality::Color => &COLORS,
            Modality::Shape => &SHAPES,
            Modality::Number => &DIGITS,
        }
    }

    /// Identifier used in config files and the persisted history.
    pub fn as_str(self) -> &'static str {
        match self {
            Modality::Position => "position",
            Modality::Audio => "audio",
            Modality::Color => "color",
            Modality::Shape => "shape",
            Modality::Number => "number",
        }
    }

    /// Human label for menus and result screens.
    pub fn label(self) -> &'static str {
        match self {
            Modality::Position => "Position",
            Modality::Audio => "Letters",
            Modality::Color => "Color",
            Modality::Shape => "Shape",
            Modality::Number => "Numbers",
        }
    }

    /// Channels delivered through `speak` rather than on screen.
    pub fn is_spoken(self) -> bool {
        matches!(self, Modality::Audio | Modality::Number)
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modality {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "position" | "pos" | "grid" => Ok(Modality::Position),
            "audio" | "letter" | "letters" => Ok(Modality::Audio),
            "color" | "colour" => Ok(Modality::Color),
            "shape" | "shapes" => Ok(Modality::Shape),
            "number" | "numbers" | "digit" | "digits" => Ok(Modality::Number),
            other => Err(ConfigError::UnknownModality(other.to_string())),
        }
    }
}

/// Index into a modality's alphabet. Equality of symbols is what defines a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(u8);

impl Symbol {
    pub fn new(index: u8) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn label(self, modality: Modality) -> &'static str {
        modality.alphabet().get(self.index()).copied().unwrap_or("?")
    }
}

/// A single presented value on one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stimulus {
    pub modality: Modality,
    pub symbol: Symbol,
}

impl Stimulus {
    pub fn label(&self) -> &'static str {
        self.symbol.label(self.modality)
    }

    /// Text handed to `speak`: the lowercased symbol.
    pub fn utterance(&self) -> String {
        self.label().to_lowercase()
    }
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Modality>", into = "Vec<Modality>")]
pub struct ModalitySet(u8);

impl ModalitySet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Modality::ALL.into_iter().collect()
    }

    pub fn of(modalities: &[Modality]) -> Self {
        modalities.iter().copied().collect()
    }

    fn bit(modality: Modality) -> u8 {
        1 << modality.index()
    }

    pub fn contains(self, modality: Modality) -> bool {
        self.0 & Self::bit(modality) != 0
    }

    pub fn insert(&mut self, modality: Modality) {
        self.0 |= Self::bit(modality);
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Members in canonical order (position, audio, color, shape, number).
    pub fn iter(self) -> impl Iterator<Item = Modality> {
        Modality::ALL
            .into_iter()
            .filter(move |modality| self.contains(*modality))
    }
}

impl FromIterator<Modality> for ModalitySet {
    fn from_iter<I: IntoIterator<Item = Modality>>(iter: I) -> Self {
        let mut set = Self::empty();
        for modality in iter {
            set.insert(modality);
        }
        set
    }
}

impl From<Vec<Modality>> for ModalitySet {
    fn from(list: Vec<Modality>) -> Self {
        list.into_iter().collect()
    }
}

impl From<ModalitySet> for Vec<Modality> {
    fn from(set: ModalitySet) -> Self {
        set.iter().collect()
    }
}

impl FromStr for ModalitySet {
    type Err = ConfigError;

    /// Comma separated list, e.g. `position,audio`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        raw.split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse::<Modality>)
            .collect()
    }
}

impl fmt::Debug for ModalitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for ModalitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Modality::as_str).collect();
        f.write_str(&names.join(", "))
    }
}

/// Fixed slot per modality, indexed by `Modality`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerModality<T>([T; 5]);

impl<T> PerModality<T> {
    pub fn from_fn(mut make: impl FnMut(Modality) -> T) -> Self {
        Self(Modality::ALL.map(&mut make))
    }
}

impl<T> Index<Modality> for PerModality<T> {
    type Output = T;

    fn index(&self, modality: Modality) -> &T {
        &self.0[modality.index()]
    }
}

impl<T> IndexMut<Modality> for PerModality<T> {
    fn index_mut(&mut self, modality: Modality) -> &mut T {
        &mut self.0[modality.index()]
    }
}
