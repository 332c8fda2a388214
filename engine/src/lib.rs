//! Trial engine for multi-modal dual n-back training.
//!
//! Rendering, audio output and the on-disk format are collaborators: the
//! engine talks to them through [`tasks::nback::Presenter`] and
//! [`core::storage::HistoryStore`].

pub mod core;
pub mod results;
pub mod tasks;
