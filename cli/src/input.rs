//! Keystroke capture using crossterm.
//!
//! Keys are read on a dedicated thread while the terminal is in raw mode and
//! forwarded over a channel, so a press reaches the session without Enter.

use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use engine::tasks::nback::Modality;
use futures_channel::mpsc::{unbounded, UnboundedReceiver};
use tracing::warn;

/// Short enough that the reader notices a closed channel promptly.
const POLL_TIMEOUT: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Flag(Modality),
    Quit,
}

pub fn key_for(ch: char) -> Option<Key> {
    let key = match ch.to_ascii_lowercase() {
        'a' => Key::Flag(Modality::Position),
        'l' => Key::Flag(Modality::Audio),
        'c' => Key::Flag(Modality::Color),
        's' => Key::Flag(Modality::Shape),
        'n' => Key::Flag(Modality::Number),
        'q' => Key::Quit,
        _ => return None,
    };
    Some(key)
}

pub fn key_hint(modality: Modality) -> char {
    match modality {
        Modality::Position => 'a',
        Modality::Audio => 'l',
        Modality::Color => 'c',
        Modality::Shape => 's',
        Modality::Number => 'n',
    }
}

/// Esc and Ctrl+C quit; plain characters go through [`key_for`].
pub fn translate(event: &KeyEvent) -> Option<Key> {
    if event.kind == KeyEventKind::Release {
        return None;
    }
    let chorded = event
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT);
    match event.code {
        KeyCode::Esc => Some(Key::Quit),
        KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => Some(Key::Quit),
        KeyCode::Char(ch) if !chorded => key_for(ch),
        _ => None,
    }
}

/// Raw mode for as long as the guard lives.
pub struct RawMode;

impl RawMode {
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Background keystroke reader. Dropping it stops and joins the thread.
pub struct KeyReader {
    keys: UnboundedReceiver<Key>,
    thread: Option<JoinHandle<()>>,
}

impl KeyReader {
    pub fn spawn() -> Self {
        let (tx, keys) = unbounded();
        let thread = thread::spawn(move || {
            while !tx.is_closed() {
                match event::poll(POLL_TIMEOUT) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(err) => {
                        warn!(error = %err, "terminal poll failed");
                        break;
                    }
                }
                match event::read() {
                    Ok(Event::Key(key_event)) => {
                        if let Some(key) = translate(&key_event) {
                            if tx.unbounded_send(key).is_err() {
                                break;
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(error = %err, "terminal read failed");
                        break;
                    }
                }
            }
        });
        Self {
            keys,
            thread: Some(thread),
        }
    }

    /// Ends with `None` once the reader thread has stopped.
    pub fn keys(&mut self) -> &mut UnboundedReceiver<Key> {
        &mut self.keys
    }
}

impl Drop for KeyReader {
    fn drop(&mut self) {
        self.keys.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn letters_map_to_modalities() {
        assert_eq!(
            translate(&press(KeyCode::Char('A'), KeyModifiers::SHIFT)),
            Some(Key::Flag(Modality::Position))
        );
        assert_eq!(
            translate(&press(KeyCode::Char('l'), KeyModifiers::NONE)),
            Some(Key::Flag(Modality::Audio))
        );
        assert_eq!(translate(&press(KeyCode::Char('x'), KeyModifiers::NONE)), None);
    }

    #[test]
    fn exit_keys_quit() {
        assert_eq!(translate(&press(KeyCode::Esc, KeyModifiers::NONE)), Some(Key::Quit));
        assert_eq!(
            translate(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Key::Quit)
        );
        assert_eq!(translate(&press(KeyCode::Char('q'), KeyModifiers::NONE)), Some(Key::Quit));
    }

    #[test]
    fn hints_round_trip() {
        for modality in Modality::ALL {
            assert_eq!(key_for(key_hint(modality)), Some(Key::Flag(modality)));
        }
    }
}
