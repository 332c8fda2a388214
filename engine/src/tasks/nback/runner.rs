//! Async driver for a session on a tokio timer.
//!
//! A single task owns the [`NBackSession`]; input arrives as commands on an
//! unbounded channel and is applied between timer callbacks, so exactly one
//! evaluation runs per trial even on a multi-threaded runtime. Dropping the
//! future or sending `Abort` leaves nothing scheduled.

use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::StreamExt;
use tracing::warn;

use super::modality::Modality;
use super::session::{NBackSession, Presenter, SessionStatus, SessionSummary};
use crate::core::storage::HistoryStore;
use crate::core::timing::SessionClock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Flag(Modality),
    Abort,
}

/// Cloneable input side of a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    /// Safe to call after the session ended; the flag is simply dropped.
    pub fn flag(&self, modality: Modality) {
        let _ = self.tx.unbounded_send(SessionCommand::Flag(modality));
    }

    pub fn abort(&self) {
        let _ = self.tx.unbounded_send(SessionCommand::Abort);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub type SessionInbox = UnboundedReceiver<SessionCommand>;

pub fn session_channel() -> (SessionHandle, SessionInbox) {
    let (tx, rx) = unbounded();
    (SessionHandle { tx }, rx)
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEnd {
    Finished(Box<SessionSummary>),
    Aborted { completed_trials: usize },
}

/// Drives `session` to completion or abort. Closing every handle counts as abort.
pub async fn run_session<P: Presenter, H: HistoryStore>(
    mut session: NBackSession<P, H>,
    mut inbox: SessionInbox,
) -> SessionEnd {
    let clock = SessionClock::start();
    loop {
        match session.status() {
            SessionStatus::Running => {}
            SessionStatus::Finished => {
                return match session.summary() {
                    Some(summary) => SessionEnd::Finished(Box::new(summary.clone())),
                    None => SessionEnd::Aborted {
                        completed_trials: session.completed_trials(),
                    },
                };
            }
            SessionStatus::Aborted => {
                return SessionEnd::Aborted {
                    completed_trials: session.completed_trials(),
                };
            }
        }

        let Some(due_ms) = session.next_deadline() else {
            warn!("running session has nothing scheduled; aborting");
            session.abort();
            continue;
        };

        tokio::select! {
            biased;
            command = inbox.next() => match command {
                Some(SessionCommand::Flag(modality)) => {
                    session.flag(modality);
                }
                Some(SessionCommand::Abort) | None => {
                    session.abort();
                }
            },
            _ = clock.sleep_until(due_ms) => {
                session.advance_to(clock.now_ms());
            }
        }
    }
}
