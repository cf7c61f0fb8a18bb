use std::time::Instant;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::client::{ClientError, ClientOptions, DashboardClient};
use crate::clipboard::Clipboard;
use crate::records::{self, Record, RecordsError};
use crate::view::{Command, DashboardView, Effect, MediaEffect, Update, UpdateFailure, ViewOptions};

#[derive(Clone, Debug, Default)]
pub struct Options {
    pub client: ClientOptions,
    pub view: ViewOptions,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Records(#[from] RecordsError),
}

/// Wall-clock stand-in for the media element of the playing record.
#[derive(Clone, Debug, Default)]
struct PlaybackClock {
    running: Option<(String, Instant, f64)>,
}

impl PlaybackClock {
    fn start(&mut self, id: &str, from: f64, now: Instant) {
        self.running = Some((id.to_string(), now, from));
    }

    fn stop(&mut self, id: &str) {
        if self.running.as_ref().is_some_and(|(running, _, _)| running == id) {
            self.running = None;
        }
    }

    fn seek(&mut self, id: &str, position: f64, now: Instant) {
        if let Some((running, started, base)) = self.running.as_mut() {
            if running == id {
                *started = now;
                *base = position;
            }
        }
    }

    fn position(&self, now: Instant) -> Option<(String, f64)> {
        let (id, started, base) = self.running.as_ref()?;
        Some((id.clone(), base + now.saturating_duration_since(*started).as_secs_f64()))
    }
}

/// Drives a [`DashboardView`]: applies commands, performs the effects they
/// request and feeds the results back in as commands.
pub struct Session {
    view: DashboardView,
    client: DashboardClient,
    clipboard: Box<dyn Clipboard>,
    tx: mpsc::UnboundedSender<Command>,
    rx: mpsc::UnboundedReceiver<Command>,
    requests: usize,
    playback: PlaybackClock,
}

impl Session {
    pub fn new(
        records: Vec<Record>,
        options: Options,
        clipboard: Box<dyn Clipboard>,
    ) -> Result<Self, RunnerError> {
        records::validate_records(&records)?;
        let client = DashboardClient::new(&options.client)?;
        let (tx, rx) = mpsc::unbounded_channel();
        tracing::info!(records = records.len(), base_url = %client.base_url(), "dashboard initialized");
        Ok(Self {
            view: DashboardView::new(records, options.view),
            client,
            clipboard,
            tx,
            rx,
            requests: 0,
            playback: PlaybackClock::default(),
        })
    }

    pub fn view(&self) -> &DashboardView {
        &self.view
    }

    /// Number of network requests whose result has not been applied yet.
    pub fn pending(&self) -> usize {
        self.requests
    }

    pub fn dispatch(&mut self, command: Command) -> Update {
        let now = Instant::now();
        let update = self.view.update(command, now);
        let mut out = Update {
            changes: update.changes,
            effects: Vec::new(),
        };
        for effect in update.effects {
            out.extend(self.perform(effect.clone(), now));
            out.effects.push(effect);
        }
        out
    }

    fn perform(&mut self, effect: Effect, now: Instant) -> Update {
        match effect {
            Effect::SubmitStatus { id, status, ticket } => {
                let client = self.client.clone();
                let tx = self.tx.clone();
                self.requests += 1;
                tokio::spawn(async move {
                    let command = match client.update_status(&id, status).await {
                        Ok(()) => {
                            tracing::info!(id = %id, status = %status, "status updated");
                            Command::StatusSaved { id, ticket, status }
                        }
                        Err(ClientError::Status { status: code }) => {
                            tracing::warn!(id = %id, status = code, "status update rejected");
                            Command::StatusFailed {
                                id,
                                ticket,
                                failure: UpdateFailure::Rejected { status: code },
                            }
                        }
                        Err(e) => {
                            tracing::error!(id = %id, error = %e, "error updating status");
                            Command::StatusFailed {
                                id,
                                ticket,
                                failure: UpdateFailure::Network {
                                    message: e.to_string(),
                                },
                            }
                        }
                    };
                    let _ = tx.send(command);
                });
                Update::default()
            }
            Effect::LookupLedger { id } => {
                let client = self.client.clone();
                let tx = self.tx.clone();
                self.requests += 1;
                tokio::spawn(async move {
                    let command = match client.verify(&id).await {
                        Ok(lookup) => {
                            tracing::debug!(id = %id, found = lookup.found, "ledger lookup");
                            Command::Verified { id, lookup }
                        }
                        Err(e) => {
                            tracing::warn!(id = %id, error = %e, "verification failed");
                            Command::VerifyFailed {
                                id,
                                reason: e.to_string(),
                            }
                        }
                    };
                    let _ = tx.send(command);
                });
                Update::default()
            }
            Effect::WriteClipboard { id, hash } => {
                let command = match self.clipboard.write_text(&hash) {
                    Ok(()) => Command::HashCopied { id },
                    Err(e) => {
                        tracing::error!(id = %id, error = %e, "failed to copy hash");
                        Command::CopyFailed {
                            id,
                            reason: e.to_string(),
                        }
                    }
                };
                self.dispatch(command)
            }
            Effect::Media { id, action } => {
                match action {
                    MediaEffect::Play => {
                        let from = self.view.deck().get(&id).map(|p| p.position).unwrap_or(0.0);
                        self.playback.start(&id, from, now);
                    }
                    MediaEffect::Pause => self.playback.stop(&id),
                    MediaEffect::Seek { position } => self.playback.seek(&id, position, now),
                }
                Update::default()
            }
        }
    }

    /// Timers: toast lifecycle, control feedback and playback progress.
    pub fn tick(&mut self) -> Update {
        let now = Instant::now();
        let mut out = self.dispatch(Command::Tick);
        let Some((id, position)) = self.playback.position(now) else {
            return out;
        };
        let duration = self.view.deck().get(&id).and_then(|p| p.duration);
        match duration {
            Some(d) if position >= d => {
                self.playback.stop(&id);
                out.extend(self.dispatch(Command::PlaybackEnded { id }));
            }
            _ => out.extend(self.dispatch(Command::TimeUpdate {
                id,
                current_time: position,
            })),
        }
        out
    }

    /// Waits for the next network result and applies it.
    pub async fn next_completion(&mut self) -> Option<Update> {
        if self.requests == 0 {
            return None;
        }
        let command = self.rx.recv().await?;
        self.requests -= 1;
        Some(self.dispatch(command))
    }

    /// Applies results until no request is outstanding.
    pub async fn settle(&mut self) -> Update {
        let mut out = Update::default();
        while let Some(update) = self.next_completion().await {
            out.extend(update);
        }
        out
    }
}
