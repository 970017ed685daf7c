//! One forecast view's request lifecycle
//!
//! Each request gets a token from a monotonically increasing counter. A new
//! request or `close` aborts the task in flight, which also cancels its
//! pending fallback delay, and updates carrying any token but the latest
//! are discarded. This keeps a slow answer for an old pin from overwriting
//! the answer for the current one.
//!
//! A transport failure arrives as its own [`Update::Advisory`] before the
//! fallback delay, so the advisory is visible while the session is still
//! loading.

use super::{ForecastOutcome, ForecastService};
use crate::models::{ForecastReport, Pin};
use crate::{Result, WeatherLensError};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Finished request, tagged with the token it was issued under
#[derive(Debug)]
pub struct Completion {
    token: u64,
    result: Result<ForecastOutcome>,
}

impl Completion {
    #[must_use]
    pub fn token(&self) -> u64 {
        self.token
    }
}

/// Message from a running request back to its session
#[derive(Debug)]
pub enum Update {
    /// The live request failed; a synthetic report follows after the delay
    Advisory { token: u64, message: String },
    Finished(Completion),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    MissingInput { message: String },
    Loading { token: u64 },
    Ready(Box<ForecastReport>),
}

pub struct ForecastSession {
    service: ForecastService,
    latest: u64,
    state: SessionState,
    advisory: Option<String>,
    pending: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<Update>,
    rx: mpsc::UnboundedReceiver<Update>,
}

impl ForecastSession {
    #[must_use]
    pub fn new(service: ForecastService) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            service,
            latest: 0,
            state: SessionState::Idle,
            advisory: None,
            pending: None,
            tx,
            rx,
        }
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn report(&self) -> Option<&ForecastReport> {
        match &self.state {
            SessionState::Ready(report) => Some(report),
            _ => None,
        }
    }

    /// Token of the most recent request
    #[must_use]
    pub fn latest_token(&self) -> u64 {
        self.latest
    }

    /// Last advisory, left in place
    #[must_use]
    pub fn advisory(&self) -> Option<&str> {
        self.advisory.as_deref()
    }

    /// Last advisory, cleared so it is surfaced only once
    pub fn take_advisory(&mut self) -> Option<String> {
        self.advisory.take()
    }

    fn abort_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Start a forecast for `pin`, superseding any request still running.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn request(&mut self, pin: Option<Pin>, datetime: DateTime<Utc>) -> u64 {
        self.abort_pending();
        self.latest += 1;
        self.advisory = None;
        let token = self.latest;

        let Some(pin) = pin else {
            self.state = SessionState::MissingInput {
                message: WeatherLensError::missing_pin().user_message(),
            };
            return token;
        };

        self.state = SessionState::Loading { token };
        let service = self.service.clone();
        let tx = self.tx.clone();
        self.pending = Some(tokio::spawn(async move {
            // The receiver only goes away with the session itself.
            let result = service
                .fetch_with_advisory(Some(&pin), datetime, |err| {
                    let _ = tx.send(Update::Advisory {
                        token,
                        message: err.to_string(),
                    });
                })
                .await;
            let _ = tx.send(Update::Finished(Completion { token, result }));
        }));
        token
    }

    /// Apply a completion; returns false if it was stale and dropped
    pub fn settle(&mut self, completion: Completion) -> bool {
        let current = matches!(self.state, SessionState::Loading { token } if token == completion.token);
        if !current {
            debug!(
                "Discarding stale forecast completion {} (latest {})",
                completion.token, self.latest
            );
            return false;
        }

        self.pending = None;
        match completion.result {
            // Any advisory was already delivered ahead of the completion.
            Ok(outcome) => {
                self.state = SessionState::Ready(Box::new(outcome.report));
            }
            Err(err) => {
                self.state = SessionState::MissingInput {
                    message: err.user_message(),
                };
            }
        }
        true
    }

    /// Record an advisory if it belongs to the latest request
    pub fn note_advisory(&mut self, token: u64, message: String) -> bool {
        if token != self.latest {
            debug!("Discarding stale advisory {} (latest {})", token, self.latest);
            return false;
        }
        self.advisory = Some(message);
        true
    }

    /// Apply one update; true if it committed a completion
    fn apply(&mut self, update: Update) -> bool {
        match update {
            Update::Advisory { token, message } => {
                self.note_advisory(token, message);
                false
            }
            Update::Finished(completion) => self.settle(completion),
        }
    }

    /// Apply every update already received without waiting; true if a completion committed
    pub fn poll(&mut self) -> bool {
        let mut committed = false;
        while let Ok(update) = self.rx.try_recv() {
            committed |= self.apply(update);
        }
        committed
    }

    /// Wait for the current request to settle; false if nothing is loading
    pub async fn wait(&mut self) -> bool {
        while matches!(self.state, SessionState::Loading { .. }) {
            let Some(update) = self.rx.recv().await else {
                return false;
            };
            if self.apply(update) {
                return true;
            }
        }
        false
    }

    /// Abandon any request in flight and return to `Idle`.
    ///
    /// Updates already received are applied first, so an advisory that
    /// arrived during the fallback delay is kept.
    pub fn close(&mut self) {
        self.poll();
        self.abort_pending();
        self.latest += 1;
        self.state = SessionState::Idle;
    }
}

impl Drop for ForecastSession {
    fn drop(&mut self) {
        self.abort_pending();
    }
}
