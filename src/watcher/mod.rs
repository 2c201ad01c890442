//! The event watcher.
//!
//! Subscribes to the daemon's `/events` stream, looks up the container of
//! every event and hands the enriched [`Event`] to the consumer over a
//! bounded channel. Decoding, lookup and hand-off happen one event at a
//! time on a single task.
//!
//! Failures are split in two classes:
//!
//! - session faults (cannot connect, non-OK event stream, malformed record,
//!   broken stream) end the watch and are returned as a [`WatchError`];
//! - per-event faults never stop the stream. A lookup that fails or returns
//!   a non-OK status drops the event, while an OK lookup whose body cannot
//!   be decoded still emits the event with a default [`Container`].
//!
//! In every case the output channel is closed when `run` returns.

use std::num::NonZeroUsize;

use http::StatusCode;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinHandle;

use crate::daemon::{read_body, DaemonClient, DaemonError};
use crate::event::{Container, Event, RawEvent};

pub mod decoder;

use decoder::{DecodeError, JsonStreamDecoder};

/// Default `since` timestamp: replay everything the daemon still buffers.
pub const DEFAULT_SINCE: i64 = 1;

/// Default capacity of the output channel.
pub const DEFAULT_CAPACITY: NonZeroUsize = NonZeroUsize::new(64).unwrap();

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("Unable to open event stream: {0}")]
    Connect(#[source] DaemonError),
    #[error("Event stream request failed with status {0}")]
    UnexpectedStatus(StatusCode),
    #[error("Event stream failed: {0}")]
    Stream(#[from] DecodeError),
}

/// Why a watch ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The daemon closed the event stream.
    EndOfStream,
    /// A cancel message was received.
    Cancelled,
    /// The consumer dropped its receiver.
    ConsumerGone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchSummary {
    pub outcome: WatchOutcome,
    pub emitted: u64,
    pub dropped: u64,
}

impl WatchSummary {
    fn new() -> Self {
        Self {
            outcome: WatchOutcome::EndOfStream,
            emitted: 0,
            dropped: 0,
        }
    }

    fn finish(mut self, outcome: WatchOutcome) -> Self {
        self.outcome = outcome;
        self
    }
}

/// A watch running on its own task.
pub struct WatchHandle {
    pub events: Receiver<Event>,
    pub cancel: Sender<()>,
    pub task: JoinHandle<Result<WatchSummary, WatchError>>,
}

impl WatchHandle {
    /// Ask the watcher to stop. The events channel closes once it has.
    pub async fn cancel(&self) {
        let _ = self.cancel.send(()).await;
    }
}

pub struct EventWatcher<D> {
    daemon: D,
    since: i64,
}

impl<D: DaemonClient> EventWatcher<D> {
    pub fn new(daemon: D) -> Self {
        Self {
            daemon,
            since: DEFAULT_SINCE,
        }
    }

    pub fn since(mut self, since: i64) -> Self {
        self.since = since;
        self
    }

    /// Run the watch on the current runtime with an output channel of
    /// `capacity` events.
    pub fn spawn(self, capacity: NonZeroUsize) -> WatchHandle
    where
        D: 'static,
    {
        let (events_tx, events) = mpsc::channel(capacity.get());
        let (cancel, cancel_rx) = mpsc::channel(1);
        let task = tokio::spawn(async move { self.run(events_tx, cancel_rx).await });
        WatchHandle {
            events,
            cancel,
            task,
        }
    }

    /// Stream, enrich and forward events until the daemon closes the stream,
    /// a session fault occurs, `cancel` receives a message or the consumer
    /// goes away. `events` is dropped on return, which closes the channel.
    pub async fn run(
        &self,
        events: Sender<Event>,
        mut cancel: Receiver<()>,
    ) -> Result<WatchSummary, WatchError> {
        let summary = WatchSummary::new();
        let path = format!("/events?since={}", self.since);

        log::info!("Subscribing to daemon events ({path})");
        let response = tokio::select! {
            response = self.daemon.get(&path) => response.map_err(WatchError::Connect)?,
            Some(()) = cancel.recv() => return Ok(summary.finish(WatchOutcome::Cancelled)),
        };
        if response.status != StatusCode::OK {
            return Err(WatchError::UnexpectedStatus(response.status));
        }

        let mut decoder = JsonStreamDecoder::<RawEvent>::new(response.body);
        self.stream(&mut decoder, &events, &mut cancel, summary)
            .await
            .inspect(|summary| {
                log::info!(
                    "Event watch finished ({:?}): {} emitted, {} dropped",
                    summary.outcome,
                    summary.emitted,
                    summary.dropped
                )
            })
    }

    async fn stream(
        &self,
        decoder: &mut JsonStreamDecoder<RawEvent>,
        events: &Sender<Event>,
        cancel: &mut Receiver<()>,
        mut summary: WatchSummary,
    ) -> Result<WatchSummary, WatchError> {
        loop {
            let raw = tokio::select! {
                raw = decoder.next() => match raw? {
                    Some(raw) => raw,
                    None => return Ok(summary.finish(WatchOutcome::EndOfStream)),
                },
                Some(()) = cancel.recv() => return Ok(summary.finish(WatchOutcome::Cancelled)),
            };
            log::debug!("Received event {} for {}", raw.status, raw.id);

            let container = tokio::select! {
                container = self.inspect(&raw.id) => container,
                Some(()) = cancel.recv() => return Ok(summary.finish(WatchOutcome::Cancelled)),
            };
            let Some(container) = container else {
                summary.dropped += 1;
                continue;
            };

            tokio::select! {
                sent = events.send(raw.enrich(container)) => {
                    if sent.is_err() {
                        log::warn!("Event consumer went away, stopping watch");
                        return Ok(summary.finish(WatchOutcome::ConsumerGone));
                    }
                    summary.emitted += 1;
                }
                Some(()) = cancel.recv() => return Ok(summary.finish(WatchOutcome::Cancelled)),
            }
        }
    }

    /// Fetch the container descriptor for `id`.
    ///
    /// `None` means the event must be dropped. A body that cannot be read or
    /// decoded still yields a (default) container.
    async fn inspect(&self, id: &str) -> Option<Container> {
        let path = format!("/containers/{}/json", urlencoding::encode(id));
        let response = match self.daemon.get(&path).await {
            Ok(response) => response,
            Err(e) => {
                log::error!("Unable to inspect container {id}: {e}");
                return None;
            }
        };

        if response.status != StatusCode::OK {
            log::debug!(
                "Inspecting container {id} returned {}, dropping event",
                response.status
            );
            return None;
        }

        let container = match read_body(response.body).await {
            Ok(body) => serde_json::from_slice(&body).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        Some(container.unwrap_or_else(|e| {
            log::error!("Error decoding container JSON for {id}: {e}");
            Container::default()
        }))
    }
}
