// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The observer hub (C3): a process-wide in-memory pub/sub for tier-1
//! events (per-run + global) and tier-2 I/O lines. Channels are created on
//! first access and persist for the lifetime of the process (spec.md §4.3).
//! Strictly in-process — cross-process observation goes through the run
//! store instead (spec.md §5).

use mill_core::{IoStreamEvent, MillEvent, RunId};
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 1024;

pub struct ObserverHub {
    tier1_by_run: Mutex<HashMap<RunId, broadcast::Sender<MillEvent>>>,
    tier1_global: broadcast::Sender<MillEvent>,
    io_by_run: Mutex<HashMap<RunId, broadcast::Sender<IoStreamEvent>>>,
}

impl Default for ObserverHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ObserverHub {
    pub fn new() -> Self {
        let (tier1_global, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tier1_by_run: Mutex::new(HashMap::new()),
            tier1_global,
            io_by_run: Mutex::new(HashMap::new()),
        }
    }

    fn tier1_sender(&self, run_id: &RunId) -> broadcast::Sender<MillEvent> {
        let mut channels = self.tier1_by_run.lock();
        channels
            .entry(run_id.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    fn io_sender(&self, run_id: &RunId) -> broadcast::Sender<IoStreamEvent> {
        let mut channels = self.io_by_run.lock();
        channels
            .entry(run_id.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Publish to both the per-run tier-1 channel and the global channel.
    pub fn publish_tier1(&self, run_id: &RunId, event: MillEvent) {
        let _ = self.tier1_sender(run_id).send(event.clone());
        let _ = self.tier1_global.send(event);
    }

    pub fn publish_io(&self, event: IoStreamEvent) {
        let _ = self.io_sender(&event.run_id).send(event);
    }

    pub fn subscribe_tier1(&self, run_id: &RunId) -> broadcast::Receiver<MillEvent> {
        self.tier1_sender(run_id).subscribe()
    }

    pub fn subscribe_tier1_global(&self) -> broadcast::Receiver<MillEvent> {
        self.tier1_global.subscribe()
    }

    pub fn subscribe_io(&self, run_id: &RunId) -> broadcast::Receiver<IoStreamEvent> {
        self.io_sender(run_id).subscribe()
    }
}

/// A lazily-pulled sequence of tier-1 events: backfilled persisted events
/// first, then a live subscription. Ends the moment a run-terminal event is
/// observed, matching "the stream closes on `run:complete`" (spec.md §8 S6).
pub struct EventStream {
    backfill: std::vec::IntoIter<MillEvent>,
    live: Option<broadcast::Receiver<MillEvent>>,
}

impl EventStream {
    pub(crate) fn new(backfill: Vec<MillEvent>, live: Option<broadcast::Receiver<MillEvent>>) -> Self {
        Self { backfill: backfill.into_iter(), live }
    }

    pub async fn next(&mut self) -> Option<MillEvent> {
        if let Some(event) = self.backfill.next() {
            if event.payload.run_terminal_kind().is_some() {
                self.live = None;
            }
            return Some(event);
        }
        let receiver = self.live.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if event.payload.run_terminal_kind().is_some() {
                        self.live = None;
                    }
                    return Some(event);
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    self.live = None;
                    return None;
                }
            }
        }
    }
}

/// A tier-2 I/O stream: live-only, no backfill (tier-2 events are never
/// persisted — spec.md §3).
pub struct IoEventStream {
    live: broadcast::Receiver<IoStreamEvent>,
}

impl IoEventStream {
    pub(crate) fn new(live: broadcast::Receiver<IoStreamEvent>) -> Self {
        Self { live }
    }

    pub async fn next(&mut self) -> Option<IoStreamEvent> {
        loop {
            match self.live.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// `watchAll`'s cross-run stream: backfill across every run filtered and
/// totally ordered by `(timestamp, runId, sequence)`, then the live global
/// channel filtered by the same `sinceTime` predicate (spec.md §4.5).
pub struct GlobalEventStream {
    backfill: std::vec::IntoIter<MillEvent>,
    live: broadcast::Receiver<MillEvent>,
    since_time: String,
}

impl GlobalEventStream {
    pub(crate) fn new(backfill: Vec<MillEvent>, live: broadcast::Receiver<MillEvent>, since_time: String) -> Self {
        Self { backfill: backfill.into_iter(), live, since_time }
    }

    pub async fn next(&mut self) -> Option<MillEvent> {
        if let Some(event) = self.backfill.next() {
            return Some(event);
        }
        loop {
            match self.live.recv().await {
                Ok(event) if event.timestamp >= self.since_time => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mill_core::EventPayload;

    fn event(run_id: &str, sequence: u64) -> MillEvent {
        MillEvent::new(
            RunId::from_string(run_id),
            sequence,
            "2026-01-01T00:00:00Z".into(),
            EventPayload::RunStart { program_path: "/x".into() },
        )
    }

    #[tokio::test]
    async fn publish_reaches_both_per_run_and_global_subscribers() {
        let hub = ObserverHub::new();
        let run_id = RunId::from_string("run_1");
        let mut per_run = hub.subscribe_tier1(&run_id);
        let mut global = hub.subscribe_tier1_global();

        hub.publish_tier1(&run_id, event("run_1", 1));

        assert_eq!(per_run.recv().await.unwrap().sequence, 1);
        assert_eq!(global.recv().await.unwrap().sequence, 1);
    }

    #[tokio::test]
    async fn event_stream_ends_after_run_terminal_in_backfill() {
        let mut backfill_events = vec![event("run_1", 1)];
        backfill_events.push(MillEvent::new(
            RunId::from_string("run_1"),
            2,
            "2026-01-01T00:00:01Z".into(),
            EventPayload::RunFailed { message: "boom".into() },
        ));
        let hub = ObserverHub::new();
        let live = hub.subscribe_tier1(&RunId::from_string("run_1"));
        let mut stream = EventStream::new(backfill_events, Some(live));

        assert_eq!(stream.next().await.unwrap().sequence, 1);
        assert_eq!(stream.next().await.unwrap().sequence, 2);
        assert!(stream.next().await.is_none());
    }
}
