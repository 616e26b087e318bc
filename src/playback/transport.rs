//! Transport clock: fires registered payloads at absolute offsets.
//!
//! The transport keeps its own position in seconds. While started, the
//! position follows the caller-supplied clock; while paused it is frozen.
//! Payloads are consumed through a cursor, so pausing and resuming never
//! fires anything twice.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Started,
    Paused,
}

#[derive(Debug, Clone)]
struct Scheduled<T> {
    at: f64,
    payload: T,
}

/// A queue of payloads sorted by offset, plus a resumable position.
#[derive(Debug, Clone)]
pub struct Transport<T> {
    events: Vec<Scheduled<T>>,
    /// Next event index to fire
    cursor: usize,
    state: TransportState,
    /// Position while paused or stopped
    position: f64,
    /// Clock time at which position 0 would have been, while started
    anchor: f64,
}

impl<T> Default for Transport<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Transport<T> {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            cursor: 0,
            state: TransportState::Stopped,
            position: 0.0,
            anchor: 0.0,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    /// Number of payloads not fired yet.
    pub fn pending(&self) -> usize {
        self.events.len() - self.cursor
    }

    /// Register `payload` at `offset` seconds. Payloads sharing an offset
    /// fire in registration order.
    pub fn schedule_at(&mut self, offset: f64, payload: T) {
        let index = self.events.partition_point(|e| e.at <= offset);
        if index < self.cursor {
            // Behind the cursor: it will never fire, keep the cursor on the
            // same next event.
            self.cursor += 1;
        }
        self.events.insert(index, Scheduled { at: offset, payload });
    }

    /// Start or resume from the retained position.
    pub fn start(&mut self, now: f64) {
        if self.state == TransportState::Started {
            return;
        }
        self.anchor = now - self.position;
        self.state = TransportState::Started;
    }

    /// Start from `offset` seconds, skipping every payload before it.
    pub fn start_at(&mut self, now: f64, offset: f64) {
        self.position = offset;
        self.cursor = self.events.partition_point(|e| e.at < offset);
        self.state = TransportState::Stopped;
        self.start(now);
    }

    /// Freeze the position.
    pub fn pause(&mut self, now: f64) {
        if self.state == TransportState::Started {
            self.position = now - self.anchor;
            self.state = TransportState::Paused;
        }
    }

    /// Stop and rewind to zero. Registered payloads are kept.
    pub fn stop(&mut self) {
        self.state = TransportState::Stopped;
        self.position = 0.0;
        self.cursor = 0;
    }

    /// Drop every registered payload.
    pub fn cancel_all(&mut self) {
        self.events.clear();
        self.cursor = 0;
    }

    /// Current position in seconds.
    pub fn position(&self, now: f64) -> f64 {
        match self.state {
            TransportState::Started => now - self.anchor,
            TransportState::Paused | TransportState::Stopped => self.position,
        }
    }
}

impl<T: Clone> Transport<T> {
    /// Fire every payload whose offset has been reached, in order, returning
    /// `(offset, payload)` pairs. Nothing fires unless started.
    pub fn drain_due(&mut self, now: f64) -> Vec<(f64, T)> {
        if self.state != TransportState::Started {
            return Vec::new();
        }
        let position = self.position(now);
        let mut due = Vec::new();
        while let Some(event) = self.events.get(self.cursor) {
            if event.at > position {
                break;
            }
            due.push((event.at, event.payload.clone()));
            self.cursor += 1;
        }
        due
    }
}
