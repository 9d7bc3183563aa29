use std::fmt;

use chrono::{DateTime, Utc};

/// A single timestamped entry in a model's history.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// When the transformation happened.
    pub time: DateTime<Utc>,
    /// Human-readable description of the transformation.
    pub message: String,
}

impl Event {
    pub fn new(message: impl Into<String>) -> Self {
        Self::at(Utc::now(), message)
    }

    pub fn at(time: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            time,
            message: message.into(),
        }
    }
}

/// Append-only log of everything that happened to a model.
///
/// Entries are never removed. Derived models start from a copy of the
/// parent's history and append their own record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    events: Vec<Event>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a history holding a single record stamped with the current time.
    pub fn starting_with(message: impl Into<String>) -> Self {
        let mut h = Self::new();
        h.push(message);
        h
    }

    /// Appends a record stamped with the current time.
    pub fn push(&mut self, message: impl Into<String>) {
        self.events.push(Event::new(message));
    }

    /// Appends a pre-built record (used when loading persisted models).
    pub fn push_event(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Returns a copy of this history with one extra record.
    pub fn derive(&self, message: impl Into<String>) -> Self {
        let mut h = self.clone();
        h.push(message);
        h
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last(&self) -> Option<&Event> {
        self.events.last()
    }
}

impl fmt::Display for History {
    /// One line per record: seconds elapsed since the first record, then the description.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(first) = self.events.first() else {
            return Ok(());
        };
        for ev in &self.events {
            let elapsed = ev.time.signed_duration_since(first.time);
            let secs = elapsed.num_milliseconds() as f64 / 1000.0;
            writeln!(f, "{secs:10.3}: {}", ev.message)?;
        }
        Ok(())
    }
}
