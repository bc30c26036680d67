use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Context;
use tracing::{debug, info};

use crate::error::CalendarError;
use crate::event::{ClippedEvent, Event};
use crate::view::ViewRange;

/// In-memory event collection answering range queries. Events are
/// validated on the way in and never mutated afterwards; queries
/// return clipped copies.
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<Event>) -> Result<Self, CalendarError> {
        let mut store = Self::new();
        for event in events {
            store.insert(event)?;
        }
        Ok(store)
    }

    #[tracing::instrument(skip(self, event), fields(id = %event.id))]
    pub fn insert(&mut self, event: Event) -> Result<(), CalendarError> {
        event.validate()?;
        self.events.push(event);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events intersecting `range`, clipped to its bounds, sorted
    /// ascending by clipped start. Two events sharing a start sort
    /// longer-duration first. The selection test is inclusive on both
    /// ends, so an event touching a range boundary is included.
    #[tracing::instrument(skip(self, range), fields(granularity = range.granularity.name()))]
    pub fn query(&self, range: &ViewRange) -> Vec<ClippedEvent> {
        let mut hits: Vec<ClippedEvent> = self
            .events
            .iter()
            .filter(|event| event.start <= range.end && event.end >= range.start)
            .map(|event| ClippedEvent::from_event(event, range.start, range.end))
            .collect();

        hits.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| b.duration().cmp(&a.duration()))
        });

        debug!(total = self.events.len(), matched = hits.len(), "range query");
        hits
    }
}

/// Reads an event collection from a JSONL file, one event object per
/// line. Blank lines are skipped. Invalid events are rejected here,
/// before they ever reach a store.
#[tracing::instrument(skip(path))]
pub fn load_events(path: &Path) -> anyhow::Result<Vec<Event>> {
    debug!(file = %path.display(), "loading events jsonl");
    let file = fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let event: Event = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        event
            .validate()
            .with_context(|| format!("rejected event at {} line {}", path.display(), idx + 1))?;
        out.push(event);
    }

    info!(count = out.len(), "loaded events from jsonl");
    Ok(out)
}
