use std::fmt;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::datetime::wall_time_serde;
use crate::error::CalendarError;

/// Caller-supplied event identifier. Unique and stable; the core never
/// generates ids of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventId {
    Int(i64),
    Text(String),
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventId::Int(n) => write!(f, "{n}"),
            EventId::Text(s) => write!(f, "{s}"),
        }
    }
}

/// A scheduled interval, immutable as authored. Range-clipping and
/// multi-day splitting never touch the stored original; they produce
/// [`ClippedEvent`] copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,

    pub title: String,

    #[serde(with = "wall_time_serde")]
    pub start: NaiveDateTime,

    #[serde(with = "wall_time_serde")]
    pub end: NaiveDateTime,

    #[serde(default)]
    pub color: Option<String>,

    #[serde(default)]
    pub background: Option<String>,

    #[serde(default)]
    pub organizer: Option<String>,

    #[serde(default)]
    pub summary: Option<String>,
}

impl Event {
    pub fn new(
        id: EventId,
        title: impl Into<String>,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Self, CalendarError> {
        let event = Self {
            id,
            title: title.into(),
            start,
            end,
            color: None,
            background: None,
            organizer: None,
            summary: None,
        };
        event.validate()?;
        Ok(event)
    }

    /// Ingestion-time check: an event whose end precedes its start is
    /// rejected rather than silently mis-laid-out.
    pub fn validate(&self) -> Result<(), CalendarError> {
        if self.end < self.start {
            return Err(CalendarError::InvalidEvent {
                id: self.id.clone(),
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whether the authored interval stays within one calendar day.
    pub fn is_single_day(&self) -> bool {
        self.start.date() == self.end.date()
    }
}

/// A per-view copy of an [`Event`] whose start/end are clamped to the
/// visible range. Week layout additionally splits one of these per day
/// the event touches.
#[derive(Debug, Clone, PartialEq)]
pub struct ClippedEvent {
    pub event: Event,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl ClippedEvent {
    /// Copies `event`, clamping both boundaries into
    /// `[range_start, range_end]`.
    pub fn from_event(
        event: &Event,
        range_start: NaiveDateTime,
        range_end: NaiveDateTime,
    ) -> Self {
        Self {
            event: event.clone(),
            start: event.start.max(range_start),
            end: event.end.min(range_end),
        }
    }

    /// A sub-segment of an already clipped event, used by the week
    /// view's per-day split.
    pub fn segment(&self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            event: self.event.clone(),
            start,
            end,
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// True when either boundary was moved off the authored instant.
    pub fn is_clipped(&self) -> bool {
        self.start != self.event.start || self.end != self.event.end
    }
}
