//! Typed error values for the calendar core.

use chrono::NaiveDateTime;

use crate::event::EventId;

/// Error type for the fallible calendar operations.
///
/// Everything else in the core is a total function over its documented
/// domain and cannot fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    /// A view name passed to `set_view` was not one of
    /// `day`/`week`/`month`/`year`. The controller state is left
    /// unchanged.
    #[error("unsupported view type: {name}")]
    UnsupportedViewType {
        /// The unrecognized view name as given by the caller.
        name: String,
    },

    /// An event whose end precedes its start was offered to the store.
    /// Rejected at ingestion so it can never be mis-laid-out.
    #[error("event {id} ends before it starts ({end} < {start})")]
    InvalidEvent {
        /// Id of the offending event.
        id: EventId,
        /// The event's start instant.
        start: NaiveDateTime,
        /// The event's end instant.
        end: NaiveDateTime,
    },

    /// A range, title or layout getter (or a navigation call routed
    /// through the CLI) was invoked before any view was selected.
    #[error("no view selected")]
    NoActiveView,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_view_message() {
        let e = CalendarError::UnsupportedViewType {
            name: "bogus".to_string(),
        };
        assert_eq!(e.to_string(), "unsupported view type: bogus");
    }

    #[test]
    fn error_is_std_error() {
        fn assert_impl<T: std::error::Error>() {}
        assert_impl::<CalendarError>();
    }
}
