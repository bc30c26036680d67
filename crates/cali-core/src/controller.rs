use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::config::CalendarConfig;
use crate::error::CalendarError;
use crate::store::EventStore;
use crate::view::{self, LayoutItem, ViewKind, ViewRange};

/// Owns the active date and the currently selected view, and is the
/// single mutation point for both. Views and the store are wired in at
/// construction; nothing here reaches back into the caller.
///
/// Single-threaded by design: every operation runs to completion
/// before returning, and a multi-threaded host must serialize calls.
#[derive(Debug)]
pub struct CalendarController {
    store: EventStore,
    config: CalendarConfig,
    active: NaiveDateTime,
    view: Option<ViewKind>,
}

impl CalendarController {
    /// Starts in the uninitialized view state with the active date at
    /// "now"; select a view with [`set_view`](Self::set_view).
    pub fn new(store: EventStore, config: CalendarConfig) -> Self {
        Self {
            store,
            config,
            active: Local::now().naive_local(),
            view: None,
        }
    }

    /// Pins the active date, for hosts that drive the calendar from an
    /// explicit date rather than the wall clock.
    #[must_use]
    pub fn with_active_date(mut self, active: NaiveDateTime) -> Self {
        self.active = active;
        self
    }

    pub fn active_date(&self) -> NaiveDateTime {
        self.active
    }

    pub fn current_view(&self) -> Option<ViewKind> {
        self.view
    }

    pub fn config(&self) -> &CalendarConfig {
        &self.config
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    /// Switches the active granularity. A no-op when `name` is the
    /// current one; an unrecognized name fails with
    /// `UnsupportedViewType` and leaves all state unchanged.
    #[tracing::instrument(skip(self))]
    pub fn set_view(&mut self, name: &str) -> Result<(), CalendarError> {
        let kind = ViewKind::parse(name)?;
        if self.view == Some(kind) {
            debug!(view = kind.name(), "view unchanged");
            return Ok(());
        }

        info!(view = kind.name(), "switching view");
        self.view = Some(kind);
        Ok(())
    }

    /// Advances the active date by one view-specific step. Ignored
    /// when no view is selected.
    pub fn next(&mut self) {
        self.step(1);
    }

    /// Retreats the active date by one view-specific step. Ignored
    /// when no view is selected.
    pub fn prev(&mut self) {
        self.step(-1);
    }

    /// Replaces the active date wholesale with "now". Ignored when no
    /// view is selected.
    #[tracing::instrument(skip(self))]
    pub fn today(&mut self) {
        if self.view.is_none() {
            warn!("navigation ignored; no view selected");
            return;
        }
        self.active = Local::now().naive_local();
        debug!(active = %self.active, "active date reset to now");
    }

    fn step(&mut self, steps: i64) {
        let Some(kind) = self.view else {
            warn!("navigation ignored; no view selected");
            return;
        };
        self.active = view::step(kind, self.active, steps);
        debug!(view = kind.name(), active = %self.active, "active date moved");
    }

    pub fn view_range(&self) -> Result<ViewRange, CalendarError> {
        let kind = self.view.ok_or(CalendarError::NoActiveView)?;
        Ok(view::view_range(kind, self.active))
    }

    pub fn title(&self) -> Result<String, CalendarError> {
        let kind = self.view.ok_or(CalendarError::NoActiveView)?;
        Ok(view::view_title(kind, self.active, &self.config.locale))
    }

    /// Full re-derivation on every call: range, filtered query, lane
    /// assignment, geometry. No caching.
    pub fn layout(&self) -> Result<Vec<LayoutItem>, CalendarError> {
        let kind = self.view.ok_or(CalendarError::NoActiveView)?;
        Ok(view::layout(kind, self.active, &self.store, &self.config))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::event::{Event, EventId};

    fn controller() -> CalendarController {
        let active = NaiveDate::from_ymd_opt(2016, 9, 22)
            .expect("valid date")
            .and_hms_opt(12, 0, 0)
            .expect("valid time");
        CalendarController::new(EventStore::new(), CalendarConfig::default())
            .with_active_date(active)
    }

    #[test]
    fn bogus_view_leaves_state_unchanged() {
        let mut cal = controller();
        cal.set_view("week").expect("valid view");
        let before = cal.active_date();

        let err = cal.set_view("bogus").expect_err("must reject");
        assert!(matches!(err, CalendarError::UnsupportedViewType { .. }));
        assert_eq!(cal.current_view(), Some(ViewKind::Week));
        assert_eq!(cal.active_date(), before);
    }

    #[test]
    fn set_view_same_kind_is_a_no_op() {
        let mut cal = controller();
        cal.set_view("day").expect("valid view");
        cal.set_view("day").expect("still valid");
        assert_eq!(cal.current_view(), Some(ViewKind::Day));
    }

    #[test]
    fn navigation_without_view_is_ignored() {
        let mut cal = controller();
        let before = cal.active_date();

        cal.next();
        cal.prev();
        cal.today();

        assert_eq!(cal.active_date(), before);
        assert_eq!(cal.current_view(), None);
    }

    #[test]
    fn getters_fail_without_view() {
        let cal = controller();
        assert_eq!(cal.view_range(), Err(CalendarError::NoActiveView));
        assert_eq!(cal.title(), Err(CalendarError::NoActiveView));
        assert!(matches!(cal.layout(), Err(CalendarError::NoActiveView)));
    }

    #[test]
    fn next_prev_round_trips_for_day_and_week() {
        for name in ["day", "week"] {
            let mut cal = controller();
            cal.set_view(name).expect("valid view");
            let before = cal.active_date();

            cal.next();
            assert_ne!(cal.active_date(), before);
            cal.prev();
            assert_eq!(cal.active_date(), before);
        }
    }

    #[test]
    fn month_round_trip_may_shift_day_of_month() {
        let active = NaiveDate::from_ymd_opt(2016, 1, 31)
            .expect("valid date")
            .and_hms_opt(9, 0, 0)
            .expect("valid time");
        let mut cal = CalendarController::new(EventStore::new(), CalendarConfig::default())
            .with_active_date(active);
        cal.set_view("month").expect("valid view");

        cal.next();
        cal.prev();
        assert_eq!(
            cal.active_date().date(),
            NaiveDate::from_ymd_opt(2016, 1, 29).expect("valid date")
        );
    }

    #[test]
    fn switching_view_rederives_range() {
        let start = NaiveDate::from_ymd_opt(2016, 9, 22)
            .expect("valid date")
            .and_hms_opt(4, 0, 0)
            .expect("valid time");
        let end = NaiveDate::from_ymd_opt(2016, 9, 22)
            .expect("valid date")
            .and_hms_opt(6, 0, 0)
            .expect("valid time");
        let event = Event::new(EventId::Int(1), "1", start, end).expect("valid event");
        let store = EventStore::with_events(vec![event]).expect("valid events");

        let mut cal = CalendarController::new(store, CalendarConfig::default())
            .with_active_date(start);
        cal.set_view("day").expect("valid view");
        assert_eq!(cal.view_range().expect("range").granularity, ViewKind::Day);
        assert_eq!(cal.layout().expect("layout").len(), 1);

        cal.set_view("year").expect("valid view");
        assert_eq!(cal.view_range().expect("range").granularity, ViewKind::Year);
        assert!(cal.layout().expect("layout").is_empty());
    }
}
