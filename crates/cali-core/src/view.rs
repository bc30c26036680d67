use chrono::{Datelike, Duration, NaiveDateTime, Timelike};
use tracing::debug;

use crate::config::{CalendarConfig, Locale};
use crate::datetime;
use crate::error::CalendarError;
use crate::event::ClippedEvent;
use crate::overlap::{LaneAssignment, assign_lanes};
use crate::store::EventStore;

/// The closed set of view granularities. Everything
/// granularity-specific is a match in the free functions below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Day,
    Week,
    Month,
    Year,
}

impl ViewKind {
    pub const ALL: [ViewKind; 4] =
        [ViewKind::Day, ViewKind::Week, ViewKind::Month, ViewKind::Year];

    pub fn parse(name: &str) -> Result<Self, CalendarError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(ViewKind::Day),
            "week" => Ok(ViewKind::Week),
            "month" => Ok(ViewKind::Month),
            "year" => Ok(ViewKind::Year),
            _ => Err(CalendarError::UnsupportedViewType {
                name: name.to_string(),
            }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ViewKind::Day => "day",
            ViewKind::Week => "week",
            ViewKind::Month => "month",
            ViewKind::Year => "year",
        }
    }
}

/// Visible range derived from `(active_date, granularity)`. Bounds are
/// inclusive; the end carries the 23:59:59 day-end convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub granularity: ViewKind,
}

pub fn view_range(kind: ViewKind, active: NaiveDateTime) -> ViewRange {
    let date = active.date();
    let (start, end) = match kind {
        ViewKind::Day => (date, date),
        ViewKind::Week => (datetime::week_start(date), datetime::week_end(date)),
        ViewKind::Month => (datetime::month_start(date), datetime::month_end(date)),
        ViewKind::Year => (datetime::year_start(date), datetime::year_end(date)),
    };
    ViewRange {
        start: datetime::day_start(start),
        end: datetime::day_end(end),
        granularity: kind,
    }
}

pub fn view_title(kind: ViewKind, active: NaiveDateTime, locale: &Locale) -> String {
    let date = active.date();
    match kind {
        ViewKind::Day => datetime::format_date(date, "D MMMM", locale),
        ViewKind::Week => format!(
            "{} - {}",
            datetime::format_date(datetime::week_start(date), "D MMM", locale),
            datetime::format_date(datetime::week_end(date), "D MMM", locale)
        ),
        ViewKind::Month => datetime::format_date(date, "MMMM YYYY", locale),
        ViewKind::Year => date.year().to_string(),
    }
}

/// Granularity-specific navigation step. Month stepping is
/// calendar-aware with the day clamped; year stepping is a literal
/// 365 days, neither leap-year- nor calendar-year-aware.
pub fn step(kind: ViewKind, active: NaiveDateTime, steps: i64) -> NaiveDateTime {
    match kind {
        ViewKind::Day => shift_days(active, steps),
        ViewKind::Week => shift_days(active, 7 * steps),
        ViewKind::Month => {
            datetime::add_months(active.date(), steps as i32).and_time(active.time())
        }
        ViewKind::Year => shift_days(active, 365 * steps),
    }
}

fn shift_days(active: NaiveDateTime, days: i64) -> NaiveDateTime {
    active
        .checked_add_signed(Duration::days(days))
        .unwrap_or(active)
}

/// Layout instructions for one visible event (or event segment). Pure
/// data; the renderer owns all painting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    /// Day and week views: a block in a day column.
    TimeSlot {
        /// Day-of-week column, 0 in the day view.
        day_column: u32,
        /// Pixel offset from the grid top, per the half-hour row
        /// height.
        top: f32,
        /// Pixel height; `None` in the day view when the authored
        /// event crosses a day boundary (such events are not split
        /// there and run open-ended).
        height: Option<f32>,
        /// Share of the column width, `1 / (1 + max_lane)` when the
        /// run is congested, full width otherwise.
        width_fraction: f32,
        /// Offset into the column in column-width fractions.
        inset_fraction: f32,
        /// Which side `inset_fraction` is measured from.
        from_right: bool,
        /// Pixels reserved at the grid edge for the hour gutter. The
        /// week view's column width is `(total - gutter_px) / 7`
        /// before `width_fraction` applies; zero in the day view,
        /// whose single column spans the full row.
        gutter_px: f32,
    },
    /// Month view: one horizontal bar per week row the event touches.
    MonthBar {
        week_row: u32,
        start_col: u32,
        span_cols: u32,
        /// Vertical offset within the cell, one row height per lane.
        top: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutItem {
    pub event: ClippedEvent,
    pub lane: LaneAssignment,
    pub geometry: Geometry,
}

/// Derives the full layout for one view: range, filtered query, lane
/// assignment, geometry. Recomputed from scratch on every call.
#[tracing::instrument(skip(store, cfg), fields(view = kind.name()))]
pub fn layout(
    kind: ViewKind,
    active: NaiveDateTime,
    store: &EventStore,
    cfg: &CalendarConfig,
) -> Vec<LayoutItem> {
    let range = view_range(kind, active);
    let clipped = store.query(&range);

    let items = match kind {
        ViewKind::Day => layout_day(clipped, cfg),
        ViewKind::Week => layout_week(clipped, &range, cfg),
        ViewKind::Month => layout_month(clipped, &range, cfg),
        // rendering-only placeholder, no per-event layout
        ViewKind::Year => Vec::new(),
    };

    debug!(items = items.len(), "derived layout");
    items
}

fn slot_top(start: NaiveDateTime, cfg: &CalendarConfig) -> f32 {
    let hour = start.hour() as f32 + start.minute() as f32 / 60.0;
    hour * cfg.row_height * 2.0 + cfg.row_height
}

fn slot_height(ev: &ClippedEvent, cfg: &CalendarConfig) -> f32 {
    let hours = ev.duration().num_minutes() as f32 / 60.0;
    hours * cfg.row_height * 2.0
}

fn lane_fractions(lane: LaneAssignment, max_lane: u32) -> (f32, f32) {
    let width_fraction = if lane.concurrency > 0 {
        1.0 / (1.0 + max_lane as f32)
    } else {
        1.0
    };
    (width_fraction, lane.lane as f32 * width_fraction)
}

fn layout_day(clipped: Vec<ClippedEvent>, cfg: &CalendarConfig) -> Vec<LayoutItem> {
    let (lanes, max_lane) = assign_lanes(&clipped);

    clipped
        .into_iter()
        .zip(lanes)
        .map(|(ev, lane)| {
            let (width_fraction, inset_fraction) = lane_fractions(lane, max_lane);
            // multi-day events are not split in the day view and get
            // no height rule
            let height = ev.event.is_single_day().then(|| slot_height(&ev, cfg));
            let geometry = Geometry::TimeSlot {
                day_column: 0,
                top: slot_top(ev.start, cfg),
                height,
                width_fraction,
                inset_fraction,
                from_right: cfg.right_to_left,
                gutter_px: 0.0,
            };
            LayoutItem { event: ev, lane, geometry }
        })
        .collect()
}

fn layout_week(
    clipped: Vec<ClippedEvent>,
    range: &ViewRange,
    cfg: &CalendarConfig,
) -> Vec<LayoutItem> {
    let segments = split_into_day_segments(clipped, range);
    let (lanes, max_lane) = assign_lanes(&segments);

    segments
        .into_iter()
        .zip(lanes)
        .map(|(seg, lane)| {
            let (width_fraction, inset_fraction) = lane_fractions(lane, max_lane);
            let geometry = Geometry::TimeSlot {
                day_column: seg.start.weekday().num_days_from_sunday(),
                top: slot_top(seg.start, cfg),
                height: Some(slot_height(&seg, cfg)),
                width_fraction,
                inset_fraction,
                from_right: cfg.right_to_left,
                gutter_px: cfg.end_margin,
            };
            LayoutItem { event: seg, lane, geometry }
        })
        .collect()
}

/// Splits multi-day events into one segment per day column, stopping
/// at the earlier of the event end and the week end. Continuation
/// segments start a minute past midnight so consecutive segments of
/// one event never register as overlapping each other.
fn split_into_day_segments(clipped: Vec<ClippedEvent>, range: &ViewRange) -> Vec<ClippedEvent> {
    let mut out = Vec::new();

    for ev in clipped {
        if ev.start.date() == ev.end.date() {
            out.push(ev);
            continue;
        }

        let last_day = ev.end.date().min(range.end.date());
        let mut day = ev.start.date();
        let mut seg_start = ev.start;
        while day <= last_day {
            let seg_end = ev.end.min(datetime::day_end(day));
            if seg_start <= seg_end {
                out.push(ev.segment(seg_start, seg_end));
            }

            let Some(next) = day.checked_add_signed(Duration::days(1)) else {
                break;
            };
            day = next;
            seg_start = datetime::day_start(day) + Duration::minutes(1);
        }
    }

    // re-establish the store sort order over the segment batch before
    // lane assignment
    out.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| b.duration().cmp(&a.duration()))
    });
    out
}

fn layout_month(
    clipped: Vec<ClippedEvent>,
    range: &ViewRange,
    cfg: &CalendarConfig,
) -> Vec<LayoutItem> {
    let (lanes, _) = assign_lanes(&clipped);
    let grid_origin = datetime::week_start(range.start.date());

    let mut items = Vec::new();
    for (ev, lane) in clipped.iter().zip(lanes) {
        let end_date = ev.end.date();
        let mut bar_start = ev.start.date();

        // one bar per week row; a bar crossing the week boundary is
        // cut there and the remainder restarts from the next week
        loop {
            let week_close = datetime::week_end(bar_start);
            let bar_end = end_date.min(week_close);
            let week_row =
                (bar_start.signed_duration_since(grid_origin).num_days() / 7) as u32;
            let start_col = bar_start.weekday().num_days_from_sunday();
            let end_col = bar_end.weekday().num_days_from_sunday();

            items.push(LayoutItem {
                event: ev.clone(),
                lane,
                geometry: Geometry::MonthBar {
                    week_row,
                    start_col,
                    span_cols: end_col - start_col + 1,
                    top: lane.lane as f32 * cfg.month_row_height,
                },
            });

            if bar_end >= end_date {
                break;
            }
            let Some(next) = week_close.checked_add_signed(Duration::days(1)) else {
                break;
            };
            bar_start = next;
        }
    }

    items
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::config::CalendarConfig;
    use crate::event::{Event, EventId};
    use crate::store::EventStore;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2016, 9, day)
            .expect("valid date")
            .and_hms_opt(hour, minute, 0)
            .expect("valid time")
    }

    fn event(id: i64, start: NaiveDateTime, end: NaiveDateTime) -> Event {
        Event::new(EventId::Int(id), id.to_string(), start, end).expect("valid event")
    }

    fn store_of(events: Vec<Event>) -> EventStore {
        EventStore::with_events(events).expect("valid events")
    }

    #[test]
    fn ranges_per_granularity() {
        let active = at(22, 12, 30);

        let day = view_range(ViewKind::Day, active);
        assert_eq!(day.start, at(22, 0, 0));
        assert_eq!(day.end, NaiveDate::from_ymd_opt(2016, 9, 22).unwrap().and_hms_opt(23, 59, 59).unwrap());

        let week = view_range(ViewKind::Week, active);
        assert_eq!(week.start.date(), NaiveDate::from_ymd_opt(2016, 9, 18).unwrap());
        assert_eq!(week.end.date(), NaiveDate::from_ymd_opt(2016, 9, 24).unwrap());

        let month = view_range(ViewKind::Month, active);
        assert_eq!(month.start.date(), NaiveDate::from_ymd_opt(2016, 9, 1).unwrap());
        assert_eq!(month.end.date(), NaiveDate::from_ymd_opt(2016, 9, 30).unwrap());

        let year = view_range(ViewKind::Year, active);
        assert_eq!(year.start.date(), NaiveDate::from_ymd_opt(2016, 1, 1).unwrap());
        assert_eq!(year.end.date(), NaiveDate::from_ymd_opt(2016, 12, 31).unwrap());
    }

    #[test]
    fn titles_per_granularity() {
        let locale = crate::config::Locale::default();
        let active = at(22, 12, 0);

        assert_eq!(view_title(ViewKind::Day, active, &locale), "22 September");
        assert_eq!(view_title(ViewKind::Week, active, &locale), "18 Sep - 24 Sep");
        assert_eq!(view_title(ViewKind::Month, active, &locale), "September 2016");
        assert_eq!(view_title(ViewKind::Year, active, &locale), "2016");
    }

    #[test]
    fn step_sizes_per_granularity() {
        let active = at(22, 12, 0);

        assert_eq!(step(ViewKind::Day, active, 1).date().day(), 23);
        assert_eq!(step(ViewKind::Week, active, -1).date().day(), 15);
        assert_eq!(
            step(ViewKind::Month, active, 1).date(),
            NaiveDate::from_ymd_opt(2016, 10, 22).unwrap()
        );
    }

    #[test]
    fn year_step_is_a_literal_365_days() {
        // crosses the 2016 leap day, so the anniversary is missed by
        // one day
        let active = NaiveDate::from_ymd_opt(2015, 9, 22)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        assert_eq!(
            step(ViewKind::Year, active, 1).date(),
            NaiveDate::from_ymd_opt(2016, 9, 21).unwrap()
        );
    }

    #[test]
    fn month_step_clamps_day_of_month() {
        let active = NaiveDate::from_ymd_opt(2016, 1, 31)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let forward = step(ViewKind::Month, active, 1);
        assert_eq!(forward.date(), NaiveDate::from_ymd_opt(2016, 2, 29).unwrap());

        // the round trip does not restore the day of month
        let back = step(ViewKind::Month, forward, -1);
        assert_eq!(back.date(), NaiveDate::from_ymd_opt(2016, 1, 29).unwrap());
    }

    #[test]
    fn week_lane_scenario() {
        // A Mon 05-07, B Mon 06-07, C Tue 04-05; active in the same
        // week (Sunday start)
        let store = store_of(vec![
            event(1, at(19, 5, 0), at(19, 7, 0)),
            event(2, at(19, 6, 0), at(19, 7, 0)),
            event(3, at(20, 4, 0), at(20, 5, 0)),
        ]);
        let cfg = CalendarConfig::default();
        let items = layout(ViewKind::Week, at(22, 12, 0), &store, &cfg);

        let ids: Vec<String> = items.iter().map(|i| i.event.event.id.to_string()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);

        assert_eq!(items[0].lane.lane, 0);
        assert_eq!(items[1].lane.lane, 1);
        assert_eq!(items[2].lane.lane, 0);
        assert_eq!(items[2].lane.concurrency, 0);

        // congested run divides the column, the lone event does not
        let Geometry::TimeSlot { width_fraction, inset_fraction, day_column, .. } =
            items[1].geometry
        else {
            panic!("expected a time slot");
        };
        assert_eq!(day_column, 1);
        assert_eq!(width_fraction, 0.5);
        assert_eq!(inset_fraction, 0.5);

        let Geometry::TimeSlot { width_fraction, .. } = items[2].geometry else {
            panic!("expected a time slot");
        };
        assert_eq!(width_fraction, 1.0);
    }

    #[test]
    fn week_splits_multi_day_event_per_day() {
        // Mon 22:00 -> Wed 02:00 becomes three segments
        let store = store_of(vec![event(1, at(19, 22, 0), at(21, 2, 0))]);
        let cfg = CalendarConfig::default();
        let items = layout(ViewKind::Week, at(22, 12, 0), &store, &cfg);

        assert_eq!(items.len(), 3);

        assert_eq!(items[0].event.start, at(19, 22, 0));
        assert_eq!(items[0].event.end.date().day(), 19);

        assert_eq!(items[1].event.start, at(20, 0, 1));
        assert_eq!(items[1].event.end.date().day(), 20);

        assert_eq!(items[2].event.start, at(21, 0, 1));
        assert_eq!(items[2].event.end, at(21, 2, 0));

        let cols: Vec<u32> = items
            .iter()
            .map(|i| match i.geometry {
                Geometry::TimeSlot { day_column, .. } => day_column,
                Geometry::MonthBar { .. } => panic!("expected time slots"),
            })
            .collect();
        assert_eq!(cols, vec![1, 2, 3]);
    }

    #[test]
    fn week_split_stops_at_week_end() {
        // Friday -> next Tuesday only yields Fri and Sat segments in
        // this week's view
        let store = store_of(vec![event(1, at(23, 20, 0), at(27, 4, 0))]);
        let cfg = CalendarConfig::default();
        let items = layout(ViewKind::Week, at(22, 12, 0), &store, &cfg);

        assert_eq!(items.len(), 2);
        assert_eq!(items[1].event.start.date().day(), 24);
    }

    #[test]
    fn week_columns_reserve_the_end_margin() {
        let store = store_of(vec![event(1, at(22, 5, 0), at(22, 7, 0))]);

        let narrow = CalendarConfig::default();
        let wide = CalendarConfig {
            end_margin: 400.0,
            ..CalendarConfig::default()
        };

        let narrow_items = layout(ViewKind::Week, at(22, 12, 0), &store, &narrow);
        let wide_items = layout(ViewKind::Week, at(22, 12, 0), &store, &wide);
        assert_ne!(narrow_items, wide_items);

        let Geometry::TimeSlot { gutter_px, .. } = narrow_items[0].geometry else {
            panic!("expected a time slot");
        };
        assert_eq!(gutter_px, 50.0);
        let Geometry::TimeSlot { gutter_px, .. } = wide_items[0].geometry else {
            panic!("expected a time slot");
        };
        assert_eq!(gutter_px, 400.0);

        // the day view's lone column has no gutter to subtract
        let day_items = layout(ViewKind::Day, at(22, 12, 0), &store, &wide);
        let Geometry::TimeSlot { gutter_px, .. } = day_items[0].geometry else {
            panic!("expected a time slot");
        };
        assert_eq!(gutter_px, 0.0);
    }

    #[test]
    fn day_geometry_formula() {
        let store = store_of(vec![event(1, at(22, 5, 0), at(22, 7, 0))]);
        let cfg = CalendarConfig::default();
        let items = layout(ViewKind::Day, at(22, 12, 0), &store, &cfg);

        assert_eq!(items.len(), 1);
        let Geometry::TimeSlot { top, height, day_column, .. } = items[0].geometry else {
            panic!("expected a time slot");
        };
        // (5h * 25 * 2) + 25 header row
        assert_eq!(day_column, 0);
        assert_eq!(top, 275.0);
        assert_eq!(height, Some(100.0));
    }

    #[test]
    fn day_view_leaves_multi_day_events_open_ended() {
        let store = store_of(vec![event(1, at(22, 20, 0), at(23, 6, 0))]);
        let cfg = CalendarConfig::default();
        let items = layout(ViewKind::Day, at(22, 12, 0), &store, &cfg);

        assert_eq!(items.len(), 1);
        let Geometry::TimeSlot { height, .. } = items[0].geometry else {
            panic!("expected a time slot");
        };
        assert_eq!(height, None);
    }

    #[test]
    fn rtl_flag_flows_into_geometry() {
        let store = store_of(vec![event(1, at(22, 5, 0), at(22, 7, 0))]);
        let cfg = CalendarConfig {
            right_to_left: true,
            ..CalendarConfig::default()
        };
        let items = layout(ViewKind::Day, at(22, 12, 0), &store, &cfg);

        let Geometry::TimeSlot { from_right, .. } = items[0].geometry else {
            panic!("expected a time slot");
        };
        assert!(from_right);
    }

    #[test]
    fn month_bars_split_at_week_rows() {
        // Sat 04:00 -> Mon 04:00 crosses a week boundary: one bar for
        // Saturday, one for Sunday-Monday of the next row
        let store = store_of(vec![event(1, at(24, 4, 0), at(26, 4, 0))]);
        let cfg = CalendarConfig::default();
        let items = layout(ViewKind::Month, at(22, 12, 0), &store, &cfg);

        assert_eq!(items.len(), 2);

        let Geometry::MonthBar { week_row, start_col, span_cols, .. } = items[0].geometry else {
            panic!("expected a month bar");
        };
        assert_eq!((week_row, start_col, span_cols), (3, 6, 1));

        let Geometry::MonthBar { week_row, start_col, span_cols, .. } = items[1].geometry else {
            panic!("expected a month bar");
        };
        assert_eq!((week_row, start_col, span_cols), (4, 0, 2));
    }

    #[test]
    fn month_bars_stack_by_lane() {
        let store = store_of(vec![
            event(1, at(26, 4, 0), at(26, 6, 0)),
            event(2, at(26, 4, 0), at(26, 5, 0)),
        ]);
        let cfg = CalendarConfig::default();
        let items = layout(ViewKind::Month, at(22, 12, 0), &store, &cfg);

        assert_eq!(items.len(), 2);
        let Geometry::MonthBar { top, .. } = items[0].geometry else {
            panic!("expected a month bar");
        };
        assert_eq!(top, 0.0);
        let Geometry::MonthBar { top, .. } = items[1].geometry else {
            panic!("expected a month bar");
        };
        assert_eq!(top, 25.0);
    }

    #[test]
    fn year_layout_is_empty() {
        let store = store_of(vec![event(1, at(22, 5, 0), at(22, 7, 0))]);
        let cfg = CalendarConfig::default();
        assert!(layout(ViewKind::Year, at(22, 12, 0), &store, &cfg).is_empty());
    }

    #[test]
    fn parse_rejects_unknown_view_name() {
        let err = ViewKind::parse("bogus").expect_err("must reject");
        assert_eq!(
            err,
            CalendarError::UnsupportedViewType {
                name: "bogus".to_string()
            }
        );
        assert_eq!(ViewKind::parse("Week").expect("case-insensitive"), ViewKind::Week);
    }
}
