//! Per-event geometry for the day-grid and month-pill views.
//!
//! All vertical math is minutes-since-midnight times slot height; the
//! visible hour range is a scroll window used for exclusion, not a shift of
//! the origin. Horizontal placement is percent-of-column-area derived from
//! the column slot.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

use crate::breakpoint::ViewParams;
use crate::cluster::group_overlapping;
use crate::columns::assign_columns;
use crate::event::{project_onto_day, DaySpan, LayoutEvent};

/// Fixed row pitch of a month cell stack, in pixels.
pub const MONTH_ROW_HEIGHT: f32 = 22.0;
/// Fixed pill height inside a month row, in pixels.
pub const MONTH_PILL_HEIGHT: f32 = 18.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "kebab-case")]
pub enum ViewKind {
    DayGrid,
    MonthPill,
}

impl ViewKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKind::DayGrid => "day-grid",
            ViewKind::MonthPill => "month-pill",
        }
    }
}

/// Pixel/percent box for one timed event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventGeometry {
    pub top: f32,
    pub height: f32,
    pub left_pct: f32,
    pub width_pct: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedEvent {
    pub id: String,
    pub geometry: EventGeometry,
    pub column: usize,
    pub column_count: usize,
    /// Set when the event wrapped past the column maximum; the renderer
    /// shows it as part of a "+N more" indicator instead of a full box.
    pub overflow: bool,
}

/// Stacked all-day chips for one day, capped at the display maximum.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllDayRow {
    pub visible: Vec<String>,
    pub more: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NowIndicator {
    pub top: f32,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthPill {
    pub id: String,
    pub row: usize,
    pub top: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthCell {
    pub date: NaiveDate,
    pub pills: Vec<MonthPill>,
    /// Events beyond `month_max_display`, summarized rather than dropped.
    pub more: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayoutBody {
    DayGrid {
        timed: Vec<PositionedEvent>,
        all_day: AllDayRow,
        now: NowIndicator,
    },
    MonthPills {
        cells: Vec<MonthCell>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    pub body: LayoutBody,
    /// Ids of records skipped during normalization.
    pub skipped: Vec<String>,
    pub layout_version: u64,
    pub computed_at_ms: u64,
}

impl LayoutResult {
    /// Sanity check applied on every cache read: a stored result with
    /// non-finite geometry is treated as undecodable and recomputed.
    pub fn is_well_formed(&self) -> bool {
        match &self.body {
            LayoutBody::DayGrid { timed, now, .. } => {
                now.top.is_finite()
                    && timed.iter().all(|p| {
                        p.geometry.top.is_finite()
                            && p.geometry.height.is_finite()
                            && p.geometry.left_pct.is_finite()
                            && p.geometry.width_pct.is_finite()
                    })
            }
            LayoutBody::MonthPills { cells } => cells
                .iter()
                .flat_map(|cell| cell.pills.iter())
                .all(|pill| pill.top.is_finite() && pill.height.is_finite()),
        }
    }
}

fn minute_to_y(minute: i64, params: &ViewParams) -> f32 {
    minute as f32 / 60.0 * params.slot_height
}

/// Timed spans for one day, with events wholly outside the visible hour
/// window excluded from layout entirely.
fn visible_spans(events: &[LayoutEvent], date: NaiveDate, params: &ViewParams) -> Vec<DaySpan> {
    events
        .iter()
        .enumerate()
        .filter_map(|(index, event)| {
            project_onto_day(event, index, date, params.min_duration_minutes)
        })
        .filter(|span| {
            span.start_minute < params.visible_end_minute()
                && span.display_end_minute > params.visible_start_minute()
        })
        .collect()
}

/// Lay out one day column: overlap clusters, column slots, pixel geometry.
#[profiling::function]
pub fn day_grid(
    events: &[LayoutEvent],
    date: NaiveDate,
    params: &ViewParams,
    now: NaiveDateTime,
) -> LayoutBody {
    let spans = visible_spans(events, date, params);
    let clusters = group_overlapping(&spans);

    let mut timed = Vec::with_capacity(spans.len());
    for cluster in &clusters {
        for (span_index, slot) in assign_columns(cluster, params.max_columns) {
            let span = &spans[span_index];
            let width_pct = 100.0 / slot.column_count as f32;
            timed.push(PositionedEvent {
                id: events[span.event].id.clone(),
                geometry: EventGeometry {
                    top: minute_to_y(span.start_minute, params),
                    height: minute_to_y(span.display_end_minute - span.start_minute, params),
                    left_pct: slot.column as f32 * width_pct,
                    width_pct,
                },
                column: slot.column,
                column_count: slot.column_count,
                overflow: slot.overflow,
            });
        }
    }

    LayoutBody::DayGrid {
        timed,
        all_day: all_day_row(events, date, params),
        now: now_indicator(now, date, params),
    }
}

/// The non-overlapping all-day chip row for one day.
fn all_day_row(events: &[LayoutEvent], date: NaiveDate, params: &ViewParams) -> AllDayRow {
    let mut chips: Vec<(NaiveDateTime, usize)> = events
        .iter()
        .enumerate()
        .filter(|(_, event)| event.all_day && event.occurs_on(date))
        .map(|(index, event)| (event.start_utc, index))
        .collect();
    chips.sort();

    let display = chips.len().min(params.all_day_max_display);
    AllDayRow {
        visible: chips[..display]
            .iter()
            .map(|&(_, index)| events[index].id.clone())
            .collect(),
        more: chips.len() - display,
    }
}

/// Current-time marker, mapped with the same vertical math as events.
pub fn now_indicator(now: NaiveDateTime, date: NaiveDate, params: &ViewParams) -> NowIndicator {
    if now.date() != date {
        return NowIndicator {
            top: 0.0,
            visible: false,
        };
    }

    let minute = i64::from(now.time().hour()) * 60 + i64::from(now.time().minute());
    NowIndicator {
        top: minute_to_y(minute, params),
        visible: minute >= params.visible_start_minute() && minute < params.visible_end_minute(),
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let first_next = NaiveDate::from_ymd_opt(next_year, next_month, 1).expect("valid month start");
    (first_next - Duration::days(1)).day()
}

/// Lay out the month view: one cell per day of the focus month, each a
/// fixed-pitch pill stack truncated at `month_max_display` with an
/// overflow count.
#[profiling::function]
pub fn month_pills(events: &[LayoutEvent], focus: NaiveDate, params: &ViewParams) -> LayoutBody {
    let year = focus.year();
    let month = focus.month();

    let mut cells = Vec::with_capacity(31);
    for day in 1..=days_in_month(year, month) {
        let date = NaiveDate::from_ymd_opt(year, month, day).expect("valid day of month");

        let mut on_day: Vec<(NaiveDateTime, usize)> = events
            .iter()
            .enumerate()
            .filter(|(_, event)| event.occurs_on(date))
            .map(|(index, event)| (event.start_utc, index))
            .collect();
        on_day.sort();

        let display = on_day.len().min(params.month_max_display);
        let pills = on_day[..display]
            .iter()
            .enumerate()
            .map(|(row, &(_, index))| MonthPill {
                id: events[index].id.clone(),
                row,
                top: row as f32 * MONTH_ROW_HEIGHT,
                height: MONTH_PILL_HEIGHT,
            })
            .collect();

        cells.push(MonthCell {
            date,
            pills,
            more: on_day.len() - display,
        });
    }

    LayoutBody::MonthPills { cells }
}
