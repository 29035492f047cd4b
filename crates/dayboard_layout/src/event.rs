//! Boundary event records and normalization.
//!
//! The dashboard shell hands the engine plain event records decoded from its
//! event source. Everything here turns those records into the fixed internal
//! representation the layout passes operate on: records without a usable
//! start are skipped with a warning, ends are clamped to their starts, and
//! timed events are projected onto grid days as minute spans.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A calendar event as supplied by the event source.
///
/// `start` and `end` are Unix timestamps in seconds. `end` defaults to
/// `start` when absent (a zero-duration event). A record without a `start`
/// is not a layoutable event and is skipped during normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub start: Option<i64>,
    #[serde(default)]
    pub end: Option<i64>,
    #[serde(default)]
    pub all_day: bool,
    /// Calendar source tag ("personal", "work", ...).
    #[serde(default)]
    pub calendar: String,
    #[serde(default)]
    pub title: String,
}

/// Decode a JSON array of event records.
///
/// This is a convenience for shells that hold the event list as a JSON
/// document; anything that already has `EventRecord`s can skip it.
pub fn records_from_json(json: &str) -> Result<Vec<EventRecord>, serde_json::Error> {
    serde_json::from_str(json)
}

/// A validated event, immutable for the duration of a layout pass.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutEvent {
    pub id: String,
    pub title: String,
    pub calendar: String,
    pub all_day: bool,
    pub start_utc: NaiveDateTime,
    /// Clamped to be >= `start_utc`.
    pub end_utc: NaiveDateTime,
}

impl LayoutEvent {
    /// Validates and normalizes a boundary record.
    ///
    /// Returns `None` for records without a start or with timestamps
    /// outside the representable range; both cases are logged.
    pub fn from_record(record: &EventRecord) -> Option<Self> {
        let Some(start_ts) = record.start else {
            warn!("Layout: skipping event {:?}: no start time", record.id);
            return None;
        };

        let Some(start_utc) = DateTime::from_timestamp(start_ts, 0).map(|dt| dt.naive_utc())
        else {
            warn!(
                "Layout: skipping event {:?}: start {} out of range",
                record.id, start_ts
            );
            return None;
        };

        let end_utc = match record.end {
            Some(end_ts) => match DateTime::from_timestamp(end_ts, 0) {
                Some(dt) => {
                    let end = dt.naive_utc();
                    if end < start_utc {
                        start_utc
                    } else {
                        end
                    }
                }
                None => {
                    warn!(
                        "Layout: event {:?}: end {} out of range, using start",
                        record.id, end_ts
                    );
                    start_utc
                }
            },
            None => start_utc,
        };

        Some(LayoutEvent {
            id: record.id.clone(),
            title: record.title.clone(),
            calendar: record.calendar.clone(),
            all_day: record.all_day,
            start_utc,
            end_utc,
        })
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_utc - self.start_utc).num_minutes()
    }

    /// Whether the event touches the given date.
    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        let (start_date, end_date) = self.date_span();
        date >= start_date && date <= end_date
    }

    pub fn date_span(&self) -> (NaiveDate, NaiveDate) {
        let start_date = self.start_utc.date();
        let mut end_date = self.end_utc.date();
        if end_date < start_date {
            end_date = start_date;
        }
        (start_date, end_date)
    }
}

/// Normalize a batch of records, returning the valid events and the ids of
/// the skipped ones. Skips are never fatal.
pub fn normalize_events(records: &[EventRecord]) -> (Vec<LayoutEvent>, Vec<String>) {
    let mut events = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();

    for record in records {
        match LayoutEvent::from_record(record) {
            Some(event) => events.push(event),
            None => skipped.push(record.id.clone()),
        }
    }

    (events, skipped)
}

/// A timed event projected onto a single grid day, in minutes since that
/// day's midnight.
///
/// `display_end_minute` is the end used for layout: floored so that
/// zero-duration and sub-threshold events render with a minimum height.
/// The stored event data is never modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DaySpan {
    /// Index into the event list the span was projected from.
    pub event: usize,
    pub start_minute: i64,
    pub end_minute: i64,
    pub display_end_minute: i64,
}

pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Project a timed event onto one grid day.
///
/// Events spanning midnight are clipped: 0 at the start boundary, end of
/// day at the end boundary. Returns `None` for all-day events and events
/// that do not touch the day at all.
pub fn project_onto_day(
    event: &LayoutEvent,
    index: usize,
    date: NaiveDate,
    min_duration_minutes: i64,
) -> Option<DaySpan> {
    if event.all_day {
        return None;
    }

    let day_start = date.and_time(NaiveTime::MIN);
    let day_end = day_start + Duration::days(1);

    if event.start_utc >= day_end {
        return None;
    }
    // Half-open interval: an event ending exactly at midnight belongs to the
    // previous day, unless it is a zero-duration event at that midnight.
    if event.end_utc <= day_start && event.start_utc < day_start {
        return None;
    }

    let start_minute = if event.start_utc <= day_start {
        0
    } else {
        (event.start_utc - day_start).num_minutes()
    };

    let end_minute = if event.end_utc >= day_end {
        MINUTES_PER_DAY
    } else {
        (event.end_utc - day_start).num_minutes()
    };

    let display_end_minute = end_minute
        .max(start_minute + min_duration_minutes)
        .min(MINUTES_PER_DAY)
        .max(start_minute + 1);

    Some(DaySpan {
        event: index,
        start_minute,
        end_minute,
        display_end_minute,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(date: &str, time: &str) -> i64 {
        let dt = NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M")
            .unwrap()
            .and_utc();
        dt.timestamp()
    }

    fn record(id: &str, start: &str, end: Option<&str>) -> EventRecord {
        EventRecord {
            id: id.to_owned(),
            start: Some(ts("2026-03-02", start)),
            end: end.map(|e| ts("2026-03-02", e)),
            all_day: false,
            calendar: "personal".to_owned(),
            title: id.to_owned(),
        }
    }

    #[test]
    fn test_missing_start_is_skipped() {
        let records = vec![
            record("a", "09:00", Some("10:00")),
            EventRecord {
                id: "broken".to_owned(),
                ..Default::default()
            },
        ];

        let (events, skipped) = normalize_events(&records);
        assert_eq!(events.len(), 1);
        assert_eq!(skipped, vec!["broken".to_owned()]);
    }

    #[test]
    fn test_end_clamped_to_start() {
        let rec = EventRecord {
            id: "inverted".to_owned(),
            start: Some(ts("2026-03-02", "10:00")),
            end: Some(ts("2026-03-02", "09:00")),
            ..Default::default()
        };

        let event = LayoutEvent::from_record(&rec).unwrap();
        assert_eq!(event.start_utc, event.end_utc);
        assert_eq!(event.duration_minutes(), 0);
    }

    #[test]
    fn test_missing_end_means_zero_duration() {
        let event = LayoutEvent::from_record(&record("a", "09:00", None)).unwrap();
        assert_eq!(event.duration_minutes(), 0);
    }

    #[test]
    fn test_projection_basic() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let event = LayoutEvent::from_record(&record("a", "09:00", Some("10:30"))).unwrap();

        let span = project_onto_day(&event, 0, day, 30).unwrap();
        assert_eq!(span.start_minute, 9 * 60);
        assert_eq!(span.end_minute, 10 * 60 + 30);
        assert_eq!(span.display_end_minute, 10 * 60 + 30);
    }

    #[test]
    fn test_projection_floors_zero_duration() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let event = LayoutEvent::from_record(&record("a", "14:00", None)).unwrap();

        let span = project_onto_day(&event, 0, day, 30).unwrap();
        assert_eq!(span.end_minute, 14 * 60);
        assert_eq!(span.display_end_minute, 14 * 60 + 30);
    }

    #[test]
    fn test_projection_clips_at_midnight() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let next = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();
        let rec = EventRecord {
            id: "overnight".to_owned(),
            start: Some(ts("2026-03-02", "22:00")),
            end: Some(ts("2026-03-03", "02:00")),
            ..Default::default()
        };
        let event = LayoutEvent::from_record(&rec).unwrap();

        let first = project_onto_day(&event, 0, day, 30).unwrap();
        assert_eq!(first.start_minute, 22 * 60);
        assert_eq!(first.end_minute, MINUTES_PER_DAY);

        let second = project_onto_day(&event, 0, next, 30).unwrap();
        assert_eq!(second.start_minute, 0);
        assert_eq!(second.end_minute, 2 * 60);
    }

    #[test]
    fn test_projection_excludes_other_days() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();
        let event = LayoutEvent::from_record(&record("a", "09:00", Some("10:00"))).unwrap();
        assert!(project_onto_day(&event, 0, day, 30).is_none());
    }

    #[test]
    fn test_projection_skips_all_day() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let mut rec = record("a", "09:00", Some("10:00"));
        rec.all_day = true;
        let event = LayoutEvent::from_record(&rec).unwrap();
        assert!(project_onto_day(&event, 0, day, 30).is_none());
    }

    #[test]
    fn test_floor_clamped_at_end_of_day() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let event = LayoutEvent::from_record(&record("late", "23:45", None)).unwrap();

        let span = project_onto_day(&event, 0, day, 30).unwrap();
        assert_eq!(span.display_end_minute, MINUTES_PER_DAY);
    }

    #[test]
    fn test_records_from_json() {
        let json = r#"[
            {"id": "a", "start": 1767351600, "title": "standup"},
            {"id": "b", "title": "no start at all"}
        ]"#;
        let records = records_from_json(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "a");
        assert!(!records[0].all_day);
        // A record without a start still decodes; it is skipped later, at
        // normalization, rather than poisoning the whole batch.
        assert_eq!(records[1].start, None);
    }

    #[test]
    fn test_occurs_on_spans_days() {
        let rec = EventRecord {
            id: "retreat".to_owned(),
            start: Some(ts("2026-03-02", "08:00")),
            end: Some(ts("2026-03-04", "18:00")),
            all_day: true,
            ..Default::default()
        };
        let event = LayoutEvent::from_record(&rec).unwrap();

        assert!(event.occurs_on(NaiveDate::from_ymd_opt(2026, 3, 3).unwrap()));
        assert!(!event.occurs_on(NaiveDate::from_ymd_opt(2026, 3, 5).unwrap()));
    }
}
