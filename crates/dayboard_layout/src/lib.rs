//! Event layout engine for the dayboard touch calendar.
//!
//! Given plain calendar event records and view parameters, the engine
//! detects which events overlap in time, partitions them into clusters,
//! assigns side-by-side columns, and produces per-event geometry for the
//! day-grid and month-pill views. Results are memoized behind a
//! deterministic layout signature so clock ticks and idle-timer resets
//! render from cache. Rendering itself, event fetching and settings
//! persistence live in the dashboard shell, not here.

pub mod breakpoint;
pub mod cache;
pub mod cluster;
pub mod columns;
pub mod engine;
pub mod error;
pub mod event;
pub mod grid;
pub mod metrics;

pub use breakpoint::{
    Breakpoint, BreakpointRule, BreakpointTable, BreakpointWatcher, Subscription, ViewParams,
    DEFAULT_MIN_DURATION_MINUTES,
};
pub use cache::{CacheStats, LayoutCache, LayoutSignature, SignatureBuilder};
pub use cluster::{group_overlapping, Cluster};
pub use columns::{assign_columns, ColumnSlot};
pub use engine::{EngineConfig, LayoutEngine, LayoutQuery, ParamOverrides};
pub use error::Error;
pub use event::{
    normalize_events, project_onto_day, records_from_json, DaySpan, EventRecord, LayoutEvent,
};
pub use grid::{
    day_grid, month_pills, now_indicator, AllDayRow, EventGeometry, LayoutBody, LayoutResult,
    MonthCell, MonthPill, NowIndicator, PositionedEvent, ViewKind,
};
pub use metrics::{report, Conflict, OverlapMetrics, Severity};
