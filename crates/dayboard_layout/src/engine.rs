//! The layout engine facade.
//!
//! Owns the cache, the breakpoint table and the shell's parameter
//! overrides, and wires resolver -> grouper -> column assigner -> grid
//! calculator on cache misses. The cache is never touched by callers
//! directly; configuration changes bump the layout version, which
//! invalidates every entry written under an older one.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::breakpoint::{Breakpoint, BreakpointTable, ViewParams};
use crate::cache::{
    CacheStats, LayoutCache, LayoutSignature, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL,
};
use crate::cluster::group_overlapping;
use crate::error::Error;
use crate::event::{normalize_events, project_onto_day, EventRecord};
use crate::grid::{day_grid, month_pills, now_indicator, LayoutBody, LayoutResult, ViewKind};
use crate::metrics::{report, OverlapMetrics};

/// Shell-supplied overrides applied on top of whatever parameters the
/// breakpoint resolves to, e.g. an explicit visible hour range from the
/// settings screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamOverrides {
    #[serde(default)]
    pub slot_height: Option<f32>,
    #[serde(default)]
    pub visible_start_hour: Option<u32>,
    #[serde(default)]
    pub visible_end_hour: Option<u32>,
    #[serde(default)]
    pub max_columns: Option<usize>,
}

impl ParamOverrides {
    pub fn apply(&self, mut params: ViewParams) -> ViewParams {
        if let Some(slot_height) = self.slot_height {
            params.slot_height = slot_height;
        }
        if let Some(start) = self.visible_start_hour {
            params.visible_start_hour = start;
        }
        if let Some(end) = self.visible_end_hour {
            params.visible_end_hour = end;
        }
        if let Some(max_columns) = self.max_columns {
            params.max_columns = max_columns;
        }
        params
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub breakpoints: BreakpointTable,
    #[serde(default = "default_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default)]
    pub overrides: ParamOverrides,
}

fn default_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL.as_secs()
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            breakpoints: BreakpointTable::default(),
            cache_ttl_secs: default_ttl_secs(),
            cache_capacity: default_cache_capacity(),
            overrides: ParamOverrides::default(),
        }
    }
}

/// One layout request from the shell.
///
/// `now` is passed in rather than read from the clock so that output is
/// deterministic for a fixed input; it never enters the cache signature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutQuery {
    pub view: ViewKind,
    pub date: NaiveDate,
    pub viewport_width: f32,
    pub now: NaiveDateTime,
}

pub struct LayoutEngine {
    breakpoints: BreakpointTable,
    overrides: ParamOverrides,
    cache: LayoutCache,
    version: u64,
}

impl LayoutEngine {
    /// Validates the whole configuration up front; a bad table or override
    /// is a programmer error and fails here, never during a layout pass.
    pub fn new(config: EngineConfig) -> Result<Self, Error> {
        let breakpoints = BreakpointTable::new(config.breakpoints.rules().to_vec())?;
        if config.cache_capacity == 0 {
            return Err(Error::ZeroCacheCapacity);
        }
        for rule in breakpoints.rules() {
            config.overrides.apply(rule.params).validate()?;
        }

        Ok(LayoutEngine {
            breakpoints,
            overrides: config.overrides,
            cache: LayoutCache::new(
                Duration::from_secs(config.cache_ttl_secs),
                config.cache_capacity,
            ),
            version: 0,
        })
    }

    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default()).expect("default engine config is well formed")
    }

    /// Resolve the effective breakpoint and parameters for a viewport.
    pub fn params_for(&self, viewport_width: f32) -> (Breakpoint, ViewParams) {
        let rule = self.breakpoints.resolve(viewport_width);
        (rule.breakpoint, self.overrides.apply(rule.params))
    }

    /// Run one layout pass, serving from the cache when the signature of
    /// (event set, parameters, breakpoint, version) matches.
    #[profiling::function]
    pub fn layout(&mut self, records: &[EventRecord], query: &LayoutQuery) -> LayoutResult {
        let (breakpoint, params) = self.params_for(query.viewport_width);
        let signature = self.signature(records, query, breakpoint, &params);

        if let Some(mut cached) = self.cache.get(signature, self.version) {
            // The indicator tracks the wall clock; refresh it on every hit
            // so clock ticks keep rendering from the cache.
            if let LayoutBody::DayGrid { now, .. } = &mut cached.body {
                *now = now_indicator(query.now, query.date, &params);
            }
            return cached;
        }

        let (events, skipped) = normalize_events(records);
        let body = match query.view {
            ViewKind::DayGrid => day_grid(&events, query.date, &params, query.now),
            ViewKind::MonthPill => month_pills(&events, query.date, &params),
        };

        let result = LayoutResult {
            body,
            skipped,
            layout_version: self.version,
            computed_at_ms: unix_millis(),
        };
        self.cache.set(signature, result.clone(), self.version);
        result
    }

    /// Lay out the week containing `query.date`, Monday first: seven
    /// day-grid passes, each individually cached.
    pub fn layout_week(&mut self, records: &[EventRecord], query: &LayoutQuery) -> Vec<LayoutResult> {
        let monday = query.date
            - ChronoDuration::days(i64::from(query.date.weekday().num_days_from_monday()));

        (0..7)
            .map(|offset| {
                let mut day_query = *query;
                day_query.view = ViewKind::DayGrid;
                day_query.date = monday + ChronoDuration::days(offset);
                self.layout(records, &day_query)
            })
            .collect()
    }

    /// Conflict statistics for the given day, over the whole day rather
    /// than the visible window.
    pub fn metrics(&self, records: &[EventRecord], query: &LayoutQuery) -> OverlapMetrics {
        let (_, params) = self.params_for(query.viewport_width);
        let (events, _) = normalize_events(records);

        let spans: Vec<_> = events
            .iter()
            .enumerate()
            .filter_map(|(i, e)| project_onto_day(e, i, query.date, params.min_duration_minutes))
            .collect();
        let clusters = group_overlapping(&spans);
        report(&events, &spans, &clusters)
    }

    /// Replace the shell overrides. A change bumps the layout version, so
    /// every previously cached result stops matching.
    pub fn set_overrides(&mut self, overrides: ParamOverrides) -> Result<(), Error> {
        for rule in self.breakpoints.rules() {
            overrides.apply(rule.params).validate()?;
        }
        if self.overrides != overrides {
            self.overrides = overrides;
            self.bump_version();
        }
        Ok(())
    }

    pub fn set_breakpoints(&mut self, table: BreakpointTable) -> Result<(), Error> {
        let table = BreakpointTable::new(table.rules().to_vec())?;
        for rule in table.rules() {
            self.overrides.apply(rule.params).validate()?;
        }
        if self.breakpoints != table {
            self.breakpoints = table;
            self.bump_version();
        }
        Ok(())
    }

    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    pub fn layout_version(&self) -> u64 {
        self.version
    }

    /// Drop every cached entry immediately.
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn signature(
        &self,
        records: &[EventRecord],
        query: &LayoutQuery,
        breakpoint: Breakpoint,
        params: &ViewParams,
    ) -> LayoutSignature {
        let mut builder = LayoutSignature::builder("dayboard-layout")
            .with(self.version)
            .with(query.view)
            .with(query.date)
            .with(breakpoint)
            .with(*params);

        for record in records {
            builder = builder.with((
                record.id.as_str(),
                record.start,
                record.end,
                record.all_day,
            ));
        }

        builder.finish()
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as u64
}
