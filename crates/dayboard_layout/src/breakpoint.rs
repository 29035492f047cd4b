//! Viewport breakpoints and per-breakpoint layout parameters.

use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

use crate::error::Error;

/// Default minimum rendered duration for zero-duration and sub-threshold
/// events, in minutes.
pub const DEFAULT_MIN_DURATION_MINUTES: i64 = 30;

const DEFAULT_RESIZE_DEBOUNCE: Duration = Duration::from_millis(150);

/// A named viewport-width bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Mobile,
    Tablet,
    Desktop,
    Large,
}

impl Breakpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Breakpoint::Mobile => "mobile",
            Breakpoint::Tablet => "tablet",
            Breakpoint::Desktop => "desktop",
            Breakpoint::Large => "large",
        }
    }
}

/// The parameter bundle a breakpoint resolves to.
///
/// The vertical origin of the day grid is midnight; the visible hour range
/// is the scroll window, used to exclude events that could never appear and
/// to hide the now-indicator, not to shift geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewParams {
    /// Pixel height of one hour row.
    pub slot_height: f32,
    pub visible_start_hour: u32,
    pub visible_end_hour: u32,
    /// Floor applied to rendered event durations, in minutes.
    pub min_duration_minutes: i64,
    pub max_columns: usize,
    pub compact: bool,
    /// Pills fully positioned per month cell before "+N more".
    pub month_max_display: usize,
    /// Chips fully positioned in the all-day row before "+N more".
    pub all_day_max_display: usize,
}

impl ViewParams {
    pub fn mobile() -> Self {
        ViewParams {
            slot_height: 48.0,
            visible_start_hour: 8,
            visible_end_hour: 20,
            min_duration_minutes: DEFAULT_MIN_DURATION_MINUTES,
            max_columns: 2,
            compact: true,
            month_max_display: 2,
            all_day_max_display: 3,
        }
    }

    pub fn tablet() -> Self {
        ViewParams {
            slot_height: 60.0,
            visible_start_hour: 7,
            visible_end_hour: 21,
            min_duration_minutes: DEFAULT_MIN_DURATION_MINUTES,
            max_columns: 3,
            compact: false,
            month_max_display: 3,
            all_day_max_display: 3,
        }
    }

    pub fn desktop() -> Self {
        ViewParams {
            slot_height: 72.0,
            visible_start_hour: 6,
            visible_end_hour: 22,
            min_duration_minutes: DEFAULT_MIN_DURATION_MINUTES,
            max_columns: 4,
            compact: false,
            month_max_display: 3,
            all_day_max_display: 5,
        }
    }

    pub fn large() -> Self {
        ViewParams {
            slot_height: 84.0,
            visible_start_hour: 6,
            visible_end_hour: 23,
            min_duration_minutes: DEFAULT_MIN_DURATION_MINUTES,
            max_columns: 5,
            compact: false,
            month_max_display: 4,
            all_day_max_display: 5,
        }
    }

    pub fn visible_start_minute(&self) -> i64 {
        self.visible_start_hour as i64 * 60
    }

    pub fn visible_end_minute(&self) -> i64 {
        self.visible_end_hour as i64 * 60
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.max_columns == 0 {
            return Err(Error::ZeroMaxColumns);
        }
        if !self.slot_height.is_finite() || self.slot_height <= 0.0 {
            return Err(Error::BadSlotHeight(self.slot_height));
        }
        if self.visible_start_hour >= self.visible_end_hour || self.visible_end_hour > 24 {
            return Err(Error::BadHourRange {
                start: self.visible_start_hour,
                end: self.visible_end_hour,
            });
        }
        if self.min_duration_minutes < 0 {
            return Err(Error::NegativeMinDuration(self.min_duration_minutes));
        }
        Ok(())
    }
}

// Layout signatures hash parameter bundles; floats go in as raw bits.
impl Hash for ViewParams {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slot_height.to_bits().hash(state);
        self.visible_start_hour.hash(state);
        self.visible_end_hour.hash(state);
        self.min_duration_minutes.hash(state);
        self.max_columns.hash(state);
        self.compact.hash(state);
        self.month_max_display.hash(state);
        self.all_day_max_display.hash(state);
    }
}

/// One row of a breakpoint table: the bucket that wins from `min_width` up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakpointRule {
    pub min_width: f32,
    pub breakpoint: Breakpoint,
    pub params: ViewParams,
}

/// Ascending table of breakpoint rules.
///
/// Resolution picks the last rule whose `min_width` the viewport width
/// reaches. Construction validates the shape once so resolution stays an
/// infallible pure function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakpointTable {
    rules: Vec<BreakpointRule>,
}

impl BreakpointTable {
    pub fn new(rules: Vec<BreakpointRule>) -> Result<Self, Error> {
        let Some(first) = rules.first() else {
            return Err(Error::EmptyBreakpointTable);
        };
        if first.min_width != 0.0 {
            return Err(Error::BreakpointTableOffset(first.min_width));
        }
        for pair in rules.windows(2) {
            if pair[1].min_width <= pair[0].min_width {
                return Err(Error::UnorderedBreakpointTable {
                    prev: pair[0].min_width,
                    next: pair[1].min_width,
                });
            }
        }
        for rule in &rules {
            rule.params.validate()?;
        }
        Ok(BreakpointTable { rules })
    }

    pub fn resolve(&self, width: f32) -> &BreakpointRule {
        self.rules
            .iter()
            .rev()
            .find(|rule| width >= rule.min_width)
            .unwrap_or(&self.rules[0])
    }

    pub fn rules(&self) -> &[BreakpointRule] {
        &self.rules
    }
}

impl Default for BreakpointTable {
    fn default() -> Self {
        BreakpointTable::new(vec![
            BreakpointRule {
                min_width: 0.0,
                breakpoint: Breakpoint::Mobile,
                params: ViewParams::mobile(),
            },
            BreakpointRule {
                min_width: 768.0,
                breakpoint: Breakpoint::Tablet,
                params: ViewParams::tablet(),
            },
            BreakpointRule {
                min_width: 1024.0,
                breakpoint: Breakpoint::Desktop,
                params: ViewParams::desktop(),
            },
            BreakpointRule {
                min_width: 1200.0,
                breakpoint: Breakpoint::Large,
                params: ViewParams::large(),
            },
        ])
        .expect("default breakpoint table is well formed")
    }
}

/// Handle returned by [`BreakpointWatcher::subscribe`]; pass it back to
/// [`BreakpointWatcher::unsubscribe`] to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

type BreakpointCallback = Box<dyn FnMut(&BreakpointRule)>;

/// Explicit subscription point for breakpoint changes.
///
/// The shell feeds raw viewport widths in; subscribers are notified only
/// when the resolved breakpoint actually changes, and observations inside
/// the debounce window are held until [`BreakpointWatcher::poll`] or the
/// next observation outside it. There is no global event bus.
pub struct BreakpointWatcher {
    table: BreakpointTable,
    debounce: Duration,
    last_notified: Option<Instant>,
    pending_width: Option<f32>,
    current: Option<Breakpoint>,
    subscribers: Vec<(u64, BreakpointCallback)>,
    next_id: u64,
}

impl BreakpointWatcher {
    pub fn new(table: BreakpointTable) -> Self {
        BreakpointWatcher {
            table,
            debounce: DEFAULT_RESIZE_DEBOUNCE,
            last_notified: None,
            pending_width: None,
            current: None,
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&BreakpointRule) + 'static) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        Subscription(id)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) {
        self.subscribers.retain(|(id, _)| *id != subscription.0);
    }

    pub fn current(&self) -> Option<Breakpoint> {
        self.current
    }

    /// Feed one viewport width observation, e.g. from a resize event.
    pub fn observe_width(&mut self, width: f32) {
        let ready = self
            .last_notified
            .is_none_or(|at| at.elapsed() >= self.debounce);

        if ready {
            self.pending_width = None;
            self.apply(width);
        } else {
            self.pending_width = Some(width);
        }
    }

    /// Flush a held observation once the debounce window has passed.
    pub fn poll(&mut self) {
        let ready = self
            .last_notified
            .is_none_or(|at| at.elapsed() >= self.debounce);

        if ready {
            if let Some(width) = self.pending_width.take() {
                self.apply(width);
            }
        }
    }

    fn apply(&mut self, width: f32) {
        let rule = self.table.resolve(width);
        if self.current == Some(rule.breakpoint) {
            return;
        }
        self.current = Some(rule.breakpoint);
        self.last_notified = Some(Instant::now());

        let rule = rule.clone();
        for (_, callback) in &mut self.subscribers {
            callback(&rule);
        }
    }
}
