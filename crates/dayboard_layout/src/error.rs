/// Configuration errors.
///
/// These are raised when the engine or a breakpoint table is constructed
/// with values that can only come from a programming mistake. Layout passes
/// themselves never fail on data quality; malformed events are skipped and
/// oversized clusters are flagged instead.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("max columns must be at least 1")]
    ZeroMaxColumns,

    #[error("slot height must be a positive finite number, got {0}")]
    BadSlotHeight(f32),

    #[error("visible hour range {start}..{end} is inverted or out of bounds")]
    BadHourRange { start: u32, end: u32 },

    #[error("minimum rendered duration must not be negative, got {0}")]
    NegativeMinDuration(i64),

    #[error("breakpoint table is empty")]
    EmptyBreakpointTable,

    #[error("breakpoint table must start at width 0, got {0}")]
    BreakpointTableOffset(f32),

    #[error("breakpoint table widths must be strictly ascending: {prev} then {next}")]
    UnorderedBreakpointTable { prev: f32, next: f32 },

    #[error("cache capacity must be at least 1")]
    ZeroCacheCapacity,
}
