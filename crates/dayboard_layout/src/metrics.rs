//! Derived overlap statistics for conflict badges.
//!
//! Pure and recomputed on demand; cheap next to layout itself, so nothing
//! here is cached.

use serde::Serialize;

use crate::cluster::Cluster;
use crate::event::{DaySpan, LayoutEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Low for a pair, medium for three, high beyond that.
    pub fn for_cluster_size(size: usize) -> Self {
        match size {
            0..=2 => Severity::Low,
            3 => Severity::Medium,
            _ => Severity::High,
        }
    }
}

/// One overlap group worth flagging in the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conflict {
    pub event_ids: Vec<String>,
    pub severity: Severity,
    pub start_minute: i64,
    pub end_minute: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlapMetrics {
    pub total_events: usize,
    pub overlapping_events: usize,
    pub overlap_groups: usize,
    pub max_overlap_in_group: usize,
    /// Mean over conflict groups of how double-booked the group's window
    /// is: (sum of member durations - window length) / window length.
    pub average_overlap_percentage: f32,
    pub conflicts: Vec<Conflict>,
}

/// Summarize the clusters produced by one layout pass.
pub fn report(events: &[LayoutEvent], spans: &[DaySpan], clusters: &[Cluster]) -> OverlapMetrics {
    let mut overlapping_events = 0;
    let mut max_overlap_in_group = 0;
    let mut percentage_sum = 0.0f32;
    let mut conflicts = Vec::new();

    for cluster in clusters {
        if cluster.len() < 2 {
            continue;
        }

        overlapping_events += cluster.len();
        max_overlap_in_group = max_overlap_in_group.max(cluster.len());

        let window = (cluster.max_end_minute - cluster.start_minute).max(1);
        let busy: i64 = cluster
            .members
            .iter()
            .map(|&i| spans[i].display_end_minute - spans[i].start_minute)
            .sum();
        percentage_sum += (busy - window).max(0) as f32 / window as f32 * 100.0;

        conflicts.push(Conflict {
            event_ids: cluster
                .members
                .iter()
                .map(|&i| events[spans[i].event].id.clone())
                .collect(),
            severity: Severity::for_cluster_size(cluster.len()),
            start_minute: cluster.start_minute,
            end_minute: cluster.max_end_minute,
        });
    }

    let overlap_groups = conflicts.len();
    OverlapMetrics {
        total_events: spans.len(),
        overlapping_events,
        overlap_groups,
        max_overlap_in_group,
        average_overlap_percentage: if overlap_groups == 0 {
            0.0
        } else {
            percentage_sum / overlap_groups as f32
        },
        conflicts,
    }
}
