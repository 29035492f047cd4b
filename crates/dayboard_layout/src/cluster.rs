//! Chain-transitive overlap clustering.

use crate::event::DaySpan;

/// A maximal set of chain-transitively overlapping spans.
///
/// `members` holds indices into the span list, in (start minute, input
/// order). Clusters partition the spans they were built from: every span
/// lands in exactly one cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub members: Vec<usize>,
    pub start_minute: i64,
    pub max_end_minute: i64,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Partition spans into overlap clusters.
///
/// Spans are visited in ascending start order, ties broken by input order.
/// A span joins the first open cluster whose running max end lies past its
/// start; otherwise it opens a new cluster. Merging is chain-transitive:
/// when A overlaps B and B overlaps C, all three share a cluster even if A
/// and C are themselves disjoint.
pub fn group_overlapping(spans: &[DaySpan]) -> Vec<Cluster> {
    let mut order: Vec<usize> = (0..spans.len()).collect();
    order.sort_by_key(|&i| (spans[i].start_minute, i));

    let mut clusters: Vec<Cluster> = Vec::new();
    for i in order {
        let span = &spans[i];
        match clusters
            .iter_mut()
            .find(|cluster| span.start_minute < cluster.max_end_minute)
        {
            Some(cluster) => {
                cluster.members.push(i);
                cluster.max_end_minute = cluster.max_end_minute.max(span.display_end_minute);
            }
            None => clusters.push(Cluster {
                members: vec![i],
                start_minute: span.start_minute,
                max_end_minute: span.display_end_minute,
            }),
        }
    }

    clusters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(index: usize, start: i64, end: i64) -> DaySpan {
        DaySpan {
            event: index,
            start_minute: start,
            end_minute: end,
            display_end_minute: end.max(start + 30),
        }
    }

    #[test]
    fn test_disjoint_events_get_own_clusters() {
        let spans = vec![span(0, 540, 600), span(1, 660, 720)];
        let clusters = group_overlapping(&spans);

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members, vec![0]);
        assert_eq!(clusters[1].members, vec![1]);
    }

    #[test]
    fn test_overlapping_events_merge() {
        // 09:00-10:00 and 09:30-10:30
        let spans = vec![span(0, 540, 600), span(1, 570, 630)];
        let clusters = group_overlapping(&spans);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members, vec![0, 1]);
        assert_eq!(clusters[0].start_minute, 540);
        assert_eq!(clusters[0].max_end_minute, 630);
    }

    #[test]
    fn test_chain_transitive_merge() {
        // A 09:00-10:00, B 09:45-11:00, C 10:30-12:00. A and C never touch
        // but B bridges them, so all three share one cluster.
        let spans = vec![span(0, 540, 600), span(1, 585, 660), span(2, 630, 720)];
        let clusters = group_overlapping(&spans);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members, vec![0, 1, 2]);
    }

    #[test]
    fn test_touching_endpoints_do_not_overlap() {
        // Half-open intervals: 09:00-10:00 and 10:00-11:00 are disjoint.
        let spans = vec![span(0, 540, 600), span(1, 600, 660)];
        let clusters = group_overlapping(&spans);

        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn test_partition_invariant() {
        let spans = vec![
            span(0, 480, 540),
            span(1, 500, 560),
            span(2, 700, 760),
            span(3, 530, 590),
            span(4, 710, 770),
        ];
        let clusters = group_overlapping(&spans);

        let mut seen: Vec<usize> = clusters
            .iter()
            .flat_map(|c| c.members.iter().copied())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_unsorted_input_is_sorted_by_start() {
        let spans = vec![span(0, 660, 720), span(1, 540, 600)];
        let clusters = group_overlapping(&spans);

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members, vec![1]);
        assert_eq!(clusters[1].members, vec![0]);
    }

    #[test]
    fn test_identical_starts_keep_input_order() {
        let spans = vec![span(0, 540, 600), span(1, 540, 600), span(2, 540, 600)];
        let clusters = group_overlapping(&spans);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members, vec![0, 1, 2]);
    }

    #[test]
    fn test_floored_span_claims_overlap() {
        // A zero-duration event floored to 30 minutes overlaps a meeting
        // starting 10 minutes later.
        let zero = DaySpan {
            event: 0,
            start_minute: 540,
            end_minute: 540,
            display_end_minute: 570,
        };
        let spans = vec![zero, span(1, 550, 610)];
        let clusters = group_overlapping(&spans);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members, vec![0, 1]);
    }
}
