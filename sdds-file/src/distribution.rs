/// One worker's share of a page's rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    /// First row of the share, as an offset into the page.
    pub start: u64,
    /// Number of rows in the share.
    pub count: u64,
}

impl RowRange {
    /// Row just past the share.
    pub fn end(&self) -> u64 {
        self.start + self.count
    }

    /// Whether the share is empty.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Split `total` rows across the workers of a `size`-wide communicator and
/// return `rank`'s share.
///
/// Shares are contiguous, disjoint, in rank order, and cover every row.
/// Each participating worker gets `total / workers` rows, and the first
/// `total % workers` of them one extra. With `master_participates` false
/// rank 0 gets an empty share and the rows are split across the remaining
/// `size - 1` ranks; a solo communicator ignores the flag, since someone
/// has to do the work.
pub fn assign_rows(total: u64, size: usize, rank: usize, master_participates: bool) -> RowRange {
    debug_assert!(rank < size);
    if size <= 1 {
        return RowRange {
            start: 0,
            count: total,
        };
    }
    let (workers, index) = if master_participates {
        (size as u64, rank as u64)
    } else if rank == 0 {
        return RowRange { start: 0, count: 0 };
    } else {
        (size as u64 - 1, rank as u64 - 1)
    };
    let base = total / workers;
    let extra = total % workers;
    let count = base + u64::from(index < extra);
    let start = index * base + index.min(extra);
    RowRange { start, count }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn shares(total: u64, size: usize, master_participates: bool) -> Vec<RowRange> {
        (0..size)
            .map(|r| assign_rows(total, size, r, master_participates))
            .collect()
    }

    #[rstest]
    #[case(0, 1)]
    #[case(1, 1)]
    #[case(10, 3)]
    #[case(3, 10)]
    #[case(1_000_003, 7)]
    #[case(u64::from(u32::MAX) + 5, 4)]
    fn shares_partition_the_page(#[case] total: u64, #[case] size: usize) {
        for master_participates in [true, false] {
            let shares = shares(total, size, master_participates);
            // Contiguous, in rank order, covering every row exactly once.
            let mut next = 0u64;
            for share in &shares {
                assert_eq!(share.start, next);
                next = share.end();
            }
            assert_eq!(next, total);
            if !master_participates && size > 1 {
                assert!(shares[0].is_empty());
            }
        }
    }

    #[test]
    fn partition_law_holds_densely() {
        for total in 0..64u64 {
            for size in 1..9usize {
                for master_participates in [true, false] {
                    let shares = shares(total, size, master_participates);
                    let mut next = 0u64;
                    for share in &shares {
                        assert_eq!(share.start, next);
                        next = share.end();
                    }
                    assert_eq!(next, total);
                    let max = shares.iter().map(|s| s.count).max();
                    let min_participating = shares
                        .iter()
                        .filter(|s| master_participates || size == 1 || s.start > 0 || !s.is_empty())
                        .map(|s| s.count)
                        .min();
                    // Balanced to within one row across participants.
                    if let (Some(max), Some(min)) = (max, min_participating) {
                        assert!(max - min <= 1, "total={total} size={size} imbalance");
                    }
                }
            }
        }
    }

    #[test]
    fn remainder_lands_on_the_first_workers() {
        let with_master = shares(11, 4, true);
        let counts: Vec<u64> = with_master.iter().map(|s| s.count).collect();
        assert_eq!(counts, vec![3, 3, 3, 2]);

        let without_master = shares(11, 4, false);
        let counts: Vec<u64> = without_master.iter().map(|s| s.count).collect();
        assert_eq!(counts, vec![0, 4, 4, 3]);
    }

    #[test]
    fn solo_rank_takes_everything_regardless() {
        for master_participates in [true, false] {
            let share = assign_rows(42, 1, 0, master_participates);
            assert_eq!(
                share,
                RowRange {
                    start: 0,
                    count: 42
                }
            );
        }
    }
}
