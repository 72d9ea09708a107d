use sdds_error::SddsResult;

/// Blocking collective operations over a fixed group of workers.
///
/// Semantics follow the usual message-passing conventions: every worker in
/// the group must call the same operation, in the same order, with compatible
/// arguments. All calls block until the whole group has participated.
pub trait Collective {
    /// This worker's rank, in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of workers in the group.
    fn size(&self) -> usize;

    /// Whether this worker is the master (rank 0).
    fn is_master(&self) -> bool {
        self.rank() == 0
    }

    /// Broadcast `buf` from `root` to every worker. On non-root workers the
    /// buffer is replaced with the root's bytes.
    fn broadcast_bytes(&self, root: usize, buf: &mut Vec<u8>) -> SddsResult<()>;

    /// Gather one value from every worker; every worker receives the full
    /// rank-ordered vector.
    fn all_gather_u64(&self, value: u64) -> SddsResult<Vec<u64>>;

    /// Sum-reduce one value across the group; every worker receives the sum.
    fn sum_u64(&self, value: u64) -> SddsResult<u64> {
        Ok(self.all_gather_u64(value)?.into_iter().sum())
    }

    /// Min-reduce one value across the group; every worker receives the
    /// minimum.
    fn min_u64(&self, value: u64) -> SddsResult<u64> {
        Ok(self
            .all_gather_u64(value)?
            .into_iter()
            .min()
            .unwrap_or(value))
    }

    /// Block until every worker has arrived.
    fn barrier(&self);
}

/// The trivial single-worker group.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoloComm;

impl Collective for SoloComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn broadcast_bytes(&self, _root: usize, _buf: &mut Vec<u8>) -> SddsResult<()> {
        Ok(())
    }

    fn all_gather_u64(&self, value: u64) -> SddsResult<Vec<u64>> {
        Ok(vec![value])
    }

    fn barrier(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solo_reductions_are_identity() {
        let comm = SoloComm;
        assert!(comm.is_master());
        assert_eq!(comm.all_gather_u64(7).unwrap(), vec![7]);
        assert_eq!(comm.sum_u64(7).unwrap(), 7);
        assert_eq!(comm.min_u64(7).unwrap(), 7);
    }
}
