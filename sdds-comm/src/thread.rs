use std::sync::{Arc, Barrier};

use parking_lot::Mutex;
use sdds_error::{sdds_err, SddsResult};

use crate::Collective;

/// Shared state for one [`ThreadComm`] group.
#[derive(Debug)]
struct World {
    barrier: Barrier,
    gather_slots: Mutex<Vec<u64>>,
    broadcast_slot: Mutex<Vec<u8>>,
}

/// An in-process collective fabric: one worker per thread.
///
/// Intended for tests and single-machine tools; the collective calls have the
/// same blocking semantics as a message-passing runtime, so code exercised
/// under `ThreadComm` with `size > 1` exercises the real coordination paths.
#[derive(Debug, Clone)]
pub struct ThreadComm {
    world: Arc<World>,
    rank: usize,
}

impl ThreadComm {
    /// Create a group of `size` connected members, one per worker thread.
    pub fn world(size: usize) -> SddsResult<Vec<Self>> {
        if size == 0 {
            return Err(sdds_err!("a communicator needs at least one worker"));
        }
        let world = Arc::new(World {
            barrier: Barrier::new(size),
            gather_slots: Mutex::new(vec![0; size]),
            broadcast_slot: Mutex::new(Vec::new()),
        });
        Ok((0..size)
            .map(|rank| Self {
                world: Arc::clone(&world),
                rank,
            })
            .collect())
    }
}

impl Collective for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.world.gather_slots.lock().len()
    }

    fn broadcast_bytes(&self, root: usize, buf: &mut Vec<u8>) -> SddsResult<()> {
        if self.rank == root {
            *self.world.broadcast_slot.lock() = buf.clone();
        }
        self.world.barrier.wait();
        if self.rank != root {
            buf.clone_from(&self.world.broadcast_slot.lock());
        }
        // Nobody may reuse the slot until every member has copied out.
        self.world.barrier.wait();
        Ok(())
    }

    fn all_gather_u64(&self, value: u64) -> SddsResult<Vec<u64>> {
        self.world.gather_slots.lock()[self.rank] = value;
        self.world.barrier.wait();
        let out = self.world.gather_slots.lock().clone();
        self.world.barrier.wait();
        Ok(out)
    }

    fn barrier(&self) {
        self.world.barrier.wait();
    }
}
