//! Thin façade over intra-process (threads) or inter-process (MPI) message passing.
//!
//! Messages are *contiguous byte slices*. Every call blocks: `send` until the
//! buffer has been handed off, `recv` until a matching message arrives. Between
//! a fixed (source, destination, tag) triple messages are delivered FIFO.
//!
//! `abort` is the only way out of a blocked exchange: MPI kills the job,
//! [`LocalComm`] poisons its world so every pending and future call fails with
//! [`MeshError::Aborted`].

use crate::mesh_error::MeshError;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;

/// Message tag. Both ends of an exchange must agree on it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommTag(u16);

impl CommTag {
    pub const fn new(tag: u16) -> Self {
        CommTag(tag)
    }

    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

/// Blocking point-to-point communication interface (minimal by design).
pub trait Communicator {
    /// This process's rank in `[0, size)`.
    fn rank(&self) -> usize;

    /// Number of ranks in the world.
    fn size(&self) -> usize;

    fn send(&self, peer: usize, tag: CommTag, buf: &[u8]) -> Result<(), MeshError>;

    fn recv(&self, peer: usize, tag: CommTag) -> Result<Bytes, MeshError>;

    /// Collective barrier over the whole world.
    fn barrier(&self) -> Result<(), MeshError>;

    /// Terminate the whole run with `code`.
    fn abort(&self, code: i32);

    fn is_coordinator(&self) -> bool {
        self.rank() == 0
    }
}

fn check_peer(peer: usize, size: usize) -> Result<(), MeshError> {
    if peer >= size {
        return Err(MeshError::Comm(format!(
            "peer {peer} out of range, world size is {size}"
        )));
    }
    Ok(())
}

/// Compile-time no-op comm for pure serial runs: a world of one rank.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn send(&self, peer: usize, _tag: CommTag, _buf: &[u8]) -> Result<(), MeshError> {
        Err(MeshError::Comm(format!("NoComm cannot send to rank {peer}")))
    }

    fn recv(&self, peer: usize, _tag: CommTag) -> Result<Bytes, MeshError> {
        Err(MeshError::Comm(format!("NoComm cannot receive from rank {peer}")))
    }

    fn barrier(&self) -> Result<(), MeshError> {
        Ok(())
    }

    fn abort(&self, code: i32) {
        log::error!("NoComm aborted with code {code}");
    }
}

// --- LocalComm: intra-process / multi-thread ---
type Key = (usize, usize, u16); // (src, dst, tag)

#[derive(Debug, Default)]
struct SyncState {
    arrived: usize,
    generation: u64,
    aborted: Option<i32>,
}

#[derive(Debug)]
struct LocalWorld {
    size: usize,
    mailbox: DashMap<Key, VecDeque<Bytes>>,
    state: Mutex<SyncState>,
    wake: Condvar,
}

/// One rank of an in-process world; ranks usually live on separate threads.
#[derive(Clone, Debug)]
pub struct LocalComm {
    rank: usize,
    world: Arc<LocalWorld>,
}

impl LocalComm {
    /// Create a world of `size` ranks, returned in rank order.
    pub fn world(size: usize) -> Vec<LocalComm> {
        let world = Arc::new(LocalWorld {
            size,
            mailbox: DashMap::new(),
            state: Mutex::new(SyncState::default()),
            wake: Condvar::new(),
        });
        (0..size)
            .map(|rank| LocalComm {
                rank,
                world: Arc::clone(&world),
            })
            .collect()
    }

    fn pop(&self, key: &Key) -> Option<Bytes> {
        self.world.mailbox.get_mut(key)?.pop_front()
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.world.size
    }

    fn send(&self, peer: usize, tag: CommTag, buf: &[u8]) -> Result<(), MeshError> {
        check_peer(peer, self.world.size)?;
        let state = self.world.state.lock();
        if let Some(code) = state.aborted {
            return Err(MeshError::Aborted(code));
        }
        self.world
            .mailbox
            .entry((self.rank, peer, tag.as_u16()))
            .or_default()
            .push_back(Bytes::copy_from_slice(buf));
        // notify under the lock so a receiver between check and wait cannot miss it
        self.world.wake.notify_all();
        Ok(())
    }

    fn recv(&self, peer: usize, tag: CommTag) -> Result<Bytes, MeshError> {
        check_peer(peer, self.world.size)?;
        let key = (peer, self.rank, tag.as_u16());
        let mut state = self.world.state.lock();
        loop {
            if let Some(code) = state.aborted {
                return Err(MeshError::Aborted(code));
            }
            if let Some(msg) = self.pop(&key) {
                return Ok(msg);
            }
            self.world.wake.wait(&mut state);
        }
    }

    fn barrier(&self) -> Result<(), MeshError> {
        let mut state = self.world.state.lock();
        if let Some(code) = state.aborted {
            return Err(MeshError::Aborted(code));
        }
        let generation = state.generation;
        state.arrived += 1;
        if state.arrived == self.world.size {
            state.arrived = 0;
            state.generation += 1;
            self.world.wake.notify_all();
            return Ok(());
        }
        while state.generation == generation {
            if let Some(code) = state.aborted {
                return Err(MeshError::Aborted(code));
            }
            self.world.wake.wait(&mut state);
        }
        Ok(())
    }

    fn abort(&self, code: i32) {
        let mut state = self.world.state.lock();
        if state.aborted.is_none() {
            log::error!("rank {} aborted the local world with code {code}", self.rank);
            state.aborted = Some(code);
        }
        self.world.wake.notify_all();
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::{CommTag, MeshError, check_peer};
    use bytes::Bytes;
    use mpi::environment::Universe;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    pub struct MpiComm {
        _universe: Universe,
        pub world: SimpleCommunicator,
        pub rank: usize,
        size: usize,
    }

    impl MpiComm {
        /// Initialise MPI. Fails if it was already initialised in this process.
        pub fn new() -> Result<Self, MeshError> {
            let universe = mpi::initialize()
                .ok_or_else(|| MeshError::Comm("MPI is already initialized".into()))?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Ok(Self {
                _universe: universe,
                world,
                rank,
                size,
            })
        }
    }

    impl super::Communicator for MpiComm {
        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn send(&self, peer: usize, tag: CommTag, buf: &[u8]) -> Result<(), MeshError> {
            check_peer(peer, self.size)?;
            self.world
                .process_at_rank(peer as i32)
                .send_with_tag(buf, i32::from(tag.as_u16()));
            Ok(())
        }

        fn recv(&self, peer: usize, tag: CommTag) -> Result<Bytes, MeshError> {
            check_peer(peer, self.size)?;
            let (msg, _status) = self
                .world
                .process_at_rank(peer as i32)
                .receive_vec_with_tag::<u8>(i32::from(tag.as_u16()));
            Ok(Bytes::from(msg))
        }

        fn barrier(&self) -> Result<(), MeshError> {
            self.world.barrier();
            Ok(())
        }

        fn abort(&self, code: i32) {
            self.world.abort(code)
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
