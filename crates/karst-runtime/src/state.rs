use std::sync::OnceLock;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded};

/// State shared by every chunk task of one cook run. All mutation goes
/// through atomics or a task's own `OnceLock` slot; the run holds no locks.
///
/// Lives until the completion signal fires: the signal cannot fire before
/// the done counter reaches the total, and the orchestrator does not drop
/// its `Arc` until the wait returns, so no task ever outlives the state.
pub struct CookState {
    total: u32,
    done: AtomicU32,
    errors: AtomicU32,
    meshing_nanos: AtomicU64,
    collision_nanos: AtomicU64,
    log_progress: bool,
    // One slot per chunk, addressed by the chunk's linear grid index. Grid
    // indices are unique per task, so no two tasks ever contend for a slot;
    // OnceLock turns a broken uniqueness argument into a visible error
    // instead of a race.
    slots: Box<[OnceLock<Vec<u8>>]>,
    done_tx: Sender<()>,
}

impl CookState {
    pub fn new(total: u32, log_progress: bool) -> (Self, Receiver<()>) {
        let (done_tx, done_rx) = bounded(1);
        let mut slots = Vec::with_capacity(total as usize);
        slots.resize_with(total as usize, OnceLock::new);
        (
            Self {
                total,
                done: AtomicU32::new(0),
                errors: AtomicU32::new(0),
                meshing_nanos: AtomicU64::new(0),
                collision_nanos: AtomicU64::new(0),
                log_progress,
                slots: slots.into_boxed_slice(),
                done_tx,
            },
            done_rx,
        )
    }

    /// Stores one chunk's cooked blob (possibly empty) and reports it done.
    /// Exactly one caller observes the counter reaching the total and fires
    /// the completion signal.
    pub fn record_chunk(&self, slot: usize, blob: Vec<u8>) {
        if self.slots[slot].set(blob).is_err() {
            log::error!("cook slot {slot} written twice");
            self.errors.fetch_add(1, Ordering::Relaxed);
        }

        let done = self.done.fetch_add(1, Ordering::AcqRel) + 1;
        if self.log_progress {
            log::info!("cooking: {done}/{total}", total = self.total);
        }
        if done == self.total {
            let _ = self.done_tx.send(());
        }
    }

    pub fn add_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_meshing(&self, d: Duration) {
        self.meshing_nanos
            .fetch_add(d.as_nanos().min(u128::from(u64::MAX)) as u64, Ordering::Relaxed);
    }

    pub fn add_collision(&self, d: Duration) {
        self.collision_nanos
            .fetch_add(d.as_nanos().min(u128::from(u64::MAX)) as u64, Ordering::Relaxed);
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn done(&self) -> u32 {
        self.done.load(Ordering::Acquire)
    }

    pub fn errors(&self) -> u32 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn meshing_time(&self) -> Duration {
        Duration::from_nanos(self.meshing_nanos.load(Ordering::Relaxed))
    }

    pub fn collision_time(&self) -> Duration {
        Duration::from_nanos(self.collision_nanos.load(Ordering::Relaxed))
    }

    /// Moves a finished slot's blob out. Only valid after the wait returned.
    pub fn take_slot(&mut self, slot: usize) -> Vec<u8> {
        self.slots[slot].take().unwrap_or_default()
    }
}
