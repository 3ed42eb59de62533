//! Per-chunk data slots.
//!
//! Each chunk owns at most one slot, keyed by the range it covered when the
//! fetch was issued. Re-keying a chunk replaces its slot, dropping any
//! in-flight future for the old range, so late results can never land in the
//! wrong place.

use super::chunk::{Chunk, ChunkId, RangeRequest};
use super::data_source::{Fetch, FetchError, FetchFuture, RangeDataSource};
use std::rc::Rc;
use std::task::Poll;
use strata_core::collections::map::HashMap;
use strata_core::WakeFlag;

enum SlotStatus<T> {
    Loading(FetchFuture<Vec<T>>),
    Loaded(Rc<[T]>),
    Failed(FetchError),
}

struct ChunkSlot<T> {
    key: RangeRequest,
    status: SlotStatus<T>,
}

/// Observable state of a chunk's data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotState {
    Loading,
    Loaded { len: usize },
    Failed(FetchError),
}

/// What a [`ChunkMaterializer::sync`] call did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub issued: usize,
    /// Fetches that completed synchronously.
    pub ready: usize,
    pub dropped: usize,
}

pub struct ChunkMaterializer<T> {
    slots: HashMap<ChunkId, ChunkSlot<T>>,
    wake: WakeFlag,
}

impl<T> Default for ChunkMaterializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ChunkMaterializer<T> {
    pub fn new() -> Self {
        Self::with_wake_flag(WakeFlag::new())
    }

    /// Share `wake` with other futures polled by the same host loop.
    pub fn with_wake_flag(wake: WakeFlag) -> Self {
        Self {
            slots: HashMap::default(),
            wake,
        }
    }

    /// Bring slots in line with `chunks`: drop slots of removed chunks and
    /// fetch data for chunks whose range changed.
    pub fn sync(&mut self, chunks: &[Chunk], source: &dyn RangeDataSource<T>) -> SyncReport {
        let mut report = SyncReport::default();
        let before = self.slots.len();
        self.slots
            .retain(|id, _| chunks.iter().any(|chunk| chunk.id == *id));
        report.dropped = before - self.slots.len();

        for chunk in chunks {
            let key = chunk.key();
            if self.slots.get(&chunk.id).is_some_and(|slot| slot.key == key) {
                continue;
            }
            let status = if key.length == 0 {
                SlotStatus::Loaded(Rc::from(Vec::new()))
            } else {
                report.issued += 1;
                self.start_fetch(chunk.id, key, source)
            };
            if !matches!(status, SlotStatus::Loading(_)) {
                report.ready += 1;
            }
            self.slots.insert(chunk.id, ChunkSlot { key, status });
        }
        report
    }

    /// Fetch again every slot that failed.
    pub fn retry_failed(&mut self, source: &dyn RangeDataSource<T>) -> usize {
        let failed: Vec<(ChunkId, RangeRequest)> = self
            .slots
            .iter()
            .filter(|(_, slot)| matches!(slot.status, SlotStatus::Failed(_)))
            .map(|(id, slot)| (*id, slot.key))
            .collect();
        for (id, key) in &failed {
            log::debug!("Retrying chunk {} [{}..{})", id, key.from, key.end());
            let status = self.start_fetch(*id, *key, source);
            if let Some(slot) = self.slots.get_mut(id) {
                slot.status = status;
            }
        }
        failed.len()
    }

    /// Poll every in-flight fetch once. Returns how many settled.
    pub fn poll(&mut self) -> usize {
        self.wake.take();
        let mut settled = 0;
        for (id, slot) in self.slots.iter_mut() {
            let SlotStatus::Loading(future) = &mut slot.status else {
                continue;
            };
            let status = match self.wake.poll(future.as_mut()) {
                Poll::Pending => continue,
                Poll::Ready(Ok(items)) => SlotStatus::Loaded(Rc::from(items)),
                Poll::Ready(Err(err)) => {
                    log::warn!("Chunk {} [{}..{}) {}", id, slot.key.from, slot.key.end(), err);
                    SlotStatus::Failed(err)
                }
            };
            slot.status = status;
            settled += 1;
        }
        settled
    }

    pub fn has_pending(&self) -> bool {
        self.slots
            .values()
            .any(|slot| matches!(slot.status, SlotStatus::Loading(_)))
    }

    /// Whether a pending fetch signalled progress since the last poll.
    pub fn needs_poll(&self) -> bool {
        self.wake.is_raised() && self.has_pending()
    }

    /// Loaded items of `chunk`, if they belong to its current range.
    pub fn items(&self, chunk: &Chunk) -> Option<Rc<[T]>> {
        let slot = self.slots.get(&chunk.id)?;
        if slot.key != chunk.key() {
            return None;
        }
        match &slot.status {
            SlotStatus::Loaded(items) => Some(Rc::clone(items)),
            SlotStatus::Loading(_) | SlotStatus::Failed(_) => None,
        }
    }

    pub fn state(&self, id: ChunkId) -> Option<SlotState> {
        self.slots.get(&id).map(|slot| match &slot.status {
            SlotStatus::Loading(_) => SlotState::Loading,
            SlotStatus::Loaded(items) => SlotState::Loaded { len: items.len() },
            SlotStatus::Failed(err) => SlotState::Failed(err.clone()),
        })
    }

    fn start_fetch(
        &self,
        id: ChunkId,
        key: RangeRequest,
        source: &dyn RangeDataSource<T>,
    ) -> SlotStatus<T> {
        match source.fetch(key) {
            Fetch::Ready(Ok(items)) => SlotStatus::Loaded(Rc::from(items)),
            Fetch::Ready(Err(err)) => {
                log::warn!("Chunk {} [{}..{}) {}", id, key.from, key.end(), err);
                SlotStatus::Failed(err)
            }
            Fetch::Pending(future) => {
                // Make sure the host polls at least once.
                self.wake.raise();
                SlotStatus::Loading(future)
            }
        }
    }
}
