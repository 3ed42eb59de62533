//! Window state of a virtual list.
//!
//! [`VirtualState`] owns the chunk window, the measured statistics and the
//! anchor compensation coefficient, and derives placeholder sizes and
//! watermarks from them. Mutation goes through the typed methods below; the
//! viewport controller is the main caller and runs them inside one store batch.

use super::chunk::{Chunk, ChunkId};
use super::config::{VirtualListConfig, CHUNK_PAGE_FRACTION};
use super::error::StateError;
use super::measure_stats::MeasureStats;
use super::measurements::{ChunkMeasurement, Measurements};
use std::ops::Range;

/// Number of items in the logical list, once the data source reported it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TotalCount {
    #[default]
    Unknown,
    Known(usize),
}

impl TotalCount {
    pub fn known(self) -> Option<usize> {
        match self {
            TotalCount::Known(total) => Some(total),
            TotalCount::Unknown => None,
        }
    }
}

/// Number of items that fit in `viewport` at `average` extent per item.
pub fn page_length(viewport: f32, average: f32) -> usize {
    if average <= 0.0 || !viewport.is_finite() {
        return 1;
    }
    ((viewport / average).ceil() as usize).max(1)
}

/// Length of a freshly planned chunk for a given page length.
pub fn chunk_length_for_page(page: usize) -> usize {
    ((page as f32 * CHUNK_PAGE_FRACTION).ceil() as usize).max(1)
}

#[derive(Clone, Debug)]
pub struct VirtualState {
    chunks: Vec<Chunk>,
    stats: MeasureStats,
    space_above_coeff: f32,
    total: TotalCount,
    measurements: Option<Measurements>,
    margin: f32,
    init_chunk_length: usize,
    next_chunk_id: u64,
    generation: u64,
    content_revision: u64,
}

impl VirtualState {
    /// Creates the state with a single seed chunk `[0, init_chunk_length)`.
    pub fn new(config: &VirtualListConfig) -> Self {
        let stats = MeasureStats::new(config.init_item_extent);
        let mut state = Self {
            chunks: Vec::new(),
            stats,
            space_above_coeff: 1.0,
            total: TotalCount::Unknown,
            measurements: None,
            margin: config.margin,
            init_chunk_length: config.init_chunk_length,
            next_chunk_id: 0,
            generation: 0,
            content_revision: 0,
        };
        state.push_chunk(0, config.init_chunk_length);
        state
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk(&self, id: ChunkId) -> Option<&Chunk> {
        self.chunks.iter().find(|chunk| chunk.id == id)
    }

    pub fn total(&self) -> TotalCount {
        self.total
    }

    pub fn stats(&self) -> MeasureStats {
        self.stats
    }

    pub fn average_item_length(&self) -> f32 {
        self.stats.average_item_length
    }

    pub fn space_above_coeff(&self) -> f32 {
        self.space_above_coeff
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }

    /// Bumped by every structural change to the window. Snapshots taken
    /// against an older generation are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Bumped when chunk data arrives, so hosts re-render.
    pub fn content_revision(&self) -> u64 {
        self.content_revision
    }

    /// Smallest index in the window.
    pub fn first_index(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.start).min().unwrap_or(0)
    }

    /// One past the largest index in the window.
    pub fn end_index(&self) -> usize {
        self.chunks.iter().map(Chunk::end).max().unwrap_or(0)
    }

    /// Largest index in the window, `None` while the window is empty.
    pub fn last_index(&self) -> Option<usize> {
        self.end_index().checked_sub(1)
    }

    pub fn window(&self) -> Range<usize> {
        self.first_index()..self.end_index()
    }

    /// Placeholder extent before the first chunk.
    pub fn space_before(&self) -> f32 {
        self.first_index() as f32 * self.stats.average_item_length * self.space_above_coeff
    }

    /// Placeholder extent after the last chunk. Zero while the total is unknown.
    pub fn space_after(&self) -> f32 {
        match self.total {
            TotalCount::Known(total) => {
                total.saturating_sub(self.end_index()) as f32 * self.stats.average_item_length
            }
            TotalCount::Unknown => 0.0,
        }
    }

    /// Items per viewport; the seed chunk length until something was measured.
    pub fn page(&self) -> usize {
        self.measurements
            .as_ref()
            .map(|msrm| msrm.page)
            .unwrap_or(self.init_chunk_length)
    }

    pub fn chunk_length(&self) -> usize {
        chunk_length_for_page(self.page())
    }

    pub fn low_watermark(&self) -> Option<f32> {
        self.measurements.as_ref().map(|msrm| msrm.low_watermark)
    }

    pub fn high_watermark(&self) -> Option<f32> {
        self.measurements.as_ref().map(|msrm| msrm.high_watermark)
    }

    pub fn low_watermark_index(&self) -> Option<usize> {
        self.measurements
            .as_ref()
            .map(|msrm| msrm.low_watermark_index)
    }

    pub fn high_watermark_index(&self) -> Option<usize> {
        self.measurements
            .as_ref()
            .map(|msrm| msrm.high_watermark_index)
    }

    /// Reassign the range of chunk `id`. Its data and measured flag reset.
    pub fn set_chunk(&mut self, id: ChunkId, start: usize, count: usize) -> Result<(), StateError> {
        let average = self.stats.average_item_length;
        let chunk = self
            .chunks
            .iter_mut()
            .find(|chunk| chunk.id == id)
            .ok_or(StateError::UnknownChunk { id })?;
        chunk.rekey(start, count, average);
        self.generation += 1;
        Ok(())
    }

    /// Append a fresh chunk at the back of the window.
    pub fn push_chunk(&mut self, start: usize, count: usize) -> ChunkId {
        let chunk = self.allocate_chunk(start, count);
        let id = chunk.id;
        self.chunks.push(chunk);
        self.generation += 1;
        id
    }

    /// Insert a fresh chunk at the front of the window.
    pub fn insert_chunk_front(&mut self, start: usize, count: usize) -> ChunkId {
        let chunk = self.allocate_chunk(start, count);
        let id = chunk.id;
        self.chunks.insert(0, chunk);
        self.generation += 1;
        id
    }

    /// Move the first `n` chunks to the back, keeping their order.
    pub fn rotate_to_back(&mut self, n: usize) {
        let n = n.min(self.chunks.len());
        if n == 0 {
            return;
        }
        self.chunks.rotate_left(n);
        self.generation += 1;
    }

    /// Move the last `n` chunks to the front, keeping their order.
    pub fn rotate_to_front(&mut self, n: usize) {
        let n = n.min(self.chunks.len());
        if n == 0 {
            return;
        }
        self.chunks.rotate_right(n);
        self.generation += 1;
    }

    /// Rebuild the window from `ranges`, reusing existing chunk entries in
    /// order. Surplus entries are dropped and missing ones allocated.
    pub fn replace_window(&mut self, ranges: &[Range<usize>]) {
        let average = self.stats.average_item_length;
        self.chunks.truncate(ranges.len());
        for (chunk, range) in self.chunks.iter_mut().zip(ranges) {
            chunk.rekey(range.start, range.len(), average);
        }
        for range in &ranges[self.chunks.len()..] {
            let chunk = self.allocate_chunk(range.start, range.len());
            self.chunks.push(chunk);
        }
        self.generation += 1;
    }

    /// Store real extents from a snapshot. Only measurements whose range
    /// still matches the chunk are applied.
    pub fn record_chunk_measurements(&mut self, measurements: &[ChunkMeasurement]) {
        for measurement in measurements {
            if let Some(chunk) = self.chunks.iter_mut().find(|chunk| chunk.id == measurement.id) {
                if chunk.start == measurement.start && chunk.count == measurement.count {
                    chunk.measured_extent = Some(measurement.extent);
                    chunk.measured = true;
                }
            }
        }
    }

    pub fn set_stats(&mut self, stats: MeasureStats) {
        self.stats = stats;
    }

    pub fn set_space_above_coeff(&mut self, coeff: f32) {
        self.space_above_coeff = if coeff.is_finite() { coeff.max(0.0) } else { 1.0 };
    }

    pub fn record_measurements(&mut self, measurements: Measurements) {
        self.measurements = Some(measurements);
    }

    pub fn mark_content_changed(&mut self) {
        self.content_revision += 1;
    }

    /// Update the total and shrink the window if it now reaches past the end.
    ///
    /// Returns whether the window changed.
    pub fn set_total(&mut self, total: TotalCount) -> bool {
        self.total = total;
        self.retract_to_total()
    }

    fn retract_to_total(&mut self) -> bool {
        let Some(total) = self.total.known() else {
            return false;
        };
        if self.end_index() <= total {
            return false;
        }
        let average = self.stats.average_item_length;

        while self.chunks.len() > 1 {
            let Some(tail) = self.tail_position() else {
                break;
            };
            if self.chunks[tail].start < total {
                break;
            }
            let removed = self.chunks.remove(tail);
            log::debug!("Retract chunk {} [{:?}] past total {}", removed.id, removed.range(), total);
        }

        if let Some(tail) = self.tail_position() {
            let chunk = &mut self.chunks[tail];
            if chunk.start >= total {
                let count = chunk.count.min(total);
                let start = total - count;
                log::debug!(
                    "Re-anchor chunk {} from {:?} to {:?}",
                    chunk.id,
                    chunk.range(),
                    start..total
                );
                chunk.rekey(start, count, average);
                self.space_above_coeff = 1.0;
            } else if chunk.end() > total {
                let start = chunk.start;
                chunk.rekey(start, total - start, average);
            }
        }
        self.generation += 1;
        true
    }

    fn tail_position(&self) -> Option<usize> {
        self.chunks
            .iter()
            .enumerate()
            .max_by_key(|(_, chunk)| chunk.start)
            .map(|(index, _)| index)
    }

    fn allocate_chunk(&mut self, start: usize, count: usize) -> Chunk {
        let id = ChunkId(self.next_chunk_id);
        self.next_chunk_id += 1;
        Chunk::new(id, start, count, self.stats.average_item_length)
    }

    /// Checks that the chunk ranges tile `[first_index, end_index)` without
    /// gaps or overlaps and stay inside a known total.
    pub fn is_consistent(&self) -> bool {
        let mut ranges: Vec<Range<usize>> = self.chunks.iter().map(Chunk::range).collect();
        ranges.sort_by_key(|range| range.start);
        let contiguous = ranges.windows(2).all(|pair| pair[0].end == pair[1].start);
        let within_total = match self.total {
            TotalCount::Known(total) => self.end_index() <= total,
            TotalCount::Unknown => true,
        };
        !self.chunks.is_empty() && contiguous && within_total && self.space_above_coeff >= 0.0
    }
}
