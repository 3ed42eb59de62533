use std::fmt;
use std::ops::Range;

/// Stable identity of a chunk. Allocated monotonically and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(pub u64);

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Request for `length` items starting at logical index `from`.
///
/// Doubles as the cache key of a chunk's data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RangeRequest {
    pub from: usize,
    pub length: usize,
}

impl RangeRequest {
    pub fn new(from: usize, length: usize) -> Self {
        Self { from, length }
    }

    pub fn end(&self) -> usize {
        self.from + self.length
    }
}

/// A contiguous run of logical indices materialized as one unit.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    pub id: ChunkId,
    pub start: usize,
    pub count: usize,
    /// `count * average` at the time the range was assigned.
    pub expected_extent: f32,
    /// Real extent from the most recent render of this chunk, if any.
    pub measured_extent: Option<f32>,
    /// Whether `measured_extent` reflects the current range.
    pub measured: bool,
}

impl Chunk {
    pub fn new(id: ChunkId, start: usize, count: usize, average: f32) -> Self {
        Self {
            id,
            start,
            count,
            expected_extent: count as f32 * average,
            measured_extent: None,
            measured: false,
        }
    }

    /// Exclusive end index.
    pub fn end(&self) -> usize {
        self.start + self.count
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    pub fn key(&self) -> RangeRequest {
        RangeRequest::new(self.start, self.count)
    }

    /// Assign a new range. The chunk keeps its identity but loses its data.
    pub fn rekey(&mut self, start: usize, count: usize, average: f32) {
        self.start = start;
        self.count = count;
        self.expected_extent = count as f32 * average;
        self.measured = false;
    }

    /// Extent the chunk occupies on screen: real if rendered, else expected.
    pub fn extent(&self) -> f32 {
        if self.measured {
            self.measured_extent.unwrap_or(self.expected_extent)
        } else {
            self.expected_extent
        }
    }
}
