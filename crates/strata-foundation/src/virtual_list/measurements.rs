use super::chunk::ChunkId;
use super::measure_stats::MeasureStats;
use super::surface::Span;
use smallvec::SmallVec;
use web_time::Instant;

/// Geometry of one rendered chunk at snapshot time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChunkMeasurement {
    pub id: ChunkId,
    pub start: usize,
    pub count: usize,
    pub span: Span,
    pub extent: f32,
}

/// Snapshot of the list geometry taken by the measurement loop.
///
/// Everything except `compensation_delta` is fixed once captured; the
/// viewport controller accumulates the extent of chunks it moves into the
/// delta while updating the window.
#[derive(Clone, Debug)]
pub struct Measurements {
    pub top_intersects: bool,
    pub bottom_intersects: bool,
    pub compensation_delta: f32,
    /// Position of the list start within the scroll content.
    pub list_offset: f32,
    /// How far the list start lies above the viewport start.
    pub scrolled: f32,
    pub scroll_top: f32,
    pub viewport_start: f32,
    pub viewport: f32,
    pub scroll_extent: f32,
    pub low_watermark: f32,
    pub high_watermark: f32,
    pub low_watermark_index: usize,
    pub high_watermark_index: usize,
    /// `space_before` as laid out when the snapshot was taken.
    pub space_before: f32,
    pub top_sentinel: Span,
    pub bottom_sentinel: Span,
    pub chunks: SmallVec<[ChunkMeasurement; 8]>,
    /// Statistics after folding in chunks that were not measured before.
    pub stats: MeasureStats,
    pub scroll_index: usize,
    pub page: usize,
    pub chunk_length: usize,
    /// Window generation the snapshot was taken against.
    pub generation: u64,
    pub time: Instant,
}

impl Measurements {
    pub fn chunk(&self, id: ChunkId) -> Option<&ChunkMeasurement> {
        self.chunks.iter().find(|measurement| measurement.id == id)
    }

    pub fn any_intersects(&self) -> bool {
        self.top_intersects || self.bottom_intersects
    }
}
