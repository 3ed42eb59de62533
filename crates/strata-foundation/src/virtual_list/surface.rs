//! Host-facing seams: geometry queries and sentinel visibility.
//!
//! All positions are in one host coordinate space along the scroll axis
//! (client coordinates for a browser-like host). Only differences and
//! comparisons between them matter to the engine.

use super::chunk::ChunkId;
use std::fmt;
use std::rc::Rc;

/// Opaque handle to a rendered node, allocated by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);

/// Leading and trailing edge of a node along the scroll axis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Span {
    pub start: f32,
    pub end: f32,
}

impl Span {
    pub fn new(start: f32, end: f32) -> Self {
        Self { start, end }
    }

    pub fn extent(&self) -> f32 {
        self.end - self.start
    }
}

/// The two zero-content markers placed before and after the window. They are
/// also the placeholders sized to `space_before` and `space_after`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sentinel {
    Top,
    Bottom,
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentinel::Top => f.write_str("top"),
            Sentinel::Bottom => f.write_str("bottom"),
        }
    }
}

/// Geometry of the scroll container.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollerMetrics {
    /// Position of the visible region's leading edge.
    pub viewport_start: f32,
    /// Extent of the visible region.
    pub viewport_extent: f32,
    /// Current scroll offset of the container.
    pub scroll_offset: f32,
    /// Total scrollable extent of the container's content.
    pub scroll_extent: f32,
}

/// First and last rendered item nodes of a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkItems {
    pub first: NodeId,
    pub last: NodeId,
}

/// Read-only geometry queries against the host's current layout.
///
/// Implementations may read the list (for example to render it lazily) but
/// must not mutate it.
pub trait MeasurementSurface {
    fn scroller(&self) -> ScrollerMetrics;

    fn sentinel(&self, which: Sentinel) -> Option<NodeId>;

    /// Item nodes of `chunk`, or `None` when the chunk renders a placeholder.
    fn chunk_items(&self, chunk: ChunkId) -> Option<ChunkItems>;

    fn bounds(&self, node: NodeId) -> Span;

    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;
}

/// A visibility transition of one sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntersectionEntry {
    pub sentinel: Sentinel,
    pub is_intersecting: bool,
}

pub type IntersectionListener = Rc<dyn Fn(&[IntersectionEntry])>;

/// Reports when sentinels enter or leave the viewport grown by a margin.
pub trait VisibilityNotifier {
    /// Start observing `which`. `margin` is a fraction of the viewport extent
    /// added on both sides. The current state is reported once after observing.
    fn observe(&self, which: Sentinel, margin: f32, listener: IntersectionListener);

    /// Stop all observations made through this notifier.
    fn disconnect(&self);
}
