//! Fixed layouts for exercising measurement and viewport logic in unit tests.

use super::chunk::ChunkId;
use super::surface::{ChunkItems, MeasurementSurface, NodeId, ScrollerMetrics, Sentinel, Span};
use super::virtual_state::VirtualState;

struct ChunkShape {
    id: ChunkId,
    count: usize,
    expected_extent: f32,
}

/// A document-scrolled layout: top placeholder, chunks in window order, bottom
/// placeholder. Every rendered item has the same extent.
pub(crate) struct StaticLayout {
    chunks: Vec<ChunkShape>,
    space_before: f32,
    space_after: f32,
    item_extent: f32,
    viewport: f32,
    scroll_top: f32,
    placeholders: Vec<ChunkId>,
    rendered: Vec<(ChunkId, usize)>,
    all_placeholders: bool,
    sentinels: bool,
    nodes: Vec<Span>,
    items: Vec<(ChunkId, ChunkItems)>,
    content_extent: f32,
}

impl StaticLayout {
    pub(crate) fn uniform(state: &VirtualState, item_extent: f32, viewport: f32, scroll_top: f32) -> Self {
        let chunks = state
            .chunks()
            .iter()
            .map(|chunk| ChunkShape {
                id: chunk.id,
                count: chunk.count,
                expected_extent: chunk.expected_extent,
            })
            .collect();
        let mut layout = Self {
            chunks,
            space_before: state.space_before(),
            space_after: state.space_after(),
            item_extent,
            viewport,
            scroll_top,
            placeholders: Vec::new(),
            rendered: Vec::new(),
            all_placeholders: false,
            sentinels: true,
            nodes: Vec::new(),
            items: Vec::new(),
            content_extent: 0.0,
        };
        layout.build();
        layout
    }

    pub(crate) fn without_items(mut self) -> Self {
        self.all_placeholders = true;
        self.build();
        self
    }

    pub(crate) fn with_placeholder(mut self, id: ChunkId) -> Self {
        self.placeholders.push(id);
        self.build();
        self
    }

    /// Render only the first `count` items of chunk `id`.
    pub(crate) fn with_rendered(mut self, id: ChunkId, count: usize) -> Self {
        self.rendered.push((id, count));
        self.build();
        self
    }

    pub(crate) fn without_sentinels(mut self) -> Self {
        self.sentinels = false;
        self
    }

    /// Leading edge of the first rendered item of chunk `id`.
    pub(crate) fn chunk_start(&self, id: ChunkId) -> Option<f32> {
        self.items
            .iter()
            .find(|(chunk, _)| *chunk == id)
            .map(|(_, items)| self.nodes[items.first.0 as usize].start)
    }

    fn build(&mut self) {
        self.nodes.clear();
        self.items.clear();
        let mut y = -self.scroll_top;
        self.nodes.push(Span::new(y, y + self.space_before));
        y += self.space_before;
        for chunk in &self.chunks {
            let placeholder = self.all_placeholders || self.placeholders.contains(&chunk.id);
            let count = self
                .rendered
                .iter()
                .find(|(id, _)| *id == chunk.id)
                .map_or(chunk.count, |(_, count)| *count);
            if placeholder || count == 0 {
                // Placeholders are separate nodes that are not items.
                self.nodes.push(Span::new(y, y + chunk.expected_extent));
                y += chunk.expected_extent;
                continue;
            }
            let first = NodeId(self.nodes.len() as u64);
            for _ in 0..count {
                self.nodes.push(Span::new(y, y + self.item_extent));
                y += self.item_extent;
            }
            let last = NodeId(self.nodes.len() as u64 - 1);
            self.items.push((chunk.id, ChunkItems { first, last }));
        }
        self.nodes.push(Span::new(y, y + self.space_after));
        y += self.space_after;
        self.content_extent = y + self.scroll_top;
    }
}

impl MeasurementSurface for StaticLayout {
    fn scroller(&self) -> ScrollerMetrics {
        ScrollerMetrics {
            viewport_start: 0.0,
            viewport_extent: self.viewport,
            scroll_offset: self.scroll_top,
            scroll_extent: self.content_extent,
        }
    }

    fn sentinel(&self, which: Sentinel) -> Option<NodeId> {
        if !self.sentinels {
            return None;
        }
        match which {
            Sentinel::Top => Some(NodeId(0)),
            Sentinel::Bottom => Some(NodeId(self.nodes.len() as u64 - 1)),
        }
    }

    fn chunk_items(&self, chunk: ChunkId) -> Option<ChunkItems> {
        self.items
            .iter()
            .find(|(id, _)| *id == chunk)
            .map(|(_, items)| *items)
    }

    fn bounds(&self, node: NodeId) -> Span {
        self.nodes.get(node.0 as usize).copied().unwrap_or_default()
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let next = node.0 as usize + 1;
        (next < self.nodes.len()).then_some(NodeId(next as u64))
    }
}
