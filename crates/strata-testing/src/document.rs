//! A headless document that lays out a list's render plan.
//!
//! The document scrolls as a whole: the list sits `list_offset` units below
//! the top of the content and the viewport starts at 0. Layout is rebuilt
//! lazily from the attached list's [`RenderPlan`] whenever the list notifies
//! or the geometry changes, so every query sees what a browser would paint
//! for the current state.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use strata_foundation::virtual_list::{
    ChunkContent, ChunkId, ChunkItems, IntersectionEntry, IntersectionListener,
    MeasurementSurface, NodeId, RenderPlan, ScrollerMetrics, Sentinel, Span, VirtualList,
    VisibilityNotifier,
};

type PlanSource = Box<dyn Fn() -> Option<PlanShape>>;

#[derive(Clone, Copy, Debug)]
enum BlockShape {
    Items { start: usize, count: usize },
    Placeholder { extent: f32 },
}

/// The parts of a render plan that affect geometry.
struct PlanShape {
    space_before: f32,
    space_after: f32,
    chunks: Vec<(ChunkId, BlockShape)>,
}

impl PlanShape {
    fn from_plan<T>(plan: &RenderPlan<T>) -> Self {
        let chunks = plan
            .chunks
            .iter()
            .map(|chunk| {
                let shape = match &chunk.content {
                    ChunkContent::Items(items) => BlockShape::Items {
                        start: chunk.start,
                        count: items.len(),
                    },
                    ChunkContent::Placeholder { extent } => {
                        BlockShape::Placeholder { extent: *extent }
                    }
                };
                (chunk.id, shape)
            })
            .collect();
        Self {
            space_before: plan.space_before,
            space_after: plan.space_after,
            chunks,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct LayoutNode {
    /// Position in content coordinates.
    span: Span,
    index: Option<usize>,
}

#[derive(Default)]
struct Layout {
    nodes: Vec<LayoutNode>,
    items: Vec<(ChunkId, ChunkItems)>,
    content_extent: f32,
}

impl Layout {
    fn top(&self) -> Option<NodeId> {
        (!self.nodes.is_empty()).then_some(NodeId(0))
    }

    fn bottom(&self) -> Option<NodeId> {
        self.nodes.len().checked_sub(1).map(|last| NodeId(last as u64))
    }
}

struct Observer {
    sentinel: Sentinel,
    margin: f32,
    listener: IntersectionListener,
    reported: Option<bool>,
}

struct DocumentInner {
    viewport: Cell<f32>,
    list_offset: Cell<f32>,
    scroll_top: Cell<f32>,
    item_extent: Box<dyn Fn(usize) -> f32>,
    plan: RefCell<Option<PlanSource>>,
    layout: RefCell<Layout>,
    dirty: Cell<bool>,
    layouts: Cell<usize>,
    observers: RefCell<Vec<Observer>>,
}

/// Fake layout engine implementing [`MeasurementSurface`] and
/// [`VisibilityNotifier`].
///
/// Cloning shares the document. Intersection changes are queued until
/// [`flush_intersections`](Self::flush_intersections), the way a browser
/// delivers observer callbacks once per frame.
#[derive(Clone)]
pub struct SimulatedDocument {
    inner: Rc<DocumentInner>,
}

impl SimulatedDocument {
    pub fn new(viewport: f32, item_extent: impl Fn(usize) -> f32 + 'static) -> Self {
        Self {
            inner: Rc::new(DocumentInner {
                viewport: Cell::new(viewport),
                list_offset: Cell::new(0.0),
                scroll_top: Cell::new(0.0),
                item_extent: Box::new(item_extent),
                plan: RefCell::new(None),
                layout: RefCell::new(Layout::default()),
                dirty: Cell::new(true),
                layouts: Cell::new(0),
                observers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Every item has the same extent.
    pub fn uniform(viewport: f32, item_extent: f32) -> Self {
        Self::new(viewport, move |_| item_extent)
    }

    /// Content above the list, such as a page header.
    pub fn with_list_offset(self, offset: f32) -> Self {
        self.inner.list_offset.set(offset);
        self.invalidate();
        self
    }

    /// Render `list` from now on. The document re-lays itself out after every
    /// notification from the list.
    pub fn attach<T: 'static>(&self, list: &VirtualList<T>) {
        let weak = list.downgrade();
        *self.inner.plan.borrow_mut() = Some(Box::new(move || {
            weak.upgrade()
                .map(|list| PlanShape::from_plan(&list.render_plan()))
        }));
        let inner: Weak<DocumentInner> = Rc::downgrade(&self.inner);
        list.subscribe(move || {
            if let Some(inner) = inner.upgrade() {
                inner.dirty.set(true);
            }
        });
        self.invalidate();
    }

    pub fn invalidate(&self) {
        self.inner.dirty.set(true);
    }

    pub fn viewport(&self) -> f32 {
        self.inner.viewport.get()
    }

    pub fn set_viewport(&self, viewport: f32) {
        self.inner.viewport.set(viewport);
        self.invalidate();
    }

    pub fn scroll_top(&self) -> f32 {
        self.ensure_layout();
        self.inner.scroll_top.get()
    }

    /// Scroll to `offset`, clamped to the scrollable range.
    pub fn scroll_to(&self, offset: f32) {
        self.ensure_layout();
        self.inner.scroll_top.set(self.clamp_scroll(offset));
    }

    pub fn scroll_by(&self, delta: f32) {
        self.scroll_to(self.scroll_top() + delta);
    }

    pub fn content_extent(&self) -> f32 {
        self.ensure_layout();
        self.inner.layout.borrow().content_extent
    }

    /// How many times the layout was rebuilt.
    pub fn layout_count(&self) -> usize {
        self.inner.layouts.get()
    }

    /// Indices of rendered items overlapping the viewport, in document order.
    pub fn visible_indices(&self) -> Vec<usize> {
        self.ensure_layout();
        let scroll_top = self.inner.scroll_top.get();
        let viewport = self.inner.viewport.get();
        self.inner
            .layout
            .borrow()
            .nodes
            .iter()
            .filter(|node| {
                node.span.start - scroll_top < viewport && node.span.end - scroll_top > 0.0
            })
            .filter_map(|node| node.index)
            .collect()
    }

    /// Viewport-relative position of the rendered item `index`.
    pub fn item_bounds(&self, index: usize) -> Option<Span> {
        self.ensure_layout();
        let scroll_top = self.inner.scroll_top.get();
        self.inner
            .layout
            .borrow()
            .nodes
            .iter()
            .find(|node| node.index == Some(index))
            .map(|node| Span::new(node.span.start - scroll_top, node.span.end - scroll_top))
    }

    /// Whether an observed sentinel changed visibility since it was last
    /// reported.
    pub fn has_pending_intersections(&self) -> bool {
        self.ensure_layout();
        let layout = self.inner.layout.borrow();
        self.inner
            .observers
            .borrow()
            .iter()
            .any(|observer| observer.reported != self.intersects(&layout, observer))
    }

    /// Deliver queued intersection changes to their listeners. Returns the
    /// number of entries delivered.
    pub fn flush_intersections(&self) -> usize {
        self.ensure_layout();
        let mut batches: Vec<(IntersectionListener, Vec<IntersectionEntry>)> = Vec::new();
        {
            let layout = self.inner.layout.borrow();
            let mut observers = self.inner.observers.borrow_mut();
            for observer in observers.iter_mut() {
                let Some(is_intersecting) = self.intersects(&layout, observer) else {
                    continue;
                };
                if observer.reported == Some(is_intersecting) {
                    continue;
                }
                observer.reported = Some(is_intersecting);
                let entry = IntersectionEntry {
                    sentinel: observer.sentinel,
                    is_intersecting,
                };
                match batches
                    .iter_mut()
                    .find(|(listener, _)| Rc::ptr_eq(listener, &observer.listener))
                {
                    Some((_, entries)) => entries.push(entry),
                    None => batches.push((Rc::clone(&observer.listener), vec![entry])),
                }
            }
        }
        let mut delivered = 0;
        for (listener, entries) in batches {
            log::trace!("Delivering {:?}", entries);
            delivered += entries.len();
            listener(&entries);
        }
        delivered
    }

    fn intersects(&self, layout: &Layout, observer: &Observer) -> Option<bool> {
        let node = match observer.sentinel {
            Sentinel::Top => layout.top()?,
            Sentinel::Bottom => layout.bottom()?,
        };
        let span = layout.nodes[node.0 as usize].span;
        let scroll_top = self.inner.scroll_top.get();
        let viewport = self.inner.viewport.get();
        let low = -viewport * observer.margin;
        let high = viewport * (1.0 + observer.margin);
        Some(span.start - scroll_top <= high && span.end - scroll_top >= low)
    }

    fn clamp_scroll(&self, offset: f32) -> f32 {
        let content = self.inner.layout.borrow().content_extent;
        let max = (content - self.inner.viewport.get()).max(0.0);
        offset.clamp(0.0, max)
    }

    fn ensure_layout(&self) {
        if !self.inner.dirty.replace(false) {
            return;
        }
        let shape = match &*self.inner.plan.borrow() {
            Some(plan) => plan(),
            None => None,
        };
        let layout = match shape {
            Some(shape) => self.build(&shape),
            None => Layout::default(),
        };
        *self.inner.layout.borrow_mut() = layout;
        self.inner.layouts.set(self.inner.layouts.get() + 1);
        let scroll_top = self.clamp_scroll(self.inner.scroll_top.get());
        self.inner.scroll_top.set(scroll_top);
    }

    fn build(&self, shape: &PlanShape) -> Layout {
        let mut layout = Layout::default();
        let mut y = self.inner.list_offset.get();
        let mut push = |layout: &mut Layout, extent: f32, index: Option<usize>| {
            let id = NodeId(layout.nodes.len() as u64);
            layout.nodes.push(LayoutNode {
                span: Span::new(y, y + extent),
                index,
            });
            y += extent;
            id
        };

        push(&mut layout, shape.space_before, None);
        for (id, block) in &shape.chunks {
            match *block {
                BlockShape::Items { start, count } if count > 0 => {
                    let mut first = None;
                    let mut last = NodeId(0);
                    for index in start..start + count {
                        last = push(&mut layout, (self.inner.item_extent)(index), Some(index));
                        first.get_or_insert(last);
                    }
                    if let Some(first) = first {
                        layout.items.push((*id, ChunkItems { first, last }));
                    }
                }
                BlockShape::Items { .. } => {}
                BlockShape::Placeholder { extent } => {
                    push(&mut layout, extent, None);
                }
            }
        }
        push(&mut layout, shape.space_after, None);
        layout.content_extent = y;
        layout
    }
}

impl MeasurementSurface for SimulatedDocument {
    fn scroller(&self) -> ScrollerMetrics {
        self.ensure_layout();
        ScrollerMetrics {
            viewport_start: 0.0,
            viewport_extent: self.inner.viewport.get(),
            scroll_offset: self.inner.scroll_top.get(),
            scroll_extent: self.inner.layout.borrow().content_extent,
        }
    }

    fn sentinel(&self, which: Sentinel) -> Option<NodeId> {
        self.ensure_layout();
        let layout = self.inner.layout.borrow();
        match which {
            Sentinel::Top => layout.top(),
            Sentinel::Bottom => layout.bottom(),
        }
    }

    fn chunk_items(&self, chunk: ChunkId) -> Option<ChunkItems> {
        self.ensure_layout();
        self.inner
            .layout
            .borrow()
            .items
            .iter()
            .find(|(id, _)| *id == chunk)
            .map(|(_, items)| *items)
    }

    fn bounds(&self, node: NodeId) -> Span {
        self.ensure_layout();
        let scroll_top = self.inner.scroll_top.get();
        self.inner
            .layout
            .borrow()
            .nodes
            .get(node.0 as usize)
            .map(|node| Span::new(node.span.start - scroll_top, node.span.end - scroll_top))
            .unwrap_or_default()
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.ensure_layout();
        let next = node.0 as usize + 1;
        (next < self.inner.layout.borrow().nodes.len()).then_some(NodeId(next as u64))
    }
}

impl VisibilityNotifier for SimulatedDocument {
    fn observe(&self, which: Sentinel, margin: f32, listener: IntersectionListener) {
        self.inner.observers.borrow_mut().push(Observer {
            sentinel: which,
            margin,
            listener,
            reported: None,
        });
    }

    fn disconnect(&self) {
        self.inner.observers.borrow_mut().clear();
    }
}
