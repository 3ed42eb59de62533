//! Geometry snapshots and the deferred re-measure schedule.

use super::measurements::{ChunkMeasurement, Measurements};
use super::surface::{ChunkItems, IntersectionEntry, MeasurementSurface, Sentinel, Span};
use super::virtual_state::{chunk_length_for_page, page_length, VirtualState};
use smallvec::SmallVec;
use strata_core::{FrameCallbackId, FrameScheduler};
use web_time::Instant;

/// Latest known visibility of the two sentinels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntersectionFlags {
    pub top: bool,
    pub bottom: bool,
}

impl IntersectionFlags {
    pub fn apply(&mut self, entries: &[IntersectionEntry]) {
        for entry in entries {
            match entry.sentinel {
                Sentinel::Top => self.top = entry.is_intersecting,
                Sentinel::Bottom => self.bottom = entry.is_intersecting,
            }
        }
    }
}

/// Capture a snapshot of the current layout.
///
/// Chunks that render real items are measured from the leading edge of their
/// first item to the leading edge of whatever follows their last item.
/// Chunks showing a placeholder are skipped. Chunks measured for the first
/// time since their last re-key are folded into the returned statistics.
///
/// Returns `None` when a sentinel is not rendered.
pub fn measure(
    state: &VirtualState,
    surface: &dyn MeasurementSurface,
    flags: IntersectionFlags,
) -> Option<Measurements> {
    let Some(top_node) = surface.sentinel(Sentinel::Top) else {
        log::warn!("Skipping measurement: top sentinel is not rendered");
        return None;
    };
    let Some(bottom_node) = surface.sentinel(Sentinel::Bottom) else {
        log::warn!("Skipping measurement: bottom sentinel is not rendered");
        return None;
    };
    let scroller = surface.scroller();
    let top_sentinel = surface.bounds(top_node);
    let bottom_sentinel = surface.bounds(bottom_node);

    let viewport = scroller.viewport_extent;
    let scroll_top = scroller.scroll_offset;
    let list_offset = top_sentinel.start - (scroller.viewport_start - scroll_top);
    let scrolled = scroller.viewport_start - top_sentinel.start;

    let mut stats = state.stats();
    let mut chunks: SmallVec<[ChunkMeasurement; 8]> = SmallVec::new();
    for chunk in state.chunks() {
        let Some(items) = surface.chunk_items(chunk.id) else {
            continue;
        };
        let first = surface.bounds(items.first);
        let end = match surface.next_sibling(items.last) {
            Some(next) => surface.bounds(next).start,
            None => surface.bounds(items.last).end,
        };
        let extent = (end - first.start).max(0.0);
        chunks.push(ChunkMeasurement {
            id: chunk.id,
            start: chunk.start,
            count: chunk.count,
            span: Span::new(first.start, end),
            extent,
        });
        if !chunk.measured && chunk.count > 0 {
            // A source may return fewer items than requested.
            let rendered = rendered_items(surface, items, chunk.count);
            stats.fold(extent, rendered);
        }
    }

    // The current layout was sized with the previous average, so positions
    // convert back to indices with that average.
    let layout_average = state.average_item_length();
    let scroll_index = if scrolled > 0.0 && layout_average > 0.0 {
        (scrolled / layout_average).floor() as usize
    } else {
        0
    };
    let page = page_length(viewport, stats.average_item_length);
    let chunk_length = chunk_length_for_page(page);
    let margin = state.margin();
    let low_watermark = scroller.viewport_start - viewport * margin;
    let high_watermark = scroller.viewport_start + viewport * (1.0 + margin);
    let low_watermark_index = (scroll_index as f32 - page as f32 * margin).floor().max(0.0) as usize;
    let high_watermark_index = (scroll_index as f32 + page as f32 * (1.0 + margin)).ceil() as usize;

    log::trace!(
        "Position s:{:.1} ch:{} r:{:?} w:[{:.1}, {:.1}]",
        scrolled,
        chunks.len(),
        state.window(),
        low_watermark,
        high_watermark
    );

    Some(Measurements {
        top_intersects: flags.top,
        bottom_intersects: flags.bottom,
        compensation_delta: 0.0,
        list_offset,
        scrolled,
        scroll_top,
        viewport_start: scroller.viewport_start,
        viewport,
        scroll_extent: scroller.scroll_extent,
        low_watermark,
        high_watermark,
        low_watermark_index,
        high_watermark_index,
        space_before: state.space_before(),
        top_sentinel,
        bottom_sentinel,
        chunks,
        stats,
        scroll_index,
        page,
        chunk_length,
        generation: state.generation(),
        time: Instant::now(),
    })
}

/// Item nodes from `items.first` through `items.last`, at most `limit`.
fn rendered_items(surface: &dyn MeasurementSurface, items: ChunkItems, limit: usize) -> usize {
    let mut node = items.first;
    let mut count = 1;
    while node != items.last && count < limit {
        match surface.next_sibling(node) {
            Some(next) => {
                node = next;
                count += 1;
            }
            None => break,
        }
    }
    count
}

/// Where the two-frame re-measure sequence currently stands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum ScheduledMeasure {
    #[default]
    Idle,
    /// Waiting for the frame right after the change was painted.
    FirstFrame(FrameCallbackId),
    /// Waiting for the follow-up frame that catches late layout.
    SecondFrame(FrameCallbackId),
}

#[derive(Debug, Default)]
pub(crate) struct MeasureLoop {
    pub(crate) flags: IntersectionFlags,
    pub(crate) scheduled: ScheduledMeasure,
}

impl MeasureLoop {
    pub(crate) fn is_scheduled(&self) -> bool {
        self.scheduled != ScheduledMeasure::Idle
    }

    pub(crate) fn cancel(&mut self, scheduler: &dyn FrameScheduler) {
        match std::mem::take(&mut self.scheduled) {
            ScheduledMeasure::FirstFrame(id) | ScheduledMeasure::SecondFrame(id) => {
                scheduler.cancel_frame(id)
            }
            ScheduledMeasure::Idle => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_list::config::VirtualListConfig;
    use crate::virtual_list::test_support::StaticLayout;
    use crate::virtual_list::virtual_state::TotalCount;
    use strata_core::ManualFrameClock;

    #[test]
    fn first_measurement_folds_seed_chunk() {
        let mut state = VirtualState::new(&VirtualListConfig::default());
        state.set_total(TotalCount::Known(1000));
        let layout = StaticLayout::uniform(&state, 85.0, 600.0, 0.0);

        let msrm = measure(&state, &layout, IntersectionFlags { top: true, bottom: true }).unwrap();

        assert_eq!(msrm.chunks.len(), 1);
        assert!((msrm.chunks[0].extent - 850.0).abs() < 1e-3);
        assert_eq!(msrm.stats.measured_items_count, 10);
        assert!((msrm.stats.average_item_length - 85.0).abs() < 1e-4);
        assert_eq!(msrm.page, 8);
        assert_eq!(msrm.chunk_length, 5);
        assert_eq!(msrm.scroll_index, 0);
        assert_eq!(msrm.low_watermark, -300.0);
        assert_eq!(msrm.high_watermark, 900.0);
        assert_eq!(msrm.generation, state.generation());
    }

    #[test]
    fn measured_chunks_are_not_folded_twice() {
        let mut state = VirtualState::new(&VirtualListConfig::default());
        let layout = StaticLayout::uniform(&state, 85.0, 600.0, 0.0);
        let first = measure(&state, &layout, IntersectionFlags::default()).unwrap();
        state.record_chunk_measurements(&first.chunks);
        state.set_stats(first.stats);

        let second = measure(&state, &layout, IntersectionFlags::default()).unwrap();

        assert_eq!(second.stats, first.stats);
    }

    #[test]
    fn short_chunk_folds_rendered_items_only() {
        let mut state = VirtualState::new(&VirtualListConfig::default());
        state.set_total(TotalCount::Known(1000));
        let seed = state.chunks()[0].id;
        let layout = StaticLayout::uniform(&state, 90.0, 600.0, 0.0).with_rendered(seed, 4);

        let msrm = measure(&state, &layout, IntersectionFlags::default()).unwrap();

        assert!((msrm.chunks[0].extent - 360.0).abs() < 1e-3);
        assert_eq!(msrm.chunks[0].count, 10);
        assert_eq!(msrm.stats.measured_items_count, 4);
        assert!((msrm.stats.average_item_length - 90.0).abs() < 1e-4);
    }

    #[test]
    fn placeholder_chunks_are_skipped() {
        let state = VirtualState::new(&VirtualListConfig::default());
        let layout = StaticLayout::uniform(&state, 85.0, 600.0, 0.0).without_items();

        let msrm = measure(&state, &layout, IntersectionFlags::default()).unwrap();

        assert!(msrm.chunks.is_empty());
        assert_eq!(msrm.stats.measured_items_count, 0);
        assert_eq!(msrm.stats.average_item_length, 80.0);
    }

    #[test]
    fn scroll_index_uses_layout_average() {
        let mut state = VirtualState::new(&VirtualListConfig::default());
        state.set_total(TotalCount::Known(1000));
        let layout = StaticLayout::uniform(&state, 100.0, 600.0, 400.0);

        let msrm = measure(&state, &layout, IntersectionFlags::default()).unwrap();

        assert_eq!(msrm.scrolled, 400.0);
        assert_eq!(msrm.scroll_index, 5);
        assert!((msrm.stats.average_item_length - 100.0).abs() < 1e-4);
    }

    #[test]
    fn missing_sentinel_skips_measurement() {
        let state = VirtualState::new(&VirtualListConfig::default());
        let layout = StaticLayout::uniform(&state, 85.0, 600.0, 0.0).without_sentinels();

        assert!(measure(&state, &layout, IntersectionFlags::default()).is_none());
    }

    #[test]
    fn flags_follow_entries() {
        let mut flags = IntersectionFlags::default();
        flags.apply(&[
            IntersectionEntry {
                sentinel: Sentinel::Bottom,
                is_intersecting: true,
            },
            IntersectionEntry {
                sentinel: Sentinel::Top,
                is_intersecting: false,
            },
        ]);
        assert_eq!(flags, IntersectionFlags { top: false, bottom: true });
    }

    #[test]
    fn cancel_clears_pending_frame() {
        let clock = ManualFrameClock::new();
        let id = clock.request_frame(Box::new(|_| {}));
        let mut measure_loop = MeasureLoop {
            scheduled: ScheduledMeasure::SecondFrame(id),
            ..Default::default()
        };

        measure_loop.cancel(&clock);

        assert!(!measure_loop.is_scheduled());
        assert!(!clock.has_pending_frames());
    }
}
