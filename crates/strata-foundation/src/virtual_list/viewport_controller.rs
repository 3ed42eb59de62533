//! Window maintenance driven by measurement snapshots.
//!
//! Each pass makes at most one structural decision, checked in this order:
//!
//! 1. **Jump**: the scroll position is farther from the window than the
//!    window can cover; rebuild it around the scroll position.
//! 2. **Shift down**: the bottom sentinel is near the viewport; extend the
//!    window forward, recycling chunks that scrolled off the top.
//! 3. **Shift up**: the top sentinel is near the viewport; extend the window
//!    backward, recycling chunks that scrolled off the bottom.
//!
//! After the decision the space-above coefficient is recomputed so that
//! content on screen keeps its position even though `space_before` is now
//! derived from a different first index and average.

use super::config::VirtualListConfig;
use super::error::StateError;
use super::measurements::Measurements;
use super::surface::Span;
use super::virtual_state::VirtualState;
use smallvec::SmallVec;
use std::ops::Range;

type RangePlan = SmallVec<[Range<usize>; 8]>;

/// Outcome of one controller pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewportAction {
    /// The snapshot was taken against an older window and was ignored.
    Stale,
    /// Nothing structural changed.
    Idle,
    Jump { from: usize, to: usize },
    ShiftDown { recycled: usize, created: usize },
    ShiftUp { recycled: usize, created: usize },
}

impl ViewportAction {
    /// Whether the window changed structurally.
    pub fn changed(&self) -> bool {
        matches!(
            self,
            ViewportAction::Jump { .. }
                | ViewportAction::ShiftDown { .. }
                | ViewportAction::ShiftUp { .. }
        )
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ViewportController {
    max_chunks_per_pass: usize,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(&VirtualListConfig::default())
    }
}

impl ViewportController {
    pub fn new(config: &VirtualListConfig) -> Self {
        Self {
            max_chunks_per_pass: config.max_chunks_per_pass.max(1),
        }
    }

    /// Apply `msrm` to `state`.
    ///
    /// Applying the same snapshot twice is a no-op the second time: either the
    /// first pass changed the window (and the snapshot is now stale) or it
    /// only recorded values the second pass reproduces.
    pub fn update_viewport(
        &self,
        state: &mut VirtualState,
        msrm: &mut Measurements,
    ) -> Result<ViewportAction, StateError> {
        if msrm.generation != state.generation() {
            log::trace!(
                "Ignoring stale measurements (generation {} != {})",
                msrm.generation,
                state.generation()
            );
            return Ok(ViewportAction::Stale);
        }

        state.record_chunk_measurements(&msrm.chunks);
        state.set_stats(msrm.stats);

        let action = if let Some(target) = self.jump_target(state, msrm) {
            self.jump(state, msrm, target)
        } else {
            let down = if msrm.bottom_intersects {
                self.shift_down(state, msrm)?
            } else {
                ViewportAction::Idle
            };
            if down.changed() || !msrm.top_intersects {
                down
            } else {
                self.shift_up(state, msrm)?
            }
        };

        self.update_virtual_spaces(state, msrm, action);
        state.record_measurements(msrm.clone());
        Ok(action)
    }

    fn jump_target(&self, state: &VirtualState, msrm: &Measurements) -> Option<usize> {
        if !msrm.any_intersects() || msrm.scroll_index == 0 {
            return None;
        }
        let total = state.total().known().filter(|total| *total > 0)?;
        let first = state.first_index();
        let reach = msrm.page.saturating_mul(state.chunks().len().max(1));
        if msrm.scroll_index.abs_diff(first) <= reach {
            return None;
        }
        let span = msrm.chunk_length.saturating_mul(state.chunks().len().max(1));
        let target = msrm
            .scroll_index
            .saturating_sub(msrm.page)
            .min(total.saturating_sub(span));
        Some(target)
    }

    fn jump(&self, state: &mut VirtualState, msrm: &Measurements, start: usize) -> ViewportAction {
        let total = state.total().known().unwrap_or(0);
        let slots = state.chunks().len().max(1);
        let mut ranges = RangePlan::new();
        let mut next = start;
        while ranges.len() < slots && next < total {
            let end = (next + msrm.chunk_length).min(total);
            ranges.push(next..end);
            next = end;
        }
        if ranges.is_empty() {
            return ViewportAction::Idle;
        }
        let from = state.first_index();
        log::debug!(
            "Jump from {} to {} (scroll index {}, page {})",
            from,
            start,
            msrm.scroll_index,
            msrm.page
        );
        state.replace_window(&ranges);
        ViewportAction::Jump { from, to: start }
    }

    fn shift_down(
        &self,
        state: &mut VirtualState,
        msrm: &mut Measurements,
    ) -> Result<ViewportAction, StateError> {
        let Some(total) = state.total().known() else {
            return Ok(ViewportAction::Idle);
        };
        let end = state.end_index();
        let items_left = total.saturating_sub(end);
        if items_left == 0 {
            return Ok(ViewportAction::Idle);
        }
        let average = msrm.stats.average_item_length;
        let spans = chunk_spans(state, msrm);
        let tail_end = spans.last().map(|span| span.end).unwrap_or(msrm.bottom_sentinel.start);
        let need_to_cover = msrm.high_watermark - tail_end;
        log::debug!("Need to cover {:.1} below index {}", need_to_cover, end);
        if need_to_cover < average * -0.5 {
            return Ok(ViewportAction::Idle);
        }

        let items_needed = items_for_extent(need_to_cover, average).min(items_left);
        let plan = self.plan_forward(end, items_needed, msrm.chunk_length);

        let recyclable = spans
            .iter()
            .take_while(|span| span.end <= msrm.low_watermark)
            .count();
        let recycled = recyclable.min(plan.len());
        for span in &spans[..recycled] {
            msrm.compensation_delta += span.extent();
        }
        state.rotate_to_back(recycled);
        let moved: SmallVec<[_; 8]> = state.chunks()[state.chunks().len() - recycled..]
            .iter()
            .map(|chunk| chunk.id)
            .collect();
        for (id, range) in moved.iter().zip(&plan) {
            state.set_chunk(*id, range.start, range.len())?;
        }
        for range in &plan[recycled..] {
            state.push_chunk(range.start, range.len());
        }

        log::debug!(
            "Shift down: {} items in {} chunks ({} recycled), window {:?}",
            items_needed,
            plan.len(),
            recycled,
            state.window()
        );
        Ok(ViewportAction::ShiftDown {
            recycled,
            created: plan.len() - recycled,
        })
    }

    fn shift_up(
        &self,
        state: &mut VirtualState,
        msrm: &mut Measurements,
    ) -> Result<ViewportAction, StateError> {
        let first = state.first_index();
        if first == 0 {
            return Ok(ViewportAction::Idle);
        }
        let average = msrm.stats.average_item_length;
        let spans = chunk_spans(state, msrm);
        let head_start = spans.first().map(|span| span.start).unwrap_or(msrm.top_sentinel.end);
        let need_to_cover = head_start - msrm.low_watermark;
        // Stricter than shift-down so the two directions cannot ping-pong on
        // sub-item noise.
        if need_to_cover < average * 0.5 {
            return Ok(ViewportAction::Idle);
        }

        let items_needed = items_for_extent(need_to_cover, average).min(first);
        let plan = self.plan_backward(first, items_needed, msrm.chunk_length);

        let movable = spans
            .iter()
            .rev()
            .take_while(|span| span.start >= msrm.high_watermark)
            .count();
        // Keep at least one chunk in place so the window stays anchored.
        let recycled = movable.min(plan.len()).min(state.chunks().len() - 1);
        state.rotate_to_front(recycled);
        let moved: SmallVec<[_; 8]> = state.chunks()[..recycled]
            .iter()
            .map(|chunk| chunk.id)
            .collect();
        // `plan` runs away from the head; the moved chunks sit in ascending
        // order, so the last of them takes the range adjacent to the head.
        for (id, range) in moved.iter().rev().zip(&plan) {
            state.set_chunk(*id, range.start, range.len())?;
        }
        for range in &plan[recycled..] {
            state.insert_chunk_front(range.start, range.len());
        }
        let added_items: usize = plan.iter().map(|range| range.len()).sum();
        msrm.compensation_delta -= added_items as f32 * average;

        log::debug!(
            "Shift up: {} items in {} chunks ({} recycled), window {:?}",
            added_items,
            plan.len(),
            recycled,
            state.window()
        );
        Ok(ViewportAction::ShiftUp {
            recycled,
            created: plan.len() - recycled,
        })
    }

    fn update_virtual_spaces(&self, state: &mut VirtualState, msrm: &Measurements, action: ViewportAction) {
        let coeff = if let ViewportAction::Jump { .. } = action {
            1.0
        } else {
            let expected = msrm.space_before + msrm.compensation_delta;
            let computed = state.first_index() as f32 * state.average_item_length();
            if computed > 0.0 {
                (expected / computed).max(0.0)
            } else {
                1.0
            }
        };
        if coeff != state.space_above_coeff() {
            log::debug!(
                "Space above coefficient {:.4} -> {:.4}",
                state.space_above_coeff(),
                coeff
            );
        }
        state.set_space_above_coeff(coeff);
    }

    fn plan_forward(&self, start: usize, items: usize, chunk_length: usize) -> RangePlan {
        let mut plan = RangePlan::new();
        let mut next = start;
        let mut remaining = items;
        while remaining > 0 && plan.len() < self.max_chunks_per_pass {
            let len = chunk_length.min(remaining);
            plan.push(next..next + len);
            next += len;
            remaining -= len;
        }
        plan
    }

    fn plan_backward(&self, end: usize, items: usize, chunk_length: usize) -> RangePlan {
        let mut plan = RangePlan::new();
        let mut next_end = end;
        let mut remaining = items.min(end);
        while remaining > 0 && plan.len() < self.max_chunks_per_pass {
            let len = chunk_length.min(remaining);
            plan.push(next_end - len..next_end);
            next_end -= len;
            remaining -= len;
        }
        plan
    }
}

/// Whole items needed to cover `extent`, at least one.
fn items_for_extent(extent: f32, average: f32) -> usize {
    if average <= 0.0 || !extent.is_finite() {
        return 1;
    }
    ((extent / average).ceil().max(1.0)) as usize
}

/// On-screen span of every chunk, in window order.
///
/// Rendered chunks use their measured span. Placeholders sit between their
/// neighbours at their expected extent.
fn chunk_spans(state: &VirtualState, msrm: &Measurements) -> SmallVec<[Span; 8]> {
    let mut cursor = msrm.top_sentinel.end;
    state
        .chunks()
        .iter()
        .map(|chunk| {
            let span = match msrm.chunk(chunk.id) {
                Some(measurement) => measurement.span,
                None => Span::new(cursor, cursor + chunk.expected_extent),
            };
            cursor = span.end;
            span
        })
        .collect()
}
