//! The engine handle tying state, measurement, scheduling and data together.

use super::chunk::ChunkId;
use super::config::VirtualListConfig;
use super::data_source::{Fetch, FetchFuture, RangeDataSource};
use super::error::VirtualListError;
use super::materializer::{ChunkMaterializer, SlotState};
use super::measurement_loop::{measure, IntersectionFlags, MeasureLoop, ScheduledMeasure};
use super::measurements::Measurements;
use super::render_plan::{ChunkContent, ChunkRender, RenderPlan};
use super::surface::{
    IntersectionEntry, IntersectionListener, MeasurementSurface, Sentinel, VisibilityNotifier,
};
use super::viewport_controller::{ViewportAction, ViewportController};
use super::virtual_state::{TotalCount, VirtualState};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::task::Poll;
use strata_core::{
    equals_epsilon, FrameScheduler, Memo, Store, SubscriptionId, WakeFlag, PIXELS_EPS,
};

/// Services a host provides to a [`VirtualList`].
pub struct ListHost<T> {
    pub surface: Rc<dyn MeasurementSurface>,
    pub notifier: Rc<dyn VisibilityNotifier>,
    pub scheduler: Rc<dyn FrameScheduler>,
    pub source: Rc<dyn RangeDataSource<T>>,
}

impl<T> Clone for ListHost<T> {
    fn clone(&self) -> Self {
        Self {
            surface: Rc::clone(&self.surface),
            notifier: Rc::clone(&self.notifier),
            scheduler: Rc::clone(&self.scheduler),
            source: Rc::clone(&self.source),
        }
    }
}

struct ListInner<T> {
    config: VirtualListConfig,
    controller: ViewportController,
    state: Store<VirtualState>,
    data: RefCell<ChunkMaterializer<T>>,
    pending_total: RefCell<Option<FetchFuture<usize>>>,
    wake: WakeFlag,
    measure_loop: RefCell<MeasureLoop>,
    mounted: Cell<bool>,
    space_before: Memo<f32>,
    space_after: Memo<f32>,
    host: ListHost<T>,
}

/// A windowed list over a [`RangeDataSource`].
///
/// Lifecycle: [`new`](Self::new) creates the window and starts fetching, the
/// host renders [`render_plan`](Self::render_plan), then
/// [`mount`](Self::mount) starts observing the sentinels. The host calls
/// [`pump`](Self::pump) from its event loop whenever
/// [`needs_poll`](Self::needs_poll) is set and re-renders after every
/// notification from [`subscribe`](Self::subscribe).
pub struct VirtualList<T> {
    inner: Rc<ListInner<T>>,
}

impl<T> Clone for VirtualList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Non-owning handle to a [`VirtualList`], for callbacks held by the host.
pub struct WeakVirtualList<T> {
    inner: Weak<ListInner<T>>,
}

impl<T> Clone for WeakVirtualList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> WeakVirtualList<T> {
    pub fn upgrade(&self) -> Option<VirtualList<T>> {
        self.inner.upgrade().map(|inner| VirtualList { inner })
    }
}

impl<T: 'static> VirtualList<T> {
    pub fn new(config: VirtualListConfig, host: ListHost<T>) -> Result<Self, VirtualListError> {
        config.validate()?;
        let wake = WakeFlag::new();
        let list = Self {
            inner: Rc::new(ListInner {
                config,
                controller: ViewportController::new(&config),
                state: Store::new(VirtualState::new(&config)),
                data: RefCell::new(ChunkMaterializer::with_wake_flag(wake.clone())),
                pending_total: RefCell::new(None),
                wake,
                measure_loop: RefCell::new(MeasureLoop::default()),
                mounted: Cell::new(false),
                space_before: Memo::with_equality(equals_epsilon(PIXELS_EPS)),
                space_after: Memo::with_equality(equals_epsilon(PIXELS_EPS)),
                host,
            }),
        };
        list.request_total();
        list.inner.state.batch(|| list.sync_data());
        Ok(list)
    }

    /// Start observing the sentinels. Both must already be rendered.
    pub fn mount(&self) -> Result<(), VirtualListError> {
        for which in [Sentinel::Top, Sentinel::Bottom] {
            if self.inner.host.surface.sentinel(which).is_none() {
                return Err(VirtualListError::MissingSentinel { which });
            }
        }
        if self.inner.mounted.replace(true) {
            return Ok(());
        }
        let weak = Rc::downgrade(&self.inner);
        let listener: IntersectionListener = Rc::new(move |entries: &[IntersectionEntry]| {
            if let Some(list) = Self::upgrade(&weak) {
                list.handle_intersection(entries);
            }
        });
        let margin = self.inner.config.margin;
        let notifier = &self.inner.host.notifier;
        notifier.observe(Sentinel::Top, margin, Rc::clone(&listener));
        notifier.observe(Sentinel::Bottom, margin, listener);
        log::debug!("Mounted virtual list, window {:?}", self.window());
        self.schedule_measure();
        Ok(())
    }

    /// Stop observing and cancel any scheduled measurement.
    pub fn unmount(&self) {
        if !self.inner.mounted.replace(false) {
            return;
        }
        self.inner.host.notifier.disconnect();
        self.inner
            .measure_loop
            .borrow_mut()
            .cancel(&*self.inner.host.scheduler);
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.get()
    }

    /// Record sentinel transitions, cancel the pending re-measure and measure
    /// right away.
    pub fn handle_intersection(&self, entries: &[IntersectionEntry]) {
        {
            let mut measure_loop = self.inner.measure_loop.borrow_mut();
            measure_loop.flags.apply(entries);
            measure_loop.cancel(&*self.inner.host.scheduler);
        }
        self.measure_and_update();
    }

    /// Take a snapshot and apply it. Schedules a follow-up measurement when
    /// the window changed. Returns whether it changed.
    pub fn measure_and_update(&self) -> bool {
        if !self.inner.mounted.get() {
            return false;
        }
        let flags = self.inner.measure_loop.borrow().flags;
        let snapshot = self
            .inner
            .state
            .with(|state| measure(state, &*self.inner.host.surface, flags));
        let Some(mut msrm) = snapshot else {
            return false;
        };
        let changed = self.update_viewport(&mut msrm);
        if changed {
            self.schedule_measure();
        }
        changed
    }

    /// Apply a snapshot to the window in one batch.
    ///
    /// Returns whether the window changed. Failures are logged.
    pub fn update_viewport(&self, msrm: &mut Measurements) -> bool {
        match self.try_update_viewport(msrm) {
            Ok(action) => action.changed(),
            Err(err) => {
                log::warn!("Viewport update failed: {}", err);
                false
            }
        }
    }

    /// Like [`update_viewport`](Self::update_viewport), but reports the
    /// controller's decision.
    pub fn try_update_viewport(
        &self,
        msrm: &mut Measurements,
    ) -> Result<ViewportAction, VirtualListError> {
        let state = &self.inner.state;
        if state.with(|state| state.generation()) != msrm.generation {
            return Ok(ViewportAction::Stale);
        }
        let action = state.batch(|| {
            let result = state.update(|state| self.inner.controller.update_viewport(state, msrm));
            if matches!(result, Ok(action) if action.changed()) {
                self.sync_data();
            }
            result
        })?;
        Ok(action)
    }

    /// Measure after the next frame, and once more on the frame after that.
    ///
    /// Does nothing while a sequence is already scheduled.
    pub fn schedule_measure(&self) {
        if !self.inner.mounted.get() {
            return;
        }
        let mut measure_loop = self.inner.measure_loop.borrow_mut();
        if measure_loop.is_scheduled() {
            return;
        }
        let weak = Rc::downgrade(&self.inner);
        let id = self.inner.host.scheduler.request_frame(Box::new(move |_| {
            if let Some(list) = Self::upgrade(&weak) {
                list.run_first_frame();
            }
        }));
        measure_loop.scheduled = ScheduledMeasure::FirstFrame(id);
    }

    pub fn is_measure_scheduled(&self) -> bool {
        self.inner.measure_loop.borrow().is_scheduled()
    }

    fn run_first_frame(&self) {
        if !matches!(
            self.inner.measure_loop.borrow().scheduled,
            ScheduledMeasure::FirstFrame(_)
        ) {
            return;
        }
        self.measure_and_update();

        let mut measure_loop = self.inner.measure_loop.borrow_mut();
        // An intersection during the measurement restarts the sequence.
        if !matches!(measure_loop.scheduled, ScheduledMeasure::FirstFrame(_)) {
            return;
        }
        let weak = Rc::downgrade(&self.inner);
        let id = self.inner.host.scheduler.request_frame(Box::new(move |_| {
            if let Some(list) = Self::upgrade(&weak) {
                list.run_second_frame();
            }
        }));
        measure_loop.scheduled = ScheduledMeasure::SecondFrame(id);
    }

    fn run_second_frame(&self) {
        {
            let mut measure_loop = self.inner.measure_loop.borrow_mut();
            if !matches!(measure_loop.scheduled, ScheduledMeasure::SecondFrame(_)) {
                return;
            }
            measure_loop.scheduled = ScheduledMeasure::Idle;
        }
        self.measure_and_update();
    }

    /// Whether an in-flight fetch made progress and should be polled.
    pub fn needs_poll(&self) -> bool {
        self.inner.wake.is_raised()
            && (self.inner.data.borrow().has_pending() || self.inner.pending_total.borrow().is_some())
    }

    pub fn has_pending_fetches(&self) -> bool {
        self.inner.data.borrow().has_pending() || self.inner.pending_total.borrow().is_some()
    }

    /// Poll in-flight fetches. Arrived data is published to subscribers and a
    /// measurement is scheduled so the new layout feeds the statistics.
    pub fn pump(&self) -> usize {
        let settled = self.inner.data.borrow_mut().poll();
        if settled > 0 {
            self.inner.state.update(|state| state.mark_content_changed());
            self.schedule_measure();
        }
        settled + usize::from(self.poll_total())
    }

    /// Fetch again every chunk whose last fetch failed.
    pub fn retry_failed(&self) -> usize {
        let retried = self
            .inner
            .data
            .borrow_mut()
            .retry_failed(&*self.inner.host.source);
        if retried > 0 {
            self.inner.state.update(|state| state.mark_content_changed());
            self.schedule_measure();
        }
        retried
    }

    /// Ask the data source for the item count again.
    pub fn refresh_total(&self) {
        self.request_total();
    }

    /// Apply a new item count, shrinking the window if it reaches past it.
    pub fn set_total(&self, total: usize) {
        let state = &self.inner.state;
        state.batch(|| {
            let retracted = state.update(|state| state.set_total(TotalCount::Known(total)));
            if retracted {
                log::debug!("Window retracted to {:?} for total {}", self.window(), total);
                self.sync_data();
            }
        });
        self.schedule_measure();
    }

    pub fn total(&self) -> TotalCount {
        self.inner.state.with(|state| state.total())
    }

    pub fn window(&self) -> std::ops::Range<usize> {
        self.inner.state.with(|state| state.window())
    }

    pub fn intersections(&self) -> IntersectionFlags {
        self.inner.measure_loop.borrow().flags
    }

    pub fn config(&self) -> &VirtualListConfig {
        &self.inner.config
    }

    /// Shared handle to the window state. Mutate it only through the list.
    pub fn state(&self) -> &Store<VirtualState> {
        &self.inner.state
    }

    pub fn chunk_state(&self, id: ChunkId) -> Option<SlotState> {
        self.inner.data.borrow().state(id)
    }

    /// Called after every batch of changes that affects rendering.
    pub fn subscribe(&self, observer: impl Fn() + 'static) -> SubscriptionId {
        self.inner.state.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.state.unsubscribe(id)
    }

    /// Placeholder extent before the window, stable to within a hundredth of a
    /// unit.
    pub fn space_before(&self) -> f32 {
        self.inner
            .space_before
            .get(&self.inner.state, VirtualState::space_before)
    }

    pub fn space_after(&self) -> f32 {
        self.inner
            .space_after
            .get(&self.inner.state, VirtualState::space_after)
    }

    pub fn render_plan(&self) -> RenderPlan<T> {
        let space_before = self.space_before();
        let space_after = self.space_after();
        let data = self.inner.data.borrow();
        let chunks = self.inner.state.with(|state| {
            state
                .chunks()
                .iter()
                .map(|chunk| ChunkRender {
                    id: chunk.id,
                    start: chunk.start,
                    count: chunk.count,
                    content: match data.items(chunk) {
                        Some(items) => ChunkContent::Items(items),
                        None => ChunkContent::Placeholder {
                            extent: chunk.expected_extent,
                        },
                    },
                })
                .collect()
        });
        RenderPlan {
            space_before,
            space_after,
            chunks,
        }
    }

    pub fn downgrade(&self) -> WeakVirtualList<T> {
        WeakVirtualList {
            inner: Rc::downgrade(&self.inner),
        }
    }

    fn upgrade(weak: &Weak<ListInner<T>>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn sync_data(&self) {
        let report = self.inner.state.with(|state| {
            self.inner
                .data
                .borrow_mut()
                .sync(state.chunks(), &*self.inner.host.source)
        });
        if report.ready > 0 {
            self.inner.state.update(|state| state.mark_content_changed());
        }
    }

    fn request_total(&self) {
        match self.inner.host.source.fetch_total() {
            Fetch::Ready(Ok(total)) => self.set_total(total),
            Fetch::Ready(Err(err)) => log::warn!("Total count unavailable: {}", err),
            Fetch::Pending(future) => {
                *self.inner.pending_total.borrow_mut() = Some(future);
                self.inner.wake.raise();
            }
        }
    }

    fn poll_total(&self) -> bool {
        let result = {
            let mut pending = self.inner.pending_total.borrow_mut();
            let Some(future) = pending.as_mut() else {
                return false;
            };
            match self.inner.wake.poll(future.as_mut()) {
                Poll::Pending => return false,
                Poll::Ready(result) => {
                    *pending = None;
                    result
                }
            }
        };
        match result {
            Ok(total) => self.set_total(total),
            Err(err) => log::warn!("Total count unavailable: {}", err),
        }
        true
    }
}

impl<T> Drop for ListInner<T> {
    fn drop(&mut self) {
        if self.mounted.get() {
            self.host.notifier.disconnect();
            self.measure_loop.get_mut().cancel(&*self.host.scheduler);
        }
    }
}
