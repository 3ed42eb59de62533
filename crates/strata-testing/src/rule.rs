use std::ops::Range;
use std::rc::Rc;
use strata_core::ManualFrameClock;
use strata_foundation::virtual_list::{
    ListHost, RangeDataSource, VirtualList, VirtualListConfig, VirtualListError,
};

use crate::document::SimulatedDocument;

/// What happened during one [`ListTestRule::advance_frame`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Fetches that settled while pumping.
    pub settled: usize,
    /// Intersection entries delivered.
    pub intersections: usize,
    /// Frame callbacks that ran.
    pub callbacks: usize,
}

impl FrameReport {
    pub fn is_quiet(&self) -> bool {
        self.settled == 0 && self.intersections == 0 && self.callbacks == 0
    }
}

/// Headless harness driving a mounted [`VirtualList`] frame by frame.
///
/// `ListTestRule` owns a manual frame clock and a [`SimulatedDocument`]
/// standing in for the browser. Each frame polls arrived data, delivers
/// intersection changes and runs scheduled frame callbacks, in that order.
pub struct ListTestRule<T> {
    clock: ManualFrameClock,
    document: SimulatedDocument,
    list: VirtualList<T>,
}

impl<T: 'static> ListTestRule<T> {
    /// Create the list, render it into `document` and mount it.
    pub fn new(
        config: VirtualListConfig,
        document: SimulatedDocument,
        source: Rc<dyn RangeDataSource<T>>,
    ) -> Result<Self, VirtualListError> {
        let clock = ManualFrameClock::new();
        let host = ListHost {
            surface: Rc::new(document.clone()),
            notifier: Rc::new(document.clone()),
            scheduler: Rc::new(clock.clone()),
            source,
        };
        let list = VirtualList::new(config, host)?;
        document.attach(&list);
        list.mount()?;
        Ok(Self {
            clock,
            document,
            list,
        })
    }

    pub fn advance_frame(&self) -> FrameReport {
        let settled = if self.list.needs_poll() {
            self.list.pump()
        } else {
            0
        };
        let intersections = self.document.flush_intersections();
        let callbacks = self.clock.advance_frame();
        FrameReport {
            settled,
            intersections,
            callbacks,
        }
    }

    /// Advance frames until nothing is left to do. Returns `false` if the
    /// list was still busy after `max_frames`.
    pub fn settle(&self, max_frames: usize) -> bool {
        for _ in 0..max_frames {
            let report = self.advance_frame();
            if report.is_quiet() && self.is_idle() {
                return true;
            }
        }
        self.is_idle()
    }

    /// No scheduled frames, undelivered intersections or arrived data.
    pub fn is_idle(&self) -> bool {
        !self.clock.has_pending_frames()
            && !self.document.has_pending_intersections()
            && !self.list.needs_poll()
    }

    pub fn scroll_to(&self, offset: f32) {
        self.document.scroll_to(offset);
    }

    pub fn scroll_by(&self, delta: f32) {
        self.document.scroll_by(delta);
    }

    pub fn list(&self) -> &VirtualList<T> {
        &self.list
    }

    pub fn document(&self) -> &SimulatedDocument {
        &self.document
    }

    pub fn clock(&self) -> &ManualFrameClock {
        &self.clock
    }

    pub fn window(&self) -> Range<usize> {
        self.list.window()
    }

    pub fn visible_indices(&self) -> Vec<usize> {
        self.document.visible_indices()
    }
}

/// Convenience helper for tests over an index-valued source.
pub fn run_list_test<R>(
    config: VirtualListConfig,
    document: SimulatedDocument,
    source: Rc<dyn RangeDataSource<usize>>,
    f: impl FnOnce(&ListTestRule<usize>) -> R,
) -> Result<R, VirtualListError> {
    let rule = ListTestRule::new(config, document, source)?;
    Ok(f(&rule))
}
