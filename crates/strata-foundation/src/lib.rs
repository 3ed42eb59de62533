//! Foundation building blocks for Strata lists.

#![allow(clippy::type_complexity)]

pub mod virtual_list;

pub use virtual_list::{
    ListHost, RangeDataSource, RenderPlan, TotalCount, VirtualList, VirtualListConfig,
    VirtualListError,
};

pub mod prelude {
    pub use crate::virtual_list::{
        ChunkContent, ChunkId, Fetch, FetchError, IntersectionEntry, ListHost, MeasurementSurface,
        RangeDataSource, RangeRequest, RenderPlan, Sentinel, TotalCount, VirtualList,
        VirtualListConfig, VisibilityNotifier,
    };
    pub use strata_core::{FrameScheduler, ManualFrameClock};
}
