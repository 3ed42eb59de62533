//! Windowed list engine for Strata.
//!
//! Only a contiguous window of items is materialized. The window is split
//! into chunks that are recycled as the user scrolls, and the space of
//! everything outside the window is reserved by two placeholders whose
//! extents come from a running average of measured item lengths.
//!
//! # Architecture
//!
//! - [`VirtualState`] - The window, statistics and placeholder coefficient
//! - [`measure`] - Geometry snapshot of the rendered layout ([`Measurements`])
//! - [`ViewportController`] - Jump, shift-down and shift-up decisions
//! - [`ChunkMaterializer`] - Per-chunk data fetched from a [`RangeDataSource`]
//! - [`VirtualList`] - The handle a host drives: intersections, frames, polling
//!
//! The host supplies geometry through [`MeasurementSurface`], sentinel
//! visibility through [`VisibilityNotifier`] and frame callbacks through
//! [`strata_core::FrameScheduler`], then renders each [`RenderPlan`].
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_foundation::virtual_list::{ListHost, VirtualList, VirtualListConfig};
//!
//! let list = VirtualList::new(VirtualListConfig::default(), host)?;
//! list.subscribe(move || redraw());
//! render(list.render_plan());
//! list.mount()?;
//! ```

mod chunk;
mod config;
mod data_source;
mod error;
mod list;
mod materializer;
mod measure_stats;
mod measurement_loop;
mod measurements;
mod render_plan;
mod surface;
mod viewport_controller;
mod virtual_state;

#[cfg(test)]
mod test_support;

pub use chunk::*;
pub use config::*;
pub use data_source::*;
pub use error::*;
pub use list::*;
pub use materializer::*;
pub use measure_stats::*;
pub use measurement_loop::{measure, IntersectionFlags};
pub use measurements::*;
pub use render_plan::*;
pub use surface::*;
pub use viewport_controller::*;
pub use virtual_state::*;
