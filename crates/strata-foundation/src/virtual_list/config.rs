//! Tuning knobs for a virtual list.

use super::error::VirtualListError;

/// Fraction of a page that one chunk covers.
pub const CHUNK_PAGE_FRACTION: f32 = 0.6;

/// Default extent assumed for an item before anything has been measured.
pub const DEFAULT_ITEM_EXTENT_ESTIMATE: f32 = 80.0;

/// Configuration for [`VirtualList`](super::VirtualList).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VirtualListConfig {
    /// Extra coverage on each side of the viewport, as a fraction of the
    /// viewport extent. Also used as the sentinel observation margin.
    pub margin: f32,
    /// Length of the seed chunk and page size before the first measurement.
    pub init_chunk_length: usize,
    /// Item extent assumed until real items are measured.
    pub init_item_extent: f32,
    /// Upper bound on chunks moved or created by one shift.
    pub max_chunks_per_pass: usize,
}

impl Default for VirtualListConfig {
    fn default() -> Self {
        Self {
            margin: 0.5,
            init_chunk_length: 10,
            init_item_extent: DEFAULT_ITEM_EXTENT_ESTIMATE,
            max_chunks_per_pass: 6,
        }
    }
}

impl VirtualListConfig {
    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_init_chunk_length(mut self, length: usize) -> Self {
        self.init_chunk_length = length;
        self
    }

    pub fn with_init_item_extent(mut self, extent: f32) -> Self {
        self.init_item_extent = extent;
        self
    }

    pub fn with_max_chunks_per_pass(mut self, max: usize) -> Self {
        self.max_chunks_per_pass = max;
        self
    }

    pub fn validate(&self) -> Result<(), VirtualListError> {
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(VirtualListError::InvalidConfig {
                field: "margin",
                reason: "must be a finite, non-negative fraction",
            });
        }
        if self.init_chunk_length == 0 {
            return Err(VirtualListError::InvalidConfig {
                field: "init_chunk_length",
                reason: "must be at least 1",
            });
        }
        if !self.init_item_extent.is_finite() || self.init_item_extent <= 0.0 {
            return Err(VirtualListError::InvalidConfig {
                field: "init_item_extent",
                reason: "must be a finite, positive extent",
            });
        }
        if self.max_chunks_per_pass == 0 {
            return Err(VirtualListError::InvalidConfig {
                field: "max_chunks_per_pass",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}
