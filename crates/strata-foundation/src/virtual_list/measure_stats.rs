/// Running, count-weighted average of item extents.
///
/// Only chunks that have been rendered with real items contribute; each chunk
/// folds in once per (re)key.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeasureStats {
    pub measured_items_count: usize,
    pub average_item_length: f32,
}

impl MeasureStats {
    pub fn new(init_item_extent: f32) -> Self {
        Self {
            measured_items_count: 0,
            average_item_length: init_item_extent,
        }
    }

    /// Fold `count` items spanning `extent` units into the average.
    ///
    /// With nothing measured yet the seed estimate carries no weight, so the
    /// first fold replaces it.
    pub fn fold(&mut self, extent: f32, count: usize) {
        if count == 0 || !extent.is_finite() || extent < 0.0 {
            return;
        }
        let measured = self.measured_items_count as f32;
        let total = measured + count as f32;
        self.average_item_length = (self.average_item_length * measured + extent) / total;
        self.measured_items_count += count;
    }
}
