use super::chunk::ChunkId;
use std::rc::Rc;

/// What a chunk renders right now.
#[derive(Clone, Debug)]
pub enum ChunkContent<T> {
    /// Loaded items, in index order starting at the chunk's `start`.
    Items(Rc<[T]>),
    /// Data not available yet; reserve `extent` units.
    Placeholder { extent: f32 },
}

#[derive(Clone, Debug)]
pub struct ChunkRender<T> {
    pub id: ChunkId,
    pub start: usize,
    pub count: usize,
    pub content: ChunkContent<T>,
}

impl<T> ChunkRender<T> {
    /// Loaded items paired with their logical index. Empty for placeholders.
    pub fn items(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        let items: &[T] = match &self.content {
            ChunkContent::Items(items) => items,
            ChunkContent::Placeholder { .. } => &[],
        };
        items
            .iter()
            .enumerate()
            .map(move |(offset, item)| (self.start + offset, item))
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.content, ChunkContent::Placeholder { .. })
    }
}

/// Everything a host needs to render the list: two spacers around the
/// chunks, in the order they must appear.
#[derive(Clone, Debug)]
pub struct RenderPlan<T> {
    pub space_before: f32,
    pub space_after: f32,
    pub chunks: Vec<ChunkRender<T>>,
}

impl<T> RenderPlan<T> {
    /// Loaded items across all chunks, keyed by logical index.
    pub fn items(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.chunks.iter().flat_map(|chunk| chunk.items())
    }

    pub fn placeholder_count(&self) -> usize {
        self.chunks.iter().filter(|chunk| chunk.is_placeholder()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_are_keyed_by_logical_index() {
        let plan = RenderPlan {
            space_before: 800.0,
            space_after: 0.0,
            chunks: vec![
                ChunkRender {
                    id: ChunkId(3),
                    start: 10,
                    count: 2,
                    content: ChunkContent::Items(Rc::from(vec!["a", "b"])),
                },
                ChunkRender {
                    id: ChunkId(4),
                    start: 12,
                    count: 3,
                    content: ChunkContent::Placeholder { extent: 240.0 },
                },
            ],
        };

        let items: Vec<(usize, &str)> = plan.items().map(|(index, item)| (index, *item)).collect();
        assert_eq!(items, vec![(10, "a"), (11, "b")]);
        assert_eq!(plan.placeholder_count(), 1);
    }
}
