//! Property-based invariant tests for the windowed list.
//!
//! For any item count, item extents and scroll script:
//!
//! 1. The window stays contiguous and inside the item count.
//! 2. The number of measured items never decreases.
//! 3. An empty list never grows its window.
//! 4. Re-applying a snapshot never changes the window a second time.

use proptest::prelude::*;
use std::rc::Rc;
use strata_foundation::virtual_list::{measure, IntersectionFlags, VirtualListConfig};
use strata_testing::{IndexSource, ListTestRule, SimulatedDocument};

const FRAMES: usize = 40;

fn document(viewport: f32, seed: usize) -> SimulatedDocument {
    SimulatedDocument::new(viewport, move |index| {
        30.0 + ((index * 37 + seed) % 90) as f32
    })
}

fn rule(total: usize, viewport: f32, seed: usize, margin: f32) -> ListTestRule<usize> {
    ListTestRule::new(
        VirtualListConfig::default().with_margin(margin),
        document(viewport, seed),
        Rc::new(IndexSource::new(total)),
    )
    .expect("list mounts")
}

fn scroll_script() -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(0.0f32..=1.0, 1..=8)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn window_stays_contiguous_and_bounded(
        total in 0usize..=2000,
        viewport in 200.0f32..=1200.0,
        seed in 0usize..=1000,
        margin in 0.0f32..=1.0,
        script in scroll_script(),
    ) {
        let rule = rule(total, viewport, seed, margin);
        rule.settle(FRAMES);

        for fraction in script {
            let target = fraction * (rule.document().content_extent() - viewport).max(0.0);
            rule.scroll_to(target);
            rule.settle(FRAMES);

            let (consistent, window) = rule
                .list()
                .state()
                .with(|state| (state.is_consistent(), state.window()));
            prop_assert!(consistent);
            prop_assert!(window.end <= total);
            if total == 0 {
                prop_assert_eq!(window, 0..0);
            }
        }
    }

    #[test]
    fn measured_count_is_monotone(
        total in 1usize..=2000,
        viewport in 200.0f32..=1200.0,
        seed in 0usize..=1000,
        script in scroll_script(),
    ) {
        let rule = rule(total, viewport, seed, 0.5);
        let mut measured = 0;

        for fraction in script {
            for _ in 0..FRAMES {
                rule.advance_frame();
                let now = rule
                    .list()
                    .state()
                    .with(|state| state.stats().measured_items_count);
                prop_assert!(now >= measured);
                measured = now;
            }
            let target = fraction * (rule.document().content_extent() - viewport).max(0.0);
            rule.scroll_to(target);
        }
    }

    #[test]
    fn reapplied_snapshot_is_idempotent(
        total in 1usize..=2000,
        viewport in 200.0f32..=1200.0,
        seed in 0usize..=1000,
        fraction in 0.0f32..=1.0,
        top in any::<bool>(),
        bottom in any::<bool>(),
    ) {
        let rule = rule(total, viewport, seed, 0.5);
        rule.settle(FRAMES);
        let target = fraction * (rule.document().content_extent() - viewport).max(0.0);
        rule.document().scroll_to(target);

        let snapshot = rule
            .list()
            .state()
            .with(|state| measure(state, rule.document(), IntersectionFlags { top, bottom }));
        prop_assert!(snapshot.is_some());
        let snapshot = snapshot.unwrap();

        rule.list().update_viewport(&mut snapshot.clone());
        let chunks = rule.list().state().with(|state| state.chunks().to_vec());

        prop_assert!(!rule.list().update_viewport(&mut snapshot.clone()));
        let again = rule.list().state().with(|state| state.chunks().to_vec());
        prop_assert_eq!(chunks, again);
    }
}
