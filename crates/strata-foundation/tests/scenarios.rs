//! End-to-end behaviour of a mounted list inside a simulated document.

use std::rc::Rc;
use strata_foundation::virtual_list::{
    measure, IntersectionFlags, RangeRequest, SlotState, TotalCount, VirtualListConfig,
};
use strata_testing::{
    run_list_test, DeferredSource, FailingSource, IndexSource, ListTestRule, SimulatedDocument,
};

const FRAMES: usize = 100;

fn index_rule(
    total: usize,
    viewport: f32,
    item_extent: f32,
) -> (ListTestRule<usize>, Rc<IndexSource>) {
    let source = Rc::new(IndexSource::new(total));
    let rule = ListTestRule::new(
        VirtualListConfig::default(),
        SimulatedDocument::uniform(viewport, item_extent),
        source.clone(),
    )
    .expect("list mounts");
    (rule, source)
}

fn assert_contiguous(indices: &[usize]) {
    assert!(!indices.is_empty(), "nothing visible");
    for pair in indices.windows(2) {
        assert_eq!(pair[0] + 1, pair[1], "gap in visible items: {indices:?}");
    }
}

#[test]
fn first_measurement_replaces_estimate() {
    let (rule, _) = index_rule(1000, 400.0, 85.0);

    rule.advance_frame();

    let stats = rule.list().state().with(|state| state.stats());
    assert_eq!(stats.measured_items_count, 10);
    assert_eq!(stats.average_item_length, 85.0);
    assert_eq!(rule.window(), 0..10);
    assert_eq!(rule.list().space_after(), 84150.0);
    assert!(rule.settle(FRAMES));
}

#[test]
fn initial_window_fills_viewport() {
    let (rule, _) = index_rule(1000, 600.0, 100.0);

    assert!(rule.settle(FRAMES));

    assert_eq!(rule.visible_indices(), (0..6).collect::<Vec<_>>());
    assert_eq!(rule.list().space_before(), 0.0);
}

#[test]
fn scrolling_down_keeps_viewport_covered() {
    let (rule, _) = index_rule(1000, 600.0, 100.0);
    rule.settle(FRAMES);

    for step in 1..=20 {
        rule.scroll_by(150.0);
        rule.settle(FRAMES);

        let first = (step * 150) / 100;
        let visible = rule.visible_indices();
        assert_contiguous(&visible);
        assert_eq!(visible[0], first, "step {step}");
        assert!(rule.list().state().with(|state| state.is_consistent()));
    }
}

#[test]
fn far_scroll_jumps_to_target() {
    let (rule, _) = index_rule(1000, 800.0, 80.0);
    rule.settle(FRAMES);
    let ids_before: Vec<_> = rule
        .list()
        .state()
        .with(|state| state.chunks().iter().map(|chunk| chunk.id).collect());

    rule.scroll_to(72_000.0);
    rule.advance_frame();

    let window = rule.window();
    assert_eq!(window.start, 890);
    let first_id = rule.list().state().with(|state| state.chunks()[0].id);
    assert_eq!(first_id, ids_before[0]);
    assert_eq!(rule.list().state().with(|state| state.space_above_coeff()), 1.0);

    rule.settle(FRAMES);
    assert_eq!(rule.visible_indices(), (900..910).collect::<Vec<_>>());
}

#[test]
fn far_scroll_back_jumps_to_target() {
    let head = run_list_test(
        VirtualListConfig::default(),
        SimulatedDocument::uniform(800.0, 80.0),
        Rc::new(IndexSource::new(1000)),
        |rule| {
            rule.settle(FRAMES);
            rule.scroll_to(72_000.0);
            rule.settle(FRAMES);
            assert_eq!(rule.visible_indices()[0], 900);

            rule.scroll_to(8_000.0);
            rule.advance_frame();
            assert_eq!(rule.window().start, 90);
            assert_eq!(rule.list().state().with(|state| state.space_above_coeff()), 1.0);

            rule.settle(FRAMES);
            rule.visible_indices()
        },
    )
    .expect("list mounts");

    assert_contiguous(&head);
    assert_eq!(head[0], 100);
}

#[test]
fn scrolling_back_to_top_restores_head() {
    let (rule, _) = index_rule(1000, 600.0, 100.0);
    rule.settle(FRAMES);
    rule.scroll_to(3000.0);
    rule.settle(FRAMES);
    assert_eq!(rule.visible_indices()[0], 30);

    rule.scroll_to(0.0);
    rule.settle(FRAMES);

    assert_eq!(rule.window().start, 0);
    assert_eq!(rule.visible_indices(), (0..6).collect::<Vec<_>>());
    assert_eq!(rule.list().space_before(), 0.0);
}

#[test]
fn shrinking_total_retracts_window() {
    let (rule, source) = index_rule(1000, 600.0, 100.0);
    rule.settle(FRAMES);
    rule.scroll_to(5000.0);
    rule.settle(FRAMES);
    assert!(rule.window().start >= 20);

    source.set_total(20);
    rule.list().refresh_total();

    assert_eq!(rule.list().total(), TotalCount::Known(20));
    assert!(rule.window().end <= 20);
    assert!(!rule.window().is_empty());

    rule.settle(FRAMES);
    let visible = rule.visible_indices();
    assert_contiguous(&visible);
    assert!(visible.iter().all(|index| *index < 20));
    assert_eq!(visible.last(), Some(&19));
    assert_eq!(rule.list().space_after(), 0.0);
}

#[test]
fn empty_list_never_shifts() {
    let (rule, source) = index_rule(0, 600.0, 100.0);

    assert!(rule.settle(FRAMES));

    assert_eq!(rule.window(), 0..0);
    assert_eq!(rule.list().render_plan().items().count(), 0);
    assert!(source.requests().is_empty());
    assert!(rule.visible_indices().is_empty());
}

#[test]
fn stale_snapshot_is_ignored() {
    let (rule, _) = index_rule(1000, 600.0, 100.0);
    rule.settle(FRAMES);
    rule.document().scroll_to(500.0);

    let snapshot = rule.list().state().with(|state| {
        measure(
            state,
            rule.document(),
            IntersectionFlags {
                top: false,
                bottom: true,
            },
        )
    });
    let snapshot = snapshot.expect("sentinels rendered");

    assert!(rule.list().update_viewport(&mut snapshot.clone()));
    let window = rule.window();
    let revision = rule.list().state().revision();

    assert!(!rule.list().update_viewport(&mut snapshot.clone()));
    assert_eq!(rule.window(), window);
    assert_eq!(rule.list().state().revision(), revision);
}

#[test]
fn arriving_data_replaces_placeholders() {
    let source = Rc::new(DeferredSource::new(1000));
    let rule = ListTestRule::new(
        VirtualListConfig::default(),
        SimulatedDocument::uniform(600.0, 100.0),
        source.clone(),
    )
    .expect("list mounts");
    let plan = rule.list().render_plan();
    assert_eq!(plan.placeholder_count(), plan.chunks.len());
    let seed = plan.chunks[0].id;

    rule.advance_frame();
    assert_eq!(
        rule.list().state().with(|state| state.stats().measured_items_count),
        0
    );

    source.resolve_all();
    let report = rule.advance_frame();

    assert!(report.settled >= 1);
    assert_eq!(rule.list().chunk_state(seed), Some(SlotState::Loaded { len: 10 }));
    assert!(rule.list().render_plan().items().any(|(index, item)| index == 0 && *item == 0));

    rule.advance_frame();
    assert!(rule.list().state().with(|state| state.stats().measured_items_count) >= 10);
}

#[test]
fn late_result_for_old_range_is_dropped() {
    let source = Rc::new(DeferredSource::new(1000));
    let rule = ListTestRule::new(
        VirtualListConfig::default(),
        SimulatedDocument::uniform(600.0, 100.0),
        source.clone(),
    )
    .expect("list mounts");
    let seed = rule.list().state().with(|state| state.chunks()[0].id);

    rule.list().set_total(4);
    assert_eq!(
        source.pending(),
        vec![RangeRequest::new(0, 10), RangeRequest::new(0, 4)]
    );

    assert_eq!(source.resolve_next(), Some(RangeRequest::new(0, 10)));
    rule.list().pump();
    assert_eq!(rule.list().chunk_state(seed), Some(SlotState::Loading));

    assert_eq!(source.resolve_next(), Some(RangeRequest::new(0, 4)));
    assert!(rule.list().needs_poll());
    rule.list().pump();
    assert_eq!(rule.list().chunk_state(seed), Some(SlotState::Loaded { len: 4 }));
}

#[test]
fn deferred_total_enables_shifting() {
    let source = Rc::new(DeferredSource::new(1000).with_deferred_total());
    let rule = ListTestRule::new(
        VirtualListConfig::default(),
        SimulatedDocument::uniform(1200.0, 100.0),
        source.clone(),
    )
    .expect("list mounts");
    source.resolve_all();
    rule.settle(FRAMES);
    assert_eq!(rule.list().total(), TotalCount::Unknown);
    assert_eq!(rule.window(), 0..10);

    assert!(source.resolve_total());
    for _ in 0..FRAMES {
        source.resolve_all();
        rule.advance_frame();
    }

    assert_eq!(rule.list().total(), TotalCount::Known(1000));
    assert!(rule.window().end > 10);
}

#[test]
fn failed_chunks_recover_on_retry() {
    let source = Rc::new(FailingSource::new(1000));
    let rule = ListTestRule::new(
        VirtualListConfig::default(),
        SimulatedDocument::uniform(600.0, 100.0),
        source.clone(),
    )
    .expect("list mounts");
    rule.settle(FRAMES);
    let plan = rule.list().render_plan();
    assert_eq!(plan.placeholder_count(), plan.chunks.len());
    assert_eq!(
        rule.list().state().with(|state| state.stats().measured_items_count),
        0
    );

    source.recover();
    let retried = rule.list().retry_failed();

    assert_eq!(retried, plan.chunks.len());
    assert_eq!(rule.list().render_plan().placeholder_count(), 0);
    rule.settle(FRAMES);
    assert!(rule.list().state().with(|state| state.stats().measured_items_count) >= 10);
    assert_contiguous(&rule.visible_indices());
}

#[test]
fn unmount_stops_reacting() {
    let (rule, _) = index_rule(1000, 600.0, 100.0);
    rule.settle(FRAMES);
    rule.list().unmount();
    let window = rule.window();

    rule.scroll_to(3000.0);
    rule.settle(FRAMES);

    assert_eq!(rule.window(), window);
    assert!(!rule.clock().has_pending_frames());
}
