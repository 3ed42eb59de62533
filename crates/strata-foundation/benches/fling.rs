use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::rc::Rc;
use strata_foundation::virtual_list::{measure, IntersectionFlags, VirtualListConfig};
use strata_testing::{IndexSource, ListTestRule, SimulatedDocument};

const TOTAL_SAMPLES: &[usize] = &[1_000, 100_000];
const VIEWPORT: f32 = 900.0;
const FLING_STEPS: usize = 120;
const FLING_VELOCITY: f32 = 240.0;
const FRAMES_PER_STEP: usize = 4;

fn fixture(total: usize) -> ListTestRule<usize> {
    let document = SimulatedDocument::new(VIEWPORT, |index| 48.0 + (index % 7) as f32 * 6.0);
    let rule = ListTestRule::new(
        VirtualListConfig::default(),
        document,
        Rc::new(IndexSource::new(total)),
    )
    .expect("list mounts");
    rule.settle(64);
    rule
}

fn bench_fling(c: &mut Criterion) {
    let mut group = c.benchmark_group("fling");
    for &total in TOTAL_SAMPLES {
        group.bench_with_input(BenchmarkId::new("items", total), &total, |b, &total| {
            b.iter(|| {
                let rule = fixture(total);
                let mut velocity = FLING_VELOCITY;
                for _ in 0..FLING_STEPS {
                    rule.scroll_by(velocity);
                    for _ in 0..FRAMES_PER_STEP {
                        rule.advance_frame();
                    }
                    velocity *= 0.98;
                }
                black_box(rule.window());
            });
        });
    }
    group.finish();
}

fn bench_measure(c: &mut Criterion) {
    let mut group = c.benchmark_group("measure");
    for &total in TOTAL_SAMPLES {
        group.bench_with_input(BenchmarkId::new("items", total), &total, |b, &total| {
            let rule = fixture(total);
            rule.scroll_to(VIEWPORT * 3.0);
            rule.settle(64);
            let flags = IntersectionFlags {
                top: true,
                bottom: true,
            };

            b.iter(|| {
                let snapshot = rule
                    .list()
                    .state()
                    .with(|state| measure(state, rule.document(), flags));
                black_box(snapshot);
            });
        });
    }
    group.finish();
}

fn bench_jump(c: &mut Criterion) {
    c.bench_function("jump_to_end", |b| {
        b.iter(|| {
            let rule = fixture(100_000);
            rule.scroll_to(rule.document().content_extent());
            rule.settle(64);
            black_box(rule.window());
        });
    });
}

criterion_group!(fling, bench_fling, bench_measure, bench_jump);
criterion_main!(fling);
