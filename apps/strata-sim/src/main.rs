//! Drives a virtual list through a scripted scroll session and prints the
//! window after every step.
//!
//! Usage: `strata-sim [total] [viewport]`. Set `RUST_LOG=strata_foundation=debug`
//! to see every controller decision.

use anyhow::{bail, Context, Result};
use std::rc::Rc;
use strata_core::ManualFrameClock;
use strata_foundation::virtual_list::{ListHost, VirtualList, VirtualListConfig};
use strata_testing::{IndexSource, SimulatedDocument};

const MAX_FRAMES_PER_STEP: usize = 64;

#[derive(Clone, Copy, Debug)]
enum Step {
    ScrollBy(f32),
    ScrollTo(f32),
    ScrollToEnd,
    SetTotal(usize),
}

fn script(viewport: f32) -> Vec<Step> {
    let mut steps: Vec<Step> = (0..8).map(|_| Step::ScrollBy(viewport * 0.4)).collect();
    steps.push(Step::ScrollTo(viewport * 120.0));
    steps.extend((0..4).map(|_| Step::ScrollBy(-viewport * 0.5)));
    steps.push(Step::ScrollToEnd);
    steps.push(Step::ScrollTo(0.0));
    steps.push(Step::SetTotal(25));
    steps
}

/// Item extents that vary the way text rows of different lengths would.
fn item_extent(index: usize) -> f32 {
    40.0 + ((index * 7919) % 5) as f32 * 18.0
}

struct Simulation {
    clock: ManualFrameClock,
    document: SimulatedDocument,
    source: Rc<IndexSource>,
    list: VirtualList<usize>,
}

impl Simulation {
    fn new(total: usize, viewport: f32) -> Result<Self> {
        let clock = ManualFrameClock::new();
        let document = SimulatedDocument::new(viewport, item_extent).with_list_offset(64.0);
        let source = Rc::new(IndexSource::new(total));
        let host = ListHost {
            surface: Rc::new(document.clone()),
            notifier: Rc::new(document.clone()),
            scheduler: Rc::new(clock.clone()),
            source: source.clone(),
        };
        let list = VirtualList::new(VirtualListConfig::default(), host)
            .context("creating the list")?;
        document.attach(&list);
        list.mount().context("mounting the list")?;
        Ok(Self {
            clock,
            document,
            source,
            list,
        })
    }

    /// Run frames until the list stops scheduling work. Returns the number of
    /// frames it took.
    fn settle(&self) -> usize {
        for frame in 1..=MAX_FRAMES_PER_STEP {
            if self.list.needs_poll() {
                self.list.pump();
            }
            let delivered = self.document.flush_intersections();
            let callbacks = self.clock.advance_frame();
            if delivered == 0 && callbacks == 0 && !self.clock.has_pending_frames() {
                return frame;
            }
        }
        log::warn!("List still busy after {} frames", MAX_FRAMES_PER_STEP);
        MAX_FRAMES_PER_STEP
    }

    fn apply(&self, step: Step) {
        match step {
            Step::ScrollBy(delta) => self.document.scroll_by(delta),
            Step::ScrollTo(offset) => self.document.scroll_to(offset),
            Step::ScrollToEnd => self.document.scroll_to(self.document.content_extent()),
            Step::SetTotal(total) => {
                self.source.set_total(total);
                self.list.refresh_total();
            }
        }
    }

    fn report(&self, label: &str, frames: usize) {
        let visible = self.document.visible_indices();
        let (chunks, stats) = self
            .list
            .state()
            .with(|state| (state.chunks().len(), state.stats()));
        println!(
            "{:<18} scroll {:>9.1}  window {:>11}  chunks {:>2}  visible {:>11}  avg {:>6.2}  frames {:>2}",
            label,
            self.document.scroll_top(),
            format!("{:?}", self.list.window()),
            chunks,
            match (visible.first(), visible.last()) {
                (Some(first), Some(last)) => format!("{first}..={last}"),
                _ => "-".to_string(),
            },
            stats.average_item_length,
            frames,
        );
    }
}

fn parse_arg<T: std::str::FromStr>(value: Option<String>, name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid {name} `{raw}`")),
        None => Ok(default),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut args = std::env::args().skip(1);
    let total: usize = parse_arg(args.next(), "total", 10_000)?;
    let viewport: f32 = parse_arg(args.next(), "viewport", 720.0)?;
    if !(viewport.is_finite() && viewport > 0.0) {
        bail!("viewport must be a positive number, got {viewport}");
    }

    log::info!("Simulating {} items in a {}-unit viewport", total, viewport);
    let sim = Simulation::new(total, viewport)?;
    let frames = sim.settle();
    sim.report("mount", frames);

    for step in script(viewport) {
        sim.apply(step);
        let frames = sim.settle();
        sim.report(&format!("{step:?}"), frames);
    }
    Ok(())
}
