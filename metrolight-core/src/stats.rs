//! Render-wide diagnostic counters. Cheap relaxed atomics so hot paths can
//! bump them from any thread; reported once at the end of a render.

use std::sync::atomic::{AtomicU64, Ordering};

use log::info;

pub static INTERSECTION_TESTS: AtomicU64 = AtomicU64::new(0);
pub static SHADOW_TESTS: AtomicU64 = AtomicU64::new(0);
pub static PATHS_TRACED: AtomicU64 = AtomicU64::new(0);
pub static DEGENERATE_SAMPLES: AtomicU64 = AtomicU64::new(0);
pub static MLT_PROPOSALS: AtomicU64 = AtomicU64::new(0);
pub static MLT_ACCEPTED: AtomicU64 = AtomicU64::new(0);

#[inline]
pub fn inc(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

pub fn report() {
    info!(
        "stats: {} intersection tests, {} shadow tests, {} paths traced",
        INTERSECTION_TESTS.load(Ordering::Relaxed),
        SHADOW_TESTS.load(Ordering::Relaxed),
        PATHS_TRACED.load(Ordering::Relaxed),
    );
    let degenerate = DEGENERATE_SAMPLES.load(Ordering::Relaxed);
    if degenerate > 0 {
        info!("stats: {} non-finite samples clamped to black", degenerate);
    }
    let proposals = MLT_PROPOSALS.load(Ordering::Relaxed);
    if proposals > 0 {
        info!(
            "stats: {} MLT proposals, {:.1}% accepted",
            proposals,
            100.0 * MLT_ACCEPTED.load(Ordering::Relaxed) as f64 / proposals as f64,
        );
    }
}
