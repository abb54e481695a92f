mod evolutionary;
mod neighbor;
mod swarm;

pub use evolutionary::EvolutionaryRefiner;
pub use neighbor::*;
pub use swarm::SwarmRefiner;

use crate::store::ScheduleStore;
use crate::types::{RefinerConfig, RefinerKind, SchedulerConfig, Snapshot};
use std::sync::atomic::AtomicBool;

/// Result of a refinement run. `best_history` records the best-so-far
/// fitness per generation/cycle and is non-decreasing by construction.
#[derive(Debug, Clone)]
pub struct RefineOutcome {
    pub store: ScheduleStore,
    pub driver: &'static str,
    pub initial_fitness: i64,
    pub final_fitness: i64,
    pub iterations: u32,
    pub sessions_moved: usize,
    pub best_history: Vec<i64>,
}

/// A local-search driver over whole-timetable schedules. Both drivers
/// share the fitness function and the mutation kit; they differ only
/// in how the population is steered.
pub trait Refiner: Send + Sync {
    fn name(&self) -> &'static str;

    fn refine(
        &self,
        baseline: &ScheduleStore,
        snapshot: &Snapshot,
        scheduler_config: &SchedulerConfig,
        config: &RefinerConfig,
        seed: u64,
        cancel: &AtomicBool,
    ) -> RefineOutcome;
}

pub fn refiner_for(kind: RefinerKind) -> Box<dyn Refiner> {
    match kind {
        RefinerKind::Evolutionary => Box::new(EvolutionaryRefiner),
        RefinerKind::Swarm => Box::new(SwarmRefiner),
    }
}

/// Run the configured driver with a fresh (never-set) cancel flag
pub fn refine(
    baseline: &ScheduleStore,
    snapshot: &Snapshot,
    scheduler_config: &SchedulerConfig,
    seed: u64,
) -> RefineOutcome {
    let cancel = AtomicBool::new(false);
    refiner_for(scheduler_config.refiner.kind).refine(
        baseline,
        snapshot,
        scheduler_config,
        &scheduler_config.refiner,
        seed,
        &cancel,
    )
}

/// Deterministic per-work-item RNG stream: candidates are indexed, so
/// parallel evaluation reproduces regardless of thread count.
pub(crate) fn stream_seed(master: u64, round: u64, index: u64) -> u64 {
    master
        ^ (round.wrapping_mul(0x9E37_79B9_7F4A_7C15))
        ^ (index.wrapping_mul(0xC2B2_AE3D_27D4_EB4F))
}
