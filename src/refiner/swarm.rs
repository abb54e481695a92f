use crate::refiner::{
    baseline_slots, mutate, perturb, stream_seed, Candidate, RefineOutcome, Refiner,
};
use crate::store::ScheduleStore;
use crate::types::{RefinerConfig, SchedulerConfig, Snapshot};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Swarm driver in the bee-colony shape: food sources are whole
/// schedules, employed bees probe neighbors greedily, onlookers
/// re-probe sources in proportion to fitness, and exhausted sources
/// are abandoned for a wider perturbation of the pipeline output.
pub struct SwarmRefiner;

impl Refiner for SwarmRefiner {
    fn name(&self) -> &'static str {
        "swarm"
    }

    fn refine(
        &self,
        baseline: &ScheduleStore,
        snapshot: &Snapshot,
        scheduler_config: &SchedulerConfig,
        config: &RefinerConfig,
        seed: u64,
        cancel: &AtomicBool,
    ) -> RefineOutcome {
        let baseline_map = baseline_slots(baseline);
        let deadline = Instant::now() + Duration::from_millis(config.time_budget_ms);

        let mut best = Candidate::evaluate(baseline.clone(), &baseline_map);
        let initial_fitness = best.fitness;
        let mut history = vec![best.fitness];

        let source_count = config.population.max(2);
        let mut sources: Vec<Candidate> = (0..source_count)
            .into_par_iter()
            .map(|i| {
                let mut rng = ChaCha8Rng::seed_from_u64(stream_seed(seed, 0, i as u64));
                let mut store = baseline.clone();
                let mutations = rng.gen_range(1..=5);
                for _ in 0..mutations {
                    mutate(&mut store, snapshot, scheduler_config, &mut rng);
                }
                Candidate::evaluate(store, &baseline_map)
            })
            .collect();
        let mut trials = vec![0u32; source_count];

        let mut stagnation = 0u32;
        let mut cycles_run = 0u32;

        for cycle in 1..=config.generations {
            if best.fitness == 0
                || cancel.load(Ordering::Relaxed)
                || Instant::now() >= deadline
                || stagnation >= config.stagnation_limit
            {
                break;
            }
            cycles_run = cycle;

            // Employed phase: one neighbor per source, greedy replace
            let probed: Vec<(Candidate, bool)> = sources
                .par_iter()
                .enumerate()
                .map(|(i, source)| {
                    let mut rng = ChaCha8Rng::seed_from_u64(stream_seed(
                        seed,
                        cycle as u64 * 2,
                        i as u64,
                    ));
                    let mut neighbor = source.store.clone();
                    mutate(&mut neighbor, snapshot, scheduler_config, &mut rng);
                    let neighbor = Candidate::evaluate(neighbor, &baseline_map);
                    if neighbor.better_than(source) {
                        (neighbor, true)
                    } else {
                        (source.clone(), false)
                    }
                })
                .collect();
            for (i, (candidate, improved)) in probed.into_iter().enumerate() {
                sources[i] = candidate;
                trials[i] = if improved { 0 } else { trials[i] + 1 };
            }

            // Onlooker phase: fitness-proportional roulette, shifted
            // so every weight is >= 1
            let min_fitness = sources.iter().map(|s| s.fitness).min().unwrap_or(0);
            let weights: Vec<u64> = sources
                .iter()
                .map(|s| (s.fitness - min_fitness + 1) as u64)
                .collect();
            let total: u64 = weights.iter().sum();

            let mut rng = ChaCha8Rng::seed_from_u64(stream_seed(seed, cycle as u64 * 2 + 1, 0));
            for _ in 0..source_count {
                let mut pick = rng.gen_range(0..total);
                let mut target = 0usize;
                for (i, &w) in weights.iter().enumerate() {
                    if pick < w {
                        target = i;
                        break;
                    }
                    pick -= w;
                }

                let mut neighbor = sources[target].store.clone();
                mutate(&mut neighbor, snapshot, scheduler_config, &mut rng);
                let neighbor = Candidate::evaluate(neighbor, &baseline_map);
                if neighbor.better_than(&sources[target]) {
                    sources[target] = neighbor;
                    trials[target] = 0;
                } else {
                    trials[target] += 1;
                }
            }

            // Scout phase: abandon exhausted sources for a wider
            // perturbation of the original pipeline output
            for i in 0..source_count {
                if trials[i] >= config.trial_limit {
                    let mut scout_rng = ChaCha8Rng::seed_from_u64(stream_seed(
                        seed,
                        cycle as u64 * 2 + 1,
                        (source_count + i) as u64,
                    ));
                    let mut store = baseline.clone();
                    let steps = scout_rng.gen_range(3..=8);
                    perturb(&mut store, snapshot, scheduler_config, &mut scout_rng, steps);
                    sources[i] = Candidate::evaluate(store, &baseline_map);
                    trials[i] = 0;
                }
            }

            let cycle_best = sources
                .iter()
                .fold(None::<&Candidate>, |acc, c| match acc {
                    Some(best) if best.better_than(c) => Some(best),
                    _ => Some(c),
                })
                .expect("sources are non-empty");
            if cycle_best.better_than(&best) {
                best = cycle_best.clone();
                stagnation = 0;
            } else {
                stagnation += 1;
            }
            history.push(best.fitness);
        }

        RefineOutcome {
            driver: self.name(),
            initial_fitness,
            final_fitness: best.fitness,
            iterations: cycles_run,
            sessions_moved: best.moved,
            best_history: history,
            store: best.store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refiner::fitness_of;
    use crate::types::{
        Day, SectionId, SessionId, SubjectId, TeacherId, Term, TheorySession, TimeOfDay, Timetable,
    };

    fn hm(h: u16, m: u16) -> TimeOfDay {
        TimeOfDay::from_hm(h, m)
    }

    fn empty_snapshot() -> Snapshot {
        Snapshot {
            sections: vec![],
            subjects: vec![],
            labs: vec![],
            teachers: vec![],
            classrooms: vec![],
            lab_rooms: vec![],
            theory_assignments: vec![],
            lab_assignments: vec![],
        }
    }

    fn conflicted_baseline() -> ScheduleStore {
        let mut store = ScheduleStore::new(Term::Odd, "2025-26");
        for name in ["3A", "3B"] {
            store.insert_timetable(Timetable::new(
                SectionId(format!("s-{name}")),
                name.into(),
                3,
                "2025-26".into(),
            ));
        }
        for (n, name) in ["3A", "3B"].iter().enumerate() {
            let section = SectionId(format!("s-{name}"));
            store
                .timetable_mut(&section)
                .unwrap()
                .theory_sessions
                .push(TheorySession {
                    id: SessionId(format!("t{n}")),
                    section: section.clone(),
                    subject: SubjectId("sub".into()),
                    teacher: Some(TeacherId("t1".into())),
                    classroom: None,
                    day: Day::Monday,
                    start: hm(10, 0),
                    end: hm(11, 0),
                    is_fixed: false,
                });
        }
        store.rebuild_occupancy();
        store
    }

    #[test]
    fn swarm_clears_a_single_conflict() {
        let baseline = conflicted_baseline();
        let cancel = AtomicBool::new(false);
        let outcome = SwarmRefiner.refine(
            &baseline,
            &empty_snapshot(),
            &SchedulerConfig::default(),
            &RefinerConfig::default(),
            13,
            &cancel,
        );

        assert_eq!(outcome.initial_fitness, -100);
        assert_eq!(outcome.final_fitness, 0);
        assert_eq!(fitness_of(&outcome.store), 0);
    }

    #[test]
    fn cancelled_run_returns_baseline_fitness() {
        let baseline = conflicted_baseline();
        let cancel = AtomicBool::new(true);
        let outcome = SwarmRefiner.refine(
            &baseline,
            &empty_snapshot(),
            &SchedulerConfig::default(),
            &RefinerConfig::default(),
            13,
            &cancel,
        );

        // Cancel is honored between cycles: no cycle ran
        assert_eq!(outcome.iterations, 0);
        assert_eq!(outcome.final_fitness, outcome.initial_fitness);
    }

    #[test]
    fn swarm_history_is_monotone() {
        let baseline = conflicted_baseline();
        let cancel = AtomicBool::new(false);
        let outcome = SwarmRefiner.refine(
            &baseline,
            &empty_snapshot(),
            &SchedulerConfig::default(),
            &RefinerConfig::default(),
            29,
            &cancel,
        );
        for pair in outcome.best_history.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
    }
}
