use crate::refiner::{
    baseline_slots, mutate, section_window_ok, stream_seed, Candidate, Movable, RefineOutcome,
    Refiner, SessionKind,
};
use crate::store::ScheduleStore;
use crate::types::{RefinerConfig, SchedulerConfig, SectionId, SessionId, Snapshot};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Evolutionary driver: tournament selection, elitism, theory-slot
/// crossover, and the shared conflict-directed mutation kit.
pub struct EvolutionaryRefiner;

impl Refiner for EvolutionaryRefiner {
    fn name(&self) -> &'static str {
        "evolutionary"
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

        // Best-so-far starts at the pipeline output itself
        let mut best = Candidate::evaluate(baseline.clone(), &baseline_map);
        let initial_fitness = best.fitness;
        let mut history = vec![best.fitness];

        // Generation 0: baseline clones with 1-5 random mutations each
        let mut population: Vec<Candidate> = (0..config.population.max(2))
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

        let mut stagnation = 0u32;
        let mut generations_run = 0u32;

        for generation in 1..=config.generations {
            if best.fitness == 0
                || cancel.load(Ordering::Relaxed)
                || Instant::now() >= deadline
                || stagnation >= config.stagnation_limit
            {
                break;
            }
            generations_run = generation;

            population.sort_by(|a, b| {
                b.fitness
                    .cmp(&a.fitness)
                    .then_with(|| a.moved.cmp(&b.moved))
            });
            let elites: Vec<Candidate> = population
                .iter()
                .take(config.elitism.min(population.len()))
                .cloned()
                .collect();

            let offspring_count = population.len() - elites.len();
            let parents = &population;
            let children: Vec<Candidate> = (0..offspring_count)
                .into_par_iter()
                .map(|i| {
                    let mut rng = ChaCha8Rng::seed_from_u64(stream_seed(
                        seed,
                        generation as u64,
                        i as u64,
                    ));
                    let a = tournament(parents, config.tournament_size, &mut rng);
                    let b = tournament(parents, config.tournament_size, &mut rng);
                    let mut child = crossover(a, b, &mut rng);
                    if rng.gen_bool(config.mutation_probability.clamp(0.0, 1.0)) {
                        mutate(&mut child, snapshot, scheduler_config, &mut rng);
                    }
                    Candidate::evaluate(child, &baseline_map)
                })
                .collect();

            population = elites;
            population.extend(children);

            let generation_best = population
                .iter()
                .fold(None::<&Candidate>, |acc, c| match acc {
                    Some(best) if best.better_than(c) => Some(best),
                    _ => Some(c),
                })
                .expect("population is non-empty");

            if generation_best.better_than(&best) {
                best = generation_best.clone();
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
            iterations: generations_run,
            sessions_moved: best.moved,
            best_history: history,
            store: best.store,
        }
    }
}

/// Best of `size` uniformly drawn candidates
fn tournament<'a>(
    population: &'a [Candidate],
    size: usize,
    rng: &mut ChaCha8Rng,
) -> &'a Candidate {
    let mut best: Option<&Candidate> = None;
    for _ in 0..size.max(1) {
        let candidate = &population[rng.gen_range(0..population.len())];
        best = match best {
            Some(current) if current.better_than(candidate) => Some(current),
            _ => Some(candidate),
        };
    }
    best.expect("tournament size >= 1")
}

/// Child inherits parent A wholesale, then a random 30% of A's
/// movable theory-session slots are overwritten with parent B's
/// placement of the same session. Lab sessions and fixed slots ride
/// along unchanged.
fn crossover(a: &Candidate, b: &Candidate, rng: &mut ChaCha8Rng) -> ScheduleStore {
    let mut child = a.store.clone();

    let theory_ids: Vec<(SectionId, SessionId, u16)> = child
        .timetables()
        .iter()
        .flat_map(|t| {
            t.theory_sessions
                .iter()
                .filter(|s| !s.is_fixed)
                .map(|s| (t.section_id.clone(), s.id.clone(), s.duration_minutes()))
        })
        .collect();

    for (section, id, duration) in theory_ids {
        if !rng.gen_bool(0.3) {
            continue;
        }
        let Some(donor) = b.store.timetable(&section).and_then(|t| t.theory_session(&id)) else {
            continue;
        };
        let (day, start) = (donor.day, donor.start);
        let current = child
            .timetable(&section)
            .and_then(|t| t.theory_session(&id))
            .map(|s| (s.day, s.start));
        if current == Some((day, start)) {
            continue;
        }
        let movable = Movable {
            section: section.clone(),
            id: id.clone(),
            kind: SessionKind::Theory,
            duration,
        };
        let end = start.plus_minutes(duration);
        if section_window_ok(&child, &movable, day, start, end) {
            child.force_move_theory_session(&section, &id, day, start);
        }
    }

    child
}
