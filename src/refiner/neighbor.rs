use crate::store::ScheduleStore;
use crate::types::{
    Day, SchedulerConfig, SectionId, SessionId, Snapshot, TimeOfDay, DAY_END, DAY_START,
    SEGMENT_MINUTES,
};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Where every session of the pipeline output sat. Used to count how
/// far a refined schedule has drifted (the fitness tie-breaker).
pub type BaselineSlots = BTreeMap<SessionId, (Day, TimeOfDay)>;

pub fn baseline_slots(store: &ScheduleStore) -> BaselineSlots {
    let mut slots = BTreeMap::new();
    for table in store.timetables() {
        for session in &table.theory_sessions {
            slots.insert(session.id.clone(), (session.day, session.start));
        }
        for session in &table.lab_sessions {
            slots.insert(session.id.clone(), (session.day, session.start));
        }
    }
    slots
}

/// One schedule in the search population
#[derive(Debug, Clone)]
pub struct Candidate {
    pub store: ScheduleStore,
    pub fitness: i64,
    pub moved: usize,
}

impl Candidate {
    pub fn evaluate(store: ScheduleStore, baseline: &BaselineSlots) -> Candidate {
        let fitness = fitness_of(&store);
        let moved = moved_count(&store, baseline);
        Candidate {
            store,
            fitness,
            moved,
        }
    }

    /// Higher fitness wins; ties go to the schedule that drifted less
    /// from the pipeline output.
    pub fn better_than(&self, other: &Candidate) -> bool {
        self.fitness > other.fitness || (self.fitness == other.fitness && self.moved < other.moved)
    }
}

/// `-100` per conflicting resource pair; zero is optimal
pub fn fitness_of(store: &ScheduleStore) -> i64 {
    -100 * store.occupancy.overlap_pairs().len() as i64
}

fn moved_count(store: &ScheduleStore, baseline: &BaselineSlots) -> usize {
    let mut moved = 0;
    for table in store.timetables() {
        for session in &table.theory_sessions {
            if baseline.get(&session.id) != Some(&(session.day, session.start)) {
                moved += 1;
            }
        }
        for session in &table.lab_sessions {
            if baseline.get(&session.id) != Some(&(session.day, session.start)) {
                moved += 1;
            }
        }
    }
    moved
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Theory,
    Lab,
}

/// A session the mutation kit may retime (fixed slots excluded)
#[derive(Debug, Clone)]
pub struct Movable {
    pub section: SectionId,
    pub id: SessionId,
    pub kind: SessionKind,
    pub duration: u16,
}

pub fn movable_sessions(store: &ScheduleStore) -> Vec<Movable> {
    let mut sessions = Vec::new();
    for table in store.timetables() {
        for session in &table.theory_sessions {
            if !session.is_fixed {
                sessions.push(Movable {
                    section: table.section_id.clone(),
                    id: session.id.clone(),
                    kind: SessionKind::Theory,
                    duration: session.duration_minutes(),
                });
            }
        }
        for session in &table.lab_sessions {
            sessions.push(Movable {
                section: table.section_id.clone(),
                id: session.id.clone(),
                kind: SessionKind::Lab,
                duration: session.duration_minutes(),
            });
        }
    }
    sessions
}

pub fn locate(store: &ScheduleStore, id: &SessionId) -> Option<Movable> {
    for table in store.timetables() {
        if let Some(session) = table.theory_session(id) {
            if session.is_fixed {
                return None;
            }
            return Some(Movable {
                section: table.section_id.clone(),
                id: id.clone(),
                kind: SessionKind::Theory,
                duration: session.duration_minutes(),
            });
        }
        if let Some(session) = table.lab_session(id) {
            return Some(Movable {
                section: table.section_id.clone(),
                id: id.clone(),
                kind: SessionKind::Lab,
                duration: session.duration_minutes(),
            });
        }
    }
    None
}

/// Candidate target windows for a session, by kind
pub fn candidate_windows(
    kind: SessionKind,
    duration: u16,
    config: &SchedulerConfig,
) -> Vec<(Day, TimeOfDay)> {
    let mut windows = Vec::new();
    for &day in &Day::ALL {
        match kind {
            SessionKind::Lab => {
                for &start in &config.lab_start_times {
                    windows.push((day, start));
                }
            }
            SessionKind::Theory => {
                let mut start = DAY_START;
                while start.plus_minutes(duration) <= DAY_END {
                    windows.push((day, start));
                    start = start.plus_minutes(SEGMENT_MINUTES);
                }
            }
        }
    }
    windows
}

/// Section-level admissibility of a target window, with the moving
/// session itself excluded from the checks.
pub fn section_window_ok(
    store: &ScheduleStore,
    movable: &Movable,
    day: Day,
    start: TimeOfDay,
    end: TimeOfDay,
) -> bool {
    let Some(table) = store.timetable(&movable.section) else {
        return false;
    };

    let theory_clash = table
        .theory_sessions
        .iter()
        .filter(|s| s.id != movable.id)
        .any(|s| s.overlaps_window(day, start, end));
    if theory_clash {
        return false;
    }

    let other_labs: Vec<_> = table
        .lab_sessions
        .iter()
        .filter(|s| s.id != movable.id)
        .collect();
    if other_labs.iter().any(|s| s.overlaps_window(day, start, end)) {
        return false;
    }

    if movable.kind == SessionKind::Lab {
        if other_labs.iter().any(|s| s.adjacent_to(day, start, end)) {
            return false;
        }
        let total_labs = table.lab_sessions.len();
        let labs_today = other_labs.iter().filter(|s| s.day == day).count();
        let ok = match total_labs {
            0 | 1 => true,
            2 => labs_today == 0,
            _ => labs_today < 2,
        };
        if !ok {
            return false;
        }
    }

    true
}

/// Try to clear one concrete conflict by retiming one of its two
/// sessions into a window free for every attached resource.
/// Returns true if a conflict-free move was committed.
fn resolve_conflict(
    store: &mut ScheduleStore,
    config: &SchedulerConfig,
    rng: &mut ChaCha8Rng,
) -> bool {
    let pairs: Vec<_> = store.occupancy.overlap_pairs().into_iter().collect();
    if pairs.is_empty() {
        return false;
    }
    let (_, _, first, second) = pairs[rng.gen_range(0..pairs.len())].clone();

    let mut order = [first, second];
    order.shuffle(rng);

    for id in order {
        let Some(movable) = locate(store, &id) else {
            continue;
        };
        let mut windows = candidate_windows(movable.kind, movable.duration, config);
        windows.shuffle(rng);
        for (day, start) in windows {
            let end = start.plus_minutes(movable.duration);
            if !section_window_ok(store, &movable, day, start, end) {
                continue;
            }
            let moved = match movable.kind {
                SessionKind::Theory => store
                    .move_theory_session(&movable.section, &movable.id, day, start)
                    .is_ok(),
                SessionKind::Lab => store
                    .move_lab_session(&movable.section, &movable.id, day, start)
                    .is_ok(),
            };
            if moved {
                return true;
            }
        }
    }
    false
}

/// Random retiming of any movable session; the target window only has
/// to satisfy section-level rules, resource conflicts are allowed and
/// scored by fitness.
fn random_shift(store: &mut ScheduleStore, config: &SchedulerConfig, rng: &mut ChaCha8Rng) {
    let sessions = movable_sessions(store);
    if sessions.is_empty() {
        return;
    }

    for _ in 0..10 {
        let movable = &sessions[rng.gen_range(0..sessions.len())];
        let windows = candidate_windows(movable.kind, movable.duration, config);
        let (day, start) = windows[rng.gen_range(0..windows.len())];
        let end = start.plus_minutes(movable.duration);
        if !section_window_ok(store, movable, day, start, end) {
            continue;
        }
        match movable.kind {
            SessionKind::Theory => {
                store.force_move_theory_session(&movable.section, &movable.id, day, start)
            }
            SessionKind::Lab => {
                store.force_move_lab_session(&movable.section, &movable.id, day, start)
            }
        }
        return;
    }
}

/// One step of the shared mutation kit: prefer repairing a concrete
/// conflict, fall back to a random shift.
pub fn mutate(
    store: &mut ScheduleStore,
    _snapshot: &Snapshot,
    config: &SchedulerConfig,
    rng: &mut ChaCha8Rng,
) {
    let has_conflicts = !store.occupancy.overlap_pairs().is_empty();
    if has_conflicts && rng.gen_bool(0.8) && resolve_conflict(store, config, rng) {
        return;
    }
    random_shift(store, config, rng);
}

/// Wider perturbation used by the swarm's scout phase
pub fn perturb(
    store: &mut ScheduleStore,
    snapshot: &Snapshot,
    config: &SchedulerConfig,
    rng: &mut ChaCha8Rng,
    steps: usize,
) {
    for _ in 0..steps {
        mutate(store, snapshot, config, rng);
    }
}
