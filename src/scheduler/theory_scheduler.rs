use crate::error::Result;
use crate::scheduler::{require_step, StageReport, STAGE_THEORY_SCHEDULER};
use crate::store::{Resource, ScheduleStore};
use crate::types::{
    Day, Flag, SectionId, Snapshot, StageSummary, Subject, TeacherId, TheorySession, TimeOfDay,
    DAY_END, DAY_START, SEGMENT_MINUTES,
};

/// Stage S4: split theory hours into sessions and place them with a
/// load-balanced first fit.
///
/// Teacher occupancy is global: hours taught in one section block the
/// teacher's availability in every other section.
pub fn run(store: &mut ScheduleStore, snapshot: &Snapshot) -> Result<StageReport> {
    require_step(store, STAGE_THEORY_SCHEDULER, 3)?;

    let mut placed_total = 0u32;
    let mut flagged_total = 0u32;

    let section_ids: Vec<SectionId> = store
        .timetables()
        .iter()
        .map(|t| t.section_id.clone())
        .collect();

    for section_id in &section_ids {
        // Heaviest subjects first: they are the hardest to fit late
        let mut workload: Vec<(&Subject, TeacherId)> = snapshot
            .theory_assignments_for_section(section_id)
            .into_iter()
            .filter_map(|a| snapshot.subject(&a.subject).map(|s| (s, a.teacher.clone())))
            .filter(|(subject, _)| subject.needs_theory_placement())
            .collect();
        workload.sort_by(|(a, _), (b, _)| {
            b.minutes_per_week()
                .cmp(&a.minutes_per_week())
                .then_with(|| a.shortform.cmp(&b.shortform))
        });

        let mut placed = 0u32;
        let mut flagged = 0u32;

        for (subject, teacher) in workload {
            for duration in split_weekly_minutes(subject) {
                if place_session(store, snapshot, section_id, subject, &teacher, duration) {
                    placed += 1;
                } else {
                    let timetable = store.timetable_mut(section_id).expect("initialized in S1");
                    timetable.flagged_sessions.push(Flag::UnresolvedPlacement {
                        subject: subject.id.clone(),
                        duration_minutes: duration,
                        reason: "no window clears teacher, section and classroom budgets"
                            .to_string(),
                    });
                    flagged += 1;
                }
            }
        }

        placed_total += placed;
        flagged_total += flagged;
        let timetable = store.timetable_mut(section_id).expect("initialized in S1");
        timetable.record_stage(
            4,
            STAGE_THEORY_SCHEDULER,
            StageSummary {
                placed,
                flagged,
                message: format!("{placed} theory sessions placed"),
            },
        );
    }

    Ok(StageReport::success(
        STAGE_THEORY_SCHEDULER,
        format!("placed {placed_total} theory sessions, {flagged_total} unplaced"),
        placed_total,
        flagged_total,
    ))
}

/// Greedy split of the weekly load: repeated `min(remaining, cap)`.
/// Session lengths stay on the half-hour grid between 30 minutes and
/// 2 hours whatever the subject's declared daily cap is.
pub fn split_weekly_minutes(subject: &Subject) -> Vec<u16> {
    let cap = (subject.max_minutes_per_day() / SEGMENT_MINUTES * SEGMENT_MINUTES).clamp(
        SEGMENT_MINUTES,
        4 * SEGMENT_MINUTES,
    );
    let mut remaining = subject.minutes_per_week();
    let mut durations = Vec::new();
    while remaining > 0 {
        let take = remaining.min(cap);
        durations.push(take);
        remaining -= take;
    }
    durations
}

fn place_session(
    store: &mut ScheduleStore,
    snapshot: &Snapshot,
    section_id: &SectionId,
    subject: &Subject,
    teacher: &TeacherId,
    duration: u16,
) -> bool {
    // Days with the least scheduled load first, then earliest start
    let mut days: Vec<Day> = Day::ALL.to_vec();
    {
        let timetable = store.timetable(section_id).expect("initialized in S1");
        days.sort_by_key(|&day| timetable.day_load_minutes(day));
    }

    for day in days {
        let mut start = DAY_START;
        while start.plus_minutes(duration) <= DAY_END {
            let end = start.plus_minutes(duration);
            if admissible(store, snapshot, section_id, subject, teacher, day, start, end) {
                let id = {
                    let name = store
                        .timetable(section_id)
                        .expect("initialized in S1")
                        .section_name
                        .clone();
                    store.next_session_id(&name, 'T')
                };
                let session = TheorySession {
                    id,
                    section: section_id.clone(),
                    subject: subject.id.clone(),
                    teacher: Some(teacher.clone()),
                    classroom: None,
                    day,
                    start,
                    end,
                    is_fixed: false,
                };
                if store.add_theory_session(session).is_ok() {
                    return true;
                }
            }
            start = start.plus_minutes(SEGMENT_MINUTES);
        }
    }
    false
}

#[allow(clippy::too_many_arguments)]
fn admissible(
    store: &ScheduleStore,
    snapshot: &Snapshot,
    section_id: &SectionId,
    subject: &Subject,
    teacher: &TeacherId,
    day: Day,
    start: TimeOfDay,
    end: TimeOfDay,
) -> bool {
    let timetable = store.timetable(section_id).expect("initialized in S1");

    if timetable.occupies(day, start, end) {
        return false;
    }

    // One session of a subject per day keeps the daily cap honest
    if timetable
        .theory_sessions
        .iter()
        .any(|s| s.subject == subject.id && s.day == day)
    {
        return false;
    }

    if !store
        .occupancy
        .is_free(&Resource::Teacher(teacher.clone()), day, start, end)
    {
        return false;
    }

    // Classroom budget: S5 cannot seat more concurrent theory
    // sessions than there are classrooms.
    if !snapshot.classrooms.is_empty() {
        let concurrent = store
            .all_theory_sessions()
            .filter(|s| s.overlaps_window(day, start, end))
            .count();
        if concurrent >= snapshot.classrooms.len() {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{fixed_slots, lab_scheduler, section_init};
    use crate::types::{
        Section, SchedulerConfig, SubjectId, Term, TheoryAssignment,
    };
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn subject(id: &str, hours: f64, cap: f64) -> Subject {
        Subject {
            id: SubjectId(id.into()),
            shortform: id.to_uppercase(),
            name: format!("{id} theory"),
            semester: 3,
            hours_per_week: hours,
            max_hours_per_day: cap,
            requires_teacher: true,
            is_project: false,
            is_open_elective: false,
            is_professional_elective: false,
            is_external_dept: false,
            fixed_schedule: None,
        }
    }

    fn section(name: &str) -> Section {
        Section {
            id: SectionId(format!("s-{name}")),
            name: name.into(),
            semester: 3,
            batch_count: 3,
        }
    }

    fn run_pipeline(snapshot: &Snapshot) -> ScheduleStore {
        let mut store = ScheduleStore::new(Term::Odd, "2025-26");
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        section_init::run(&mut store, snapshot).unwrap();
        fixed_slots::run(&mut store, snapshot).unwrap();
        lab_scheduler::run(&mut store, snapshot, &SchedulerConfig::default(), &mut rng).unwrap();
        run(&mut store, snapshot).unwrap();
        store
    }

    #[test]
    fn greedy_split_respects_daily_cap() {
        assert_eq!(split_weekly_minutes(&subject("x", 4.0, 1.0)), vec![60; 4]);
        assert_eq!(
            split_weekly_minutes(&subject("x", 3.5, 1.5)),
            vec![90, 90, 30]
        );
        assert_eq!(split_weekly_minutes(&subject("x", 2.0, 2.0)), vec![120]);
        // Caps beyond two hours still yield legal session lengths
        assert_eq!(
            split_weekly_minutes(&subject("x", 5.0, 3.0)),
            vec![120, 120, 60]
        );
    }

    #[test]
    fn shared_teacher_never_double_booked_across_sections() {
        // Both sections need the same subject from the same teacher
        let teacher_id = TeacherId("t1".into());
        let snapshot = Snapshot {
            sections: vec![section("3A"), section("3B")],
            subjects: vec![subject("s1", 2.0, 1.0)],
            labs: vec![],
            teachers: vec![crate::types::Teacher {
                id: teacher_id.clone(),
                shortform: "T1".into(),
                name: "Prof T".into(),
                subjects_taught: vec![SubjectId("s1".into())],
                labs_taught: vec![],
            }],
            classrooms: vec![],
            lab_rooms: vec![],
            theory_assignments: vec![
                TheoryAssignment {
                    section: SectionId("s-3A".into()),
                    subject: SubjectId("s1".into()),
                    teacher: teacher_id.clone(),
                },
                TheoryAssignment {
                    section: SectionId("s-3B".into()),
                    subject: SubjectId("s1".into()),
                    teacher: teacher_id.clone(),
                },
            ],
            lab_assignments: vec![],
        };

        let store = run_pipeline(&snapshot);

        let all: Vec<_> = store.all_theory_sessions().collect();
        assert_eq!(all.len(), 4, "2 sections x 2 one-hour sessions");
        // No two of the teacher's sessions may overlap
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert!(
                    !(a.day == b.day
                        && crate::types::overlaps(a.start, a.end, b.start, b.end)),
                    "teacher double-booked: {a:?} vs {b:?}"
                );
            }
        }
    }

    #[test]
    fn skips_projects_and_electives() {
        let teacher_id = TeacherId("t1".into());
        let mut project = subject("proj", 6.0, 3.0);
        project.is_project = true;
        let mut oec = subject("oec", 3.0, 1.0);
        oec.is_open_elective = true;

        let snapshot = Snapshot {
            sections: vec![section("3A")],
            subjects: vec![project, oec],
            labs: vec![],
            teachers: vec![],
            classrooms: vec![],
            lab_rooms: vec![],
            theory_assignments: vec![
                TheoryAssignment {
                    section: SectionId("s-3A".into()),
                    subject: SubjectId("proj".into()),
                    teacher: teacher_id.clone(),
                },
                TheoryAssignment {
                    section: SectionId("s-3A".into()),
                    subject: SubjectId("oec".into()),
                    teacher: teacher_id,
                },
            ],
            lab_assignments: vec![],
        };

        let store = run_pipeline(&snapshot);
        assert_eq!(store.all_theory_sessions().count(), 0);
    }

    #[test]
    fn same_subject_sessions_spread_over_days() {
        let teacher_id = TeacherId("t1".into());
        let snapshot = Snapshot {
            sections: vec![section("3A")],
            subjects: vec![subject("s1", 4.0, 1.0)],
            labs: vec![],
            teachers: vec![],
            classrooms: vec![],
            lab_rooms: vec![],
            theory_assignments: vec![TheoryAssignment {
                section: SectionId("s-3A".into()),
                subject: SubjectId("s1".into()),
                teacher: teacher_id,
            }],
            lab_assignments: vec![],
        };

        let store = run_pipeline(&snapshot);
        let table = store.timetable(&SectionId("s-3A".into())).unwrap();
        assert_eq!(table.theory_sessions.len(), 4);
        let days: std::collections::BTreeSet<Day> =
            table.theory_sessions.iter().map(|s| s.day).collect();
        assert_eq!(days.len(), 4, "one session per day for a capped subject");
    }
}
