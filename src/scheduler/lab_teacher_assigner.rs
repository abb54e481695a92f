use crate::error::Result;
use crate::scheduler::{require_step, StageReport, STAGE_LAB_TEACHER_ASSIGNER};
use crate::store::{Resource, ScheduleStore};
use crate::types::{
    Day, Flag, LabId, SectionId, SessionId, Snapshot, StageSummary, TeacherId, TeacherStatus,
    TimeOfDay,
};
use std::collections::{BTreeMap, BTreeSet};

/// Stage S6: attach two compatible teachers to every lab batch.
///
/// Preference order: declared preferred pair first, then fewest total
/// assignments, then pairs never used for the same lab on the same
/// day, then stable id order. Shortages downgrade the batch's
/// teacher_status instead of failing.
pub fn run(store: &mut ScheduleStore, snapshot: &Snapshot) -> Result<StageReport> {
    require_step(store, STAGE_LAB_TEACHER_ASSIGNER, 5)?;

    // Teacher load starts from the theory hours already on the books
    let mut load: BTreeMap<TeacherId, u32> = BTreeMap::new();
    for session in store.all_theory_sessions() {
        if let Some(teacher) = &session.teacher {
            *load.entry(teacher.clone()).or_default() += 1;
        }
    }

    let mut pairs_used: BTreeSet<(TeacherId, TeacherId, LabId, Day)> = BTreeSet::new();

    // (section, session, day, window, batch, lab) in deterministic order
    let mut work: Vec<(SectionId, SessionId, Day, TimeOfDay, TimeOfDay, u8, LabId)> = Vec::new();
    for timetable in store.timetables() {
        let mut sessions: Vec<_> = timetable.lab_sessions.iter().collect();
        sessions.sort_by_key(|s| (s.day, s.start));
        for session in sessions {
            for batch in &session.batches {
                work.push((
                    timetable.section_id.clone(),
                    session.id.clone(),
                    session.day,
                    session.start,
                    session.end,
                    batch.batch_number,
                    batch.lab.clone(),
                ));
            }
        }
    }

    let mut staffed = 0u32;
    let mut flagged = 0u32;
    let mut flagged_by_section: BTreeMap<SectionId, u32> = BTreeMap::new();

    for (section_id, session_id, day, start, end, batch_number, lab_id) in work {
        let chosen = pick_pair(
            store, snapshot, &load, &pairs_used, &section_id, &lab_id, day, start, end,
        );

        for teacher in &chosen {
            store
                .add_batch_teacher(&section_id, &session_id, batch_number, teacher.clone())
                .expect("freeness verified against the same occupancy index");
            *load.entry(teacher.clone()).or_default() += 1;
        }
        if let [a, b] = chosen.as_slice() {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            pairs_used.insert((lo.clone(), hi.clone(), lab_id.clone(), day));
            staffed += 1;
        } else {
            let status = match chosen.len() {
                1 => TeacherStatus::OneTeacher,
                _ => TeacherStatus::NoTeachers,
            };
            if let Some(timetable) = store.timetable_mut(&section_id) {
                timetable.flagged_sessions.push(Flag::CapabilityShortage {
                    session: session_id.clone(),
                    batch_number,
                    lab: lab_id.clone(),
                    teacher_status: status,
                });
            }
            *flagged_by_section.entry(section_id.clone()).or_default() += 1;
            flagged += 1;
        }
    }

    for timetable in store.timetables_mut() {
        let section_flagged = flagged_by_section
            .get(&timetable.section_id)
            .copied()
            .unwrap_or(0);
        timetable.record_stage(
            6,
            STAGE_LAB_TEACHER_ASSIGNER,
            StageSummary {
                placed: timetable
                    .lab_sessions
                    .iter()
                    .flat_map(|s| s.batches.iter())
                    .filter(|b| b.teacher_status == TeacherStatus::TwoTeachers)
                    .count() as u32,
                flagged: section_flagged,
                message: format!("{section_flagged} batches short of teachers"),
            },
        );
    }

    Ok(StageReport::success(
        STAGE_LAB_TEACHER_ASSIGNER,
        format!("staffed {staffed} batches fully, {flagged} short"),
        staffed,
        flagged,
    ))
}

/// Up to two teachers for one batch, in preference order
#[allow(clippy::too_many_arguments)]
fn pick_pair(
    store: &ScheduleStore,
    snapshot: &Snapshot,
    load: &BTreeMap<TeacherId, u32>,
    pairs_used: &BTreeSet<(TeacherId, TeacherId, LabId, Day)>,
    section_id: &SectionId,
    lab_id: &LabId,
    day: Day,
    start: TimeOfDay,
    end: TimeOfDay,
) -> Vec<TeacherId> {
    let capable = snapshot.teachers_for_lab(lab_id);
    let is_free = |teacher: &TeacherId| {
        store
            .occupancy
            .is_free(&Resource::Teacher(teacher.clone()), day, start, end)
    };

    let mut chosen: Vec<TeacherId> = Vec::with_capacity(2);

    // Declared preferences first, in declared order
    for preferred in snapshot.preferred_lab_teachers(section_id, lab_id) {
        if chosen.len() == 2 {
            break;
        }
        if capable.iter().any(|t| &t.id == preferred)
            && !chosen.contains(preferred)
            && is_free(preferred)
        {
            chosen.push(preferred.clone());
        }
    }

    // Then by load, with a diversity pass before settling for a
    // repeat pairing
    let mut remaining: Vec<&TeacherId> = capable
        .iter()
        .map(|t| &t.id)
        .filter(|id| !chosen.contains(id) && is_free(id))
        .collect();
    remaining.sort_by_key(|id| (load.get(*id).copied().unwrap_or(0), (*id).clone()));

    while chosen.len() < 2 && !remaining.is_empty() {
        let next = match chosen.first() {
            Some(first) => {
                let fresh = remaining.iter().position(|id| {
                    let (lo, hi) = if first <= *id {
                        (first.clone(), (*id).clone())
                    } else {
                        ((*id).clone(), first.clone())
                    };
                    !pairs_used.contains(&(lo, hi, lab_id.clone(), day))
                });
                fresh.unwrap_or(0)
            }
            None => 0,
        };
        chosen.push(remaining.remove(next).clone());
    }

    chosen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        BatchAssignment, LabRoomId, LabSession, Section, Teacher, Term, Timetable,
    };

    fn teacher(id: &str, labs: &[&str]) -> Teacher {
        Teacher {
            id: TeacherId(id.into()),
            shortform: id.to_uppercase(),
            name: format!("Prof {id}"),
            subjects_taught: vec![],
            labs_taught: labs.iter().map(|l| LabId(l.to_string())).collect(),
        }
    }

    fn snapshot(teachers: Vec<Teacher>) -> Snapshot {
        Snapshot {
            sections: vec![Section {
                id: SectionId("s-3A".into()),
                name: "3A".into(),
                semester: 3,
                batch_count: 3,
            }],
            subjects: vec![],
            labs: vec![],
            teachers,
            classrooms: vec![],
            lab_rooms: vec![],
            theory_assignments: vec![],
            lab_assignments: vec![],
        }
    }

    fn store_with_lab_session() -> ScheduleStore {
        let mut store = ScheduleStore::new(Term::Odd, "2025-26");
        let mut table = Timetable::new(SectionId("s-3A".into()), "3A".into(), 3, "2025-26".into());
        table.generation_metadata.current_step = 5;
        store.insert_timetable(table);
        let batches = (1..=3)
            .map(|b| BatchAssignment {
                batch_number: b,
                lab: LabId("l1".into()),
                lab_room: LabRoomId(format!("r{b}")),
                teacher1: None,
                teacher2: None,
                teacher_status: TeacherStatus::NoTeachers,
            })
            .collect();
        store
            .add_lab_session(LabSession {
                id: SessionId("lab-1".into()),
                section: SectionId("s-3A".into()),
                day: Day::Monday,
                start: TimeOfDay::from_hm(10, 0),
                end: TimeOfDay::from_hm(12, 0),
                batches,
            })
            .unwrap();
        store
    }

    #[test]
    fn staffs_each_batch_with_a_distinct_pair() {
        let snapshot = snapshot(vec![
            teacher("t1", &["l1"]),
            teacher("t2", &["l1"]),
            teacher("t3", &["l1"]),
            teacher("t4", &["l1"]),
            teacher("t5", &["l1"]),
            teacher("t6", &["l1"]),
        ]);
        let mut store = store_with_lab_session();
        run(&mut store, &snapshot).unwrap();

        let table = store.timetable(&SectionId("s-3A".into())).unwrap();
        let session = &table.lab_sessions[0];
        let mut seen: BTreeSet<TeacherId> = BTreeSet::new();
        for batch in &session.batches {
            assert_eq!(batch.teacher_status, TeacherStatus::TwoTeachers);
            for t in batch.teachers() {
                // Parallel batches must not share a teacher
                assert!(seen.insert(t.clone()), "teacher {t} used twice in one window");
            }
        }
        assert!(table.flagged_sessions.is_empty());
    }

    #[test]
    fn shortage_downgrades_status_instead_of_failing() {
        // Three teachers for three parallel batches: batch 1 gets a
        // pair, batch 2 gets one, batch 3 none.
        let snapshot = snapshot(vec![
            teacher("t1", &["l1"]),
            teacher("t2", &["l1"]),
            teacher("t3", &["l1"]),
        ]);
        let mut store = store_with_lab_session();
        run(&mut store, &snapshot).unwrap();

        let table = store.timetable(&SectionId("s-3A".into())).unwrap();
        let statuses: Vec<TeacherStatus> = table.lab_sessions[0]
            .batches
            .iter()
            .map(|b| b.teacher_status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                TeacherStatus::TwoTeachers,
                TeacherStatus::OneTeacher,
                TeacherStatus::NoTeachers
            ]
        );
        assert_eq!(table.flagged_sessions.len(), 2);
    }

    #[test]
    fn incapable_teachers_are_never_picked() {
        let snapshot = snapshot(vec![teacher("t1", &["l1"]), teacher("t2", &["other"])]);
        let mut store = store_with_lab_session();
        run(&mut store, &snapshot).unwrap();

        let table = store.timetable(&SectionId("s-3A".into())).unwrap();
        for batch in &table.lab_sessions[0].batches {
            for t in batch.teachers() {
                assert_ne!(t.0, "t2");
            }
        }
    }
}
