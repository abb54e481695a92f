use crate::error::Result;
use crate::scheduler::{require_step, StageReport, STAGE_CLASSROOM_ASSIGNER};
use crate::store::{Resource, ScheduleStore};
use crate::types::{
    Classroom, Day, Flag, SectionId, SessionId, Snapshot, StageSummary, SubjectId, TimeOfDay,
};

/// Stage S5: attach classrooms to theory sessions.
///
/// Two phases, fixed sessions first, so a pre-declared slot can never
/// lose its room to a regular class. Projects need no classroom and
/// are skipped.
pub fn run(store: &mut ScheduleStore, snapshot: &Snapshot) -> Result<StageReport> {
    require_step(store, STAGE_CLASSROOM_ASSIGNER, 4)?;

    let mut classrooms: Vec<&Classroom> = snapshot.classrooms.iter().collect();
    classrooms.sort_by(|a, b| a.number.cmp(&b.number));

    let fixed = collect_sessions(store, snapshot, true);
    let regular = collect_sessions(store, snapshot, false);

    let mut placed = 0u32;
    let mut flagged = 0u32;
    for batch in [fixed, regular] {
        for (section_id, session_id, subject_id, day, start, end) in batch {
            let free_room = classrooms
                .iter()
                .find(|room| {
                    store
                        .occupancy
                        .is_free(&Resource::Classroom(room.id.clone()), day, start, end)
                })
                .map(|room| room.id.clone());

            match free_room {
                Some(room) => {
                    // The freeness check just passed and nothing else
                    // runs between check and reserve in this
                    // single-threaded stage.
                    if store.set_classroom(&section_id, &session_id, room).is_ok() {
                        placed += 1;
                        continue;
                    }
                    flag_unassigned(store, &section_id, &session_id, &subject_id);
                    flagged += 1;
                }
                None => {
                    flag_unassigned(store, &section_id, &session_id, &subject_id);
                    flagged += 1;
                }
            }
        }
    }

    for timetable in store.timetables_mut() {
        let assigned = timetable
            .theory_sessions
            .iter()
            .filter(|s| s.classroom.is_some())
            .count() as u32;
        timetable.record_stage(
            5,
            STAGE_CLASSROOM_ASSIGNER,
            StageSummary {
                placed: assigned,
                flagged: 0,
                message: format!("{assigned} classrooms assigned"),
            },
        );
    }

    Ok(StageReport::success(
        STAGE_CLASSROOM_ASSIGNER,
        format!("assigned {placed} classrooms, {flagged} sessions roomless"),
        placed,
        flagged,
    ))
}

type SessionSlot = (SectionId, SessionId, SubjectId, Day, TimeOfDay, TimeOfDay);

fn collect_sessions(store: &ScheduleStore, snapshot: &Snapshot, fixed: bool) -> Vec<SessionSlot> {
    store
        .timetables()
        .iter()
        .flat_map(|t| t.theory_sessions.iter())
        .filter(|s| s.is_fixed == fixed)
        .filter(|s| {
            snapshot
                .subject(&s.subject)
                .map(|subject| !subject.is_project)
                .unwrap_or(true)
        })
        .map(|s| {
            (
                s.section.clone(),
                s.id.clone(),
                s.subject.clone(),
                s.day,
                s.start,
                s.end,
            )
        })
        .collect()
}

fn flag_unassigned(
    store: &mut ScheduleStore,
    section_id: &SectionId,
    session_id: &SessionId,
    subject_id: &SubjectId,
) {
    if let Some(timetable) = store.timetable_mut(section_id) {
        timetable.flagged_sessions.push(Flag::UnassignedClassroom {
            session: session_id.clone(),
            subject: subject_id.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ClassroomId, Section, Term, TheorySession, Timetable,
    };

    fn snapshot_with_rooms(rooms: &[&str]) -> Snapshot {
        Snapshot {
            sections: vec![Section {
                id: SectionId("s-3A".into()),
                name: "3A".into(),
                semester: 3,
                batch_count: 3,
            }],
            subjects: vec![],
            labs: vec![],
            teachers: vec![],
            classrooms: rooms
                .iter()
                .map(|r| Classroom {
                    id: ClassroomId(r.to_string()),
                    number: r.to_string(),
                })
                .collect(),
            lab_rooms: vec![],
            theory_assignments: vec![],
            lab_assignments: vec![],
        }
    }

    fn store_with_sessions(sessions: Vec<TheorySession>) -> ScheduleStore {
        let mut store = ScheduleStore::new(Term::Odd, "2025-26");
        let mut table = Timetable::new(SectionId("s-3A".into()), "3A".into(), 3, "2025-26".into());
        table.generation_metadata.current_step = 4;
        store.insert_timetable(table);
        for session in sessions {
            store.add_theory_session(session).unwrap();
        }
        store
    }

    fn session(id: &str, fixed: bool, h: u16) -> TheorySession {
        TheorySession {
            id: SessionId(id.into()),
            section: SectionId("s-3A".into()),
            subject: SubjectId("sub".into()),
            teacher: None,
            classroom: None,
            day: Day::Monday,
            start: TimeOfDay::from_hm(h, 0),
            end: TimeOfDay::from_hm(h + 1, 0),
            is_fixed: fixed,
        }
    }

    #[test]
    fn fixed_sessions_get_rooms_before_regular_ones() {
        // Both sessions want the same window; one room exists. The
        // fixed session must win even though the regular one was
        // added first.
        let snapshot = snapshot_with_rooms(&["101"]);
        let mut regular = session("reg", false, 10);
        regular.day = Day::Monday;
        let mut fixed = session("fix", true, 10);
        fixed.day = Day::Monday;
        let mut store = store_with_sessions(vec![regular, fixed]);

        run(&mut store, &snapshot).unwrap();

        let table = store.timetable(&SectionId("s-3A".into())).unwrap();
        let fixed_room = &table.theory_session(&SessionId("fix".into())).unwrap().classroom;
        let regular_room = &table.theory_session(&SessionId("reg".into())).unwrap().classroom;
        assert_eq!(fixed_room, &Some(ClassroomId("101".into())));
        assert!(regular_room.is_none());
        assert_eq!(table.flagged_sessions.len(), 1);
    }

    #[test]
    fn nonconflicting_sessions_share_a_room_across_hours() {
        let snapshot = snapshot_with_rooms(&["101"]);
        let mut store = store_with_sessions(vec![session("a", false, 9), session("b", false, 11)]);

        run(&mut store, &snapshot).unwrap();

        let table = store.timetable(&SectionId("s-3A".into())).unwrap();
        assert!(table
            .theory_sessions
            .iter()
            .all(|s| s.classroom == Some(ClassroomId("101".into()))));
    }
}
