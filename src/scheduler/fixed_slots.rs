use crate::error::Result;
use crate::scheduler::{require_step, StageReport, STAGE_FIXED_SLOTS};
use crate::store::ScheduleStore;
use crate::types::{
    check_window, Snapshot, StageSummary, Subject, TheorySession, TimeOfDay,
};
use std::collections::BTreeMap;

/// Stage S2: reserve pre-declared fixed slots (cross-departmental
/// electives) before anything else is placed.
///
/// Times arrive as user-supplied 12-hour strings and are converted
/// here; nothing downstream sees a 12-hour value.
pub fn run(store: &mut ScheduleStore, snapshot: &Snapshot) -> Result<StageReport> {
    require_step(store, STAGE_FIXED_SLOTS, 1)?;

    let mut fixed_subjects: Vec<&Subject> = snapshot
        .subjects
        .iter()
        .filter(|s| s.fixed_schedule.is_some())
        .collect();
    fixed_subjects.sort_by(|a, b| a.shortform.cmp(&b.shortform));

    let mut placed_per_section: BTreeMap<String, u32> = BTreeMap::new();
    let mut placed_total = 0u32;

    for subject in fixed_subjects {
        let slots = subject.fixed_schedule.as_ref().expect("filtered above");
        let sections = snapshot.sections_for_term(store.term);
        for section in sections
            .iter()
            .filter(|s| s.semester == subject.semester)
        {
            // Capability lookup: the declared theory assignment wins,
            // then any teacher listing the subject; external-dept
            // slots may legitimately have neither.
            let teacher = snapshot
                .assigned_teacher(&section.id, &subject.id)
                .cloned()
                .or_else(|| {
                    snapshot
                        .teachers_for_subject(&subject.id)
                        .first()
                        .map(|t| t.id.clone())
                });

            for slot in slots {
                let start = TimeOfDay::parse_12h(&slot.start)?;
                let end = TimeOfDay::parse_12h(&slot.end)?;
                check_window(start, end)?;

                let id = store.next_session_id(&section.name, 'T');
                let mut session = TheorySession {
                    id,
                    section: section.id.clone(),
                    subject: subject.id.clone(),
                    teacher: teacher.clone(),
                    classroom: None,
                    day: slot.day,
                    start,
                    end,
                    is_fixed: true,
                };

                // First placements cannot clash on rooms; a shared
                // coordinator teaching two sections at once is the one
                // way a clash can appear. The slot itself is
                // immovable, so the teacher reservation gives way.
                if store.add_theory_session(session.clone()).is_err() {
                    session.teacher = None;
                    store
                        .add_theory_session(session)
                        .expect("teacherless fixed slot holds no contested resource");
                }
                *placed_per_section.entry(section.name.clone()).or_default() += 1;
                placed_total += 1;
            }
        }
    }

    for timetable in store.timetables_mut() {
        let placed = placed_per_section
            .get(&timetable.section_name)
            .copied()
            .unwrap_or(0);
        timetable.record_stage(
            2,
            STAGE_FIXED_SLOTS,
            StageSummary {
                placed,
                flagged: 0,
                message: format!("{placed} fixed slots reserved"),
            },
        );
    }

    Ok(StageReport::success(
        STAGE_FIXED_SLOTS,
        format!("reserved {placed_total} fixed slots"),
        placed_total,
        0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::section_init;
    use crate::types::{
        Day, FixedSlot, Section, SectionId, SubjectId, Term,
    };

    fn oec(semester: u8) -> Subject {
        Subject {
            id: SubjectId("oec1".into()),
            shortform: "OEC".into(),
            name: "Open Elective".into(),
            semester,
            hours_per_week: 3.0,
            max_hours_per_day: 1.5,
            requires_teacher: false,
            is_project: false,
            is_open_elective: true,
            is_professional_elective: false,
            is_external_dept: true,
            fixed_schedule: Some(vec![FixedSlot {
                day: Day::Monday,
                start: "09:30 AM".into(),
                end: "11:00 AM".into(),
            }]),
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            sections: vec![Section {
                id: SectionId("s-7a".into()),
                name: "7A".into(),
                semester: 7,
                batch_count: 3,
            }],
            subjects: vec![oec(7)],
            labs: vec![],
            teachers: vec![],
            classrooms: vec![],
            lab_rooms: vec![],
            theory_assignments: vec![],
            lab_assignments: vec![],
        }
    }

    #[test]
    fn converts_12_hour_times_and_marks_fixed() {
        let snapshot = snapshot();
        let mut store = ScheduleStore::new(Term::Odd, "2025-26");
        section_init::run(&mut store, &snapshot).unwrap();
        run(&mut store, &snapshot).unwrap();

        let table = store.timetable(&SectionId("s-7a".into())).unwrap();
        assert_eq!(table.theory_sessions.len(), 1);
        let session = &table.theory_sessions[0];
        assert!(session.is_fixed);
        assert_eq!(session.start, TimeOfDay::from_hm(9, 30));
        assert_eq!(session.end, TimeOfDay::from_hm(11, 0));
        assert_eq!(session.duration_minutes(), 90);
        assert!(session.teacher.is_none());
    }

    #[test]
    fn refuses_to_run_before_section_init() {
        let snapshot = snapshot();
        let mut store = ScheduleStore::new(Term::Odd, "2025-26");
        assert!(run(&mut store, &snapshot).is_err());
    }
}
