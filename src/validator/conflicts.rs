use crate::store::ScheduleStore;
use crate::types::{overlaps, Day, SectionId, SessionId, Snapshot, TimeOfDay};
use crate::validator::{Conflict, Severity, Validate};
use itertools::Itertools;
use std::collections::BTreeMap;

pub const RULE_TEACHER_CONFLICT: &str = "TeacherConflict";
pub const RULE_CLASSROOM_CONFLICT: &str = "ClassroomConflict";
pub const RULE_LAB_ROOM_CONFLICT: &str = "LabRoomConflict";
pub const RULE_CONSECUTIVE_LABS: &str = "ConsecutiveLabs";

/// One booking of a resource, flattened out of a session
#[derive(Debug, Clone)]
struct Usage {
    session: SessionId,
    section: SectionId,
    day: Day,
    start: TimeOfDay,
    end: TimeOfDay,
}

/// Pairwise overlap scan over one resource's bookings.
///
/// The conflict identity is `(resource, day, earlier_start,
/// later_start)`: however many half-hour segments two sessions share,
/// they produce one finding.
fn scan_overlaps(rule: &'static str, kind: &str, usages: &BTreeMap<String, Vec<Usage>>) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for (resource_id, bookings) in usages {
        let mut sorted = bookings.clone();
        sorted.sort_by_key(|u| (u.day, u.start, u.session.clone()));
        for (a, b) in sorted.iter().tuple_combinations() {
            if a.day != b.day || a.session == b.session {
                continue;
            }
            if overlaps(a.start, a.end, b.start, b.end) {
                conflicts.push(Conflict {
                    rule,
                    severity: Severity::Error,
                    message: format!(
                        "{kind} '{resource_id}' double-booked on {}: {}-{} ({}, section {}) overlaps {}-{} ({}, section {})",
                        a.day, a.start, a.end, a.session, a.section, b.start, b.end, b.session, b.section
                    ),
                    identity: format!("{rule}:{resource_id}:{}:{}:{}", a.day, a.start, b.start),
                });
            }
        }
    }
    conflicts
}

/// Two distinct sessions sharing a teacher in overlapping time
pub struct TeacherConflicts;

impl Validate for TeacherConflicts {
    fn name(&self) -> &'static str {
        RULE_TEACHER_CONFLICT
    }

    fn validate(&self, store: &ScheduleStore, _snapshot: &Snapshot) -> Vec<Conflict> {
        let mut usages: BTreeMap<String, Vec<Usage>> = BTreeMap::new();
        for table in store.timetables() {
            for session in &table.theory_sessions {
                if let Some(teacher) = &session.teacher {
                    usages.entry(teacher.0.clone()).or_default().push(Usage {
                        session: session.id.clone(),
                        section: session.section.clone(),
                        day: session.day,
                        start: session.start,
                        end: session.end,
                    });
                }
            }
            for session in &table.lab_sessions {
                for batch in &session.batches {
                    for teacher in batch.teachers() {
                        usages.entry(teacher.0.clone()).or_default().push(Usage {
                            session: session.id.clone(),
                            section: session.section.clone(),
                            day: session.day,
                            start: session.start,
                            end: session.end,
                        });
                    }
                }
            }
        }
        scan_overlaps(RULE_TEACHER_CONFLICT, "Teacher", &usages)
    }
}

/// Two distinct sessions sharing a classroom in overlapping time
pub struct ClassroomConflicts;

impl Validate for ClassroomConflicts {
    fn name(&self) -> &'static str {
        RULE_CLASSROOM_CONFLICT
    }

    fn validate(&self, store: &ScheduleStore, _snapshot: &Snapshot) -> Vec<Conflict> {
        let mut usages: BTreeMap<String, Vec<Usage>> = BTreeMap::new();
        for session in store.all_theory_sessions() {
            if let Some(classroom) = &session.classroom {
                usages.entry(classroom.0.clone()).or_default().push(Usage {
                    session: session.id.clone(),
                    section: session.section.clone(),
                    day: session.day,
                    start: session.start,
                    end: session.end,
                });
            }
        }
        scan_overlaps(RULE_CLASSROOM_CONFLICT, "Classroom", &usages)
    }
}

/// Two distinct lab batches sharing a lab room in overlapping time
pub struct LabRoomConflicts;

impl Validate for LabRoomConflicts {
    fn name(&self) -> &'static str {
        RULE_LAB_ROOM_CONFLICT
    }

    fn validate(&self, store: &ScheduleStore, _snapshot: &Snapshot) -> Vec<Conflict> {
        let mut usages: BTreeMap<String, Vec<Usage>> = BTreeMap::new();
        for session in store.all_lab_sessions() {
            for batch in &session.batches {
                usages.entry(batch.lab_room.0.clone()).or_default().push(Usage {
                    session: session.id.clone(),
                    section: session.section.clone(),
                    day: session.day,
                    start: session.start,
                    end: session.end,
                });
            }
        }
        scan_overlaps(RULE_LAB_ROOM_CONFLICT, "Lab room", &usages)
    }
}

/// Back-to-back lab sessions of one section on one day
pub struct ConsecutiveLabs;

impl Validate for ConsecutiveLabs {
    fn name(&self) -> &'static str {
        RULE_CONSECUTIVE_LABS
    }

    fn validate(&self, store: &ScheduleStore, _snapshot: &Snapshot) -> Vec<Conflict> {
        let mut conflicts = Vec::new();
        for table in store.timetables() {
            let mut sessions: Vec<_> = table.lab_sessions.iter().collect();
            sessions.sort_by_key(|s| (s.day, s.start));
            for window in sessions.windows(2) {
                let (earlier, later) = (window[0], window[1]);
                if earlier.day == later.day && earlier.end == later.start {
                    conflicts.push(Conflict {
                        rule: RULE_CONSECUTIVE_LABS,
                        severity: Severity::Error,
                        message: format!(
                            "Section {} has consecutive lab sessions on {}: {} ends {} as {} begins",
                            table.section_name, earlier.day, earlier.id, earlier.end, later.id
                        ),
                        identity: format!(
                            "{RULE_CONSECUTIVE_LABS}:{}:{}:{}:{}",
                            table.section_id, earlier.day, earlier.start, later.start
                        ),
                    });
                }
            }
        }
        conflicts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        BatchAssignment, LabId, LabRoomId, LabSession, SubjectId, TeacherId, TeacherStatus, Term,
        TheorySession, Timetable,
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

    fn store_with_two_theory(overlap: bool) -> ScheduleStore {
        let mut store = ScheduleStore::new(Term::Odd, "2025-26");
        for name in ["3A", "3B"] {
            store.insert_timetable(Timetable::new(
                SectionId(format!("s-{name}")),
                name.into(),
                3,
                "2025-26".into(),
            ));
        }
        let start_b = if overlap { hm(10, 30) } else { hm(14, 0) };
        for (n, (section, start)) in [("3A", hm(10, 0)), ("3B", start_b)].iter().enumerate() {
            let session = TheorySession {
                id: SessionId(format!("t{n}")),
                section: SectionId(format!("s-{section}")),
                subject: SubjectId("sub".into()),
                teacher: Some(TeacherId("t1".into())),
                classroom: None,
                day: Day::Monday,
                start: *start,
                end: start.plus_minutes(60),
                is_fixed: false,
            };
            let table = store.timetable_mut(&session.section.clone()).unwrap();
            table.theory_sessions.push(session);
        }
        store.rebuild_occupancy();
        store
    }

    #[test]
    fn detects_teacher_overlap_once_per_pair() {
        let store = store_with_two_theory(true);
        let conflicts = TeacherConflicts.validate(&store, &empty_snapshot());
        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0].message.contains("t1"));
    }

    #[test]
    fn disjoint_windows_are_clean() {
        let store = store_with_two_theory(false);
        assert!(TeacherConflicts
            .validate(&store, &empty_snapshot())
            .is_empty());
    }

    #[test]
    fn detects_consecutive_labs() {
        let mut store = ScheduleStore::new(Term::Odd, "2025-26");
        store.insert_timetable(Timetable::new(
            SectionId("s-3A".into()),
            "3A".into(),
            3,
            "2025-26".into(),
        ));
        for (n, start) in [hm(8, 0), hm(10, 0)].iter().enumerate() {
            let session = LabSession {
                id: SessionId(format!("l{n}")),
                section: SectionId("s-3A".into()),
                day: Day::Tuesday,
                start: *start,
                end: start.plus_minutes(120),
                batches: vec![BatchAssignment {
                    batch_number: 1,
                    lab: LabId("lab".into()),
                    lab_room: LabRoomId(format!("r{n}")),
                    teacher1: None,
                    teacher2: None,
                    teacher_status: TeacherStatus::NoTeachers,
                }],
            };
            store
                .timetable_mut(&SectionId("s-3A".into()))
                .unwrap()
                .lab_sessions
                .push(session);
        }
        store.rebuild_occupancy();

        let conflicts = ConsecutiveLabs.validate(&store, &empty_snapshot());
        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0].message.contains("consecutive"));
    }
}
