mod occupancy;

pub use occupancy::*;

use crate::types::{
    Day, LabSession, SectionId, SessionId, Term, TheorySession, Timetable, TimeOfDay,
};
use std::collections::BTreeMap;

/// Resources a theory session holds (present ones only)
pub fn theory_resources(session: &TheorySession) -> Vec<Resource> {
    let mut resources = Vec::with_capacity(2);
    if let Some(teacher) = &session.teacher {
        resources.push(Resource::Teacher(teacher.clone()));
    }
    if let Some(classroom) = &session.classroom {
        resources.push(Resource::Classroom(classroom.clone()));
    }
    resources
}

/// Resources a lab session holds: every batch's room and teachers
pub fn lab_resources(session: &LabSession) -> Vec<Resource> {
    let mut resources = Vec::with_capacity(9);
    for batch in &session.batches {
        resources.push(Resource::LabRoom(batch.lab_room.clone()));
        for teacher in batch.teachers() {
            resources.push(Resource::Teacher(teacher.clone()));
        }
    }
    resources
}

/// Single source of truth for all scheduled sessions of one
/// generation run, plus the shared occupancy index.
///
/// Timetables sit in sorted-section order fixed at stage S1; every
/// mutation that changes timing or resource identity goes through a
/// store method so the occupancy index stays consistent.
#[derive(Debug, Clone)]
pub struct ScheduleStore {
    pub term: Term,
    pub academic_year: String,
    timetables: Vec<Timetable>,
    index: BTreeMap<SectionId, usize>,
    pub occupancy: ResourceOccupancy,
    next_session: u32,
}

impl ScheduleStore {
    pub fn new(term: Term, academic_year: impl Into<String>) -> Self {
        Self {
            term,
            academic_year: academic_year.into(),
            timetables: Vec::new(),
            index: BTreeMap::new(),
            occupancy: ResourceOccupancy::new(),
            next_session: 0,
        }
    }

    pub fn insert_timetable(&mut self, timetable: Timetable) {
        self.index
            .insert(timetable.section_id.clone(), self.timetables.len());
        self.timetables.push(timetable);
    }

    pub fn timetables(&self) -> &[Timetable] {
        &self.timetables
    }

    pub fn timetables_mut(&mut self) -> &mut [Timetable] {
        &mut self.timetables
    }

    pub fn timetable(&self, section: &SectionId) -> Option<&Timetable> {
        self.index.get(section).map(|&i| &self.timetables[i])
    }

    pub fn timetable_mut(&mut self, section: &SectionId) -> Option<&mut Timetable> {
        self.index.get(section).map(|&i| &mut self.timetables[i])
    }

    /// Lowest completed step across all timetables; stage
    /// preconditions check against this.
    pub fn min_step(&self) -> u8 {
        self.timetables
            .iter()
            .map(|t| t.generation_metadata.current_step)
            .min()
            .unwrap_or(0)
    }

    /// Fresh session id: "<section>-T07" / "<section>-L02"
    pub fn next_session_id(&mut self, section_name: &str, kind: char) -> SessionId {
        self.next_session += 1;
        SessionId(format!("{section_name}-{kind}{:03}", self.next_session))
    }

    /// Reserve every resource the session holds, then append it.
    /// All-or-nothing: a clash rolls back prior reservations.
    pub fn add_theory_session(&mut self, session: TheorySession) -> Result<(), OccupancyClash> {
        self.reserve_all(
            &theory_resources(&session),
            session.day,
            session.start,
            session.end,
            &session.id,
        )?;
        let table = self
            .timetable_mut(&session.section.clone())
            .expect("section initialized in S1");
        table.theory_sessions.push(session);
        Ok(())
    }

    pub fn add_lab_session(&mut self, session: LabSession) -> Result<(), OccupancyClash> {
        self.reserve_all(
            &lab_resources(&session),
            session.day,
            session.start,
            session.end,
            &session.id,
        )?;
        let table = self
            .timetable_mut(&session.section.clone())
            .expect("section initialized in S1");
        table.lab_sessions.push(session);
        Ok(())
    }

    fn reserve_all(
        &mut self,
        resources: &[Resource],
        day: Day,
        start: TimeOfDay,
        end: TimeOfDay,
        owner: &SessionId,
    ) -> Result<(), OccupancyClash> {
        for (i, resource) in resources.iter().enumerate() {
            if let Err(clash) = self.occupancy.reserve(resource, day, start, end, owner) {
                for reserved in &resources[..i] {
                    self.occupancy.release(reserved, day, start, end, owner);
                }
                return Err(clash);
            }
        }
        Ok(())
    }

    /// Attach a classroom to a placed theory session, reserving it
    pub fn set_classroom(
        &mut self,
        section: &SectionId,
        session_id: &SessionId,
        classroom: crate::types::ClassroomId,
    ) -> Result<(), OccupancyClash> {
        let (day, start, end) = {
            let session = self
                .timetable(section)
                .and_then(|t| t.theory_session(session_id))
                .expect("session exists");
            (session.day, session.start, session.end)
        };
        self.occupancy.reserve(
            &Resource::Classroom(classroom.clone()),
            day,
            start,
            end,
            session_id,
        )?;
        let table = self.timetable_mut(section).expect("section exists");
        let session = table
            .theory_sessions
            .iter_mut()
            .find(|s| &s.id == session_id)
            .expect("session exists");
        session.classroom = Some(classroom);
        Ok(())
    }

    /// Attach a supervising teacher to a lab batch, reserving them
    pub fn add_batch_teacher(
        &mut self,
        section: &SectionId,
        session_id: &SessionId,
        batch_number: u8,
        teacher: crate::types::TeacherId,
    ) -> Result<(), OccupancyClash> {
        let (day, start, end) = {
            let session = self
                .timetable(section)
                .and_then(|t| t.lab_session(session_id))
                .expect("session exists");
            (session.day, session.start, session.end)
        };
        self.occupancy.reserve(
            &Resource::Teacher(teacher.clone()),
            day,
            start,
            end,
            session_id,
        )?;
        let table = self.timetable_mut(section).expect("section exists");
        let session = table
            .lab_sessions
            .iter_mut()
            .find(|s| &s.id == session_id)
            .expect("session exists");
        let batch = session
            .batches
            .iter_mut()
            .find(|b| b.batch_number == batch_number)
            .expect("batch exists");
        if batch.teacher1.is_none() {
            batch.teacher1 = Some(teacher);
        } else {
            batch.teacher2 = Some(teacher);
        }
        batch.teacher_status = crate::types::TeacherStatus::of(&batch.teacher1, &batch.teacher2);
        Ok(())
    }

    /// Atomic retiming of a theory session: release old segments,
    /// reserve the new window for every attached resource, roll back
    /// on any clash.
    pub fn move_theory_session(
        &mut self,
        section: &SectionId,
        session_id: &SessionId,
        new_day: Day,
        new_start: TimeOfDay,
    ) -> Result<(), OccupancyClash> {
        let (resources, old_day, old_start, old_end, duration) = {
            let session = self
                .timetable(section)
                .and_then(|t| t.theory_session(session_id))
                .expect("session exists");
            (
                theory_resources(session),
                session.day,
                session.start,
                session.end,
                session.duration_minutes(),
            )
        };
        let new_end = new_start.plus_minutes(duration);

        for resource in &resources {
            self.occupancy
                .release(resource, old_day, old_start, old_end, session_id);
        }
        match self.reserve_all(&resources, new_day, new_start, new_end, session_id) {
            Ok(()) => {
                let table = self.timetable_mut(section).expect("section exists");
                let session = table
                    .theory_sessions
                    .iter_mut()
                    .find(|s| &s.id == session_id)
                    .expect("session exists");
                session.day = new_day;
                session.start = new_start;
                session.end = new_end;
                Ok(())
            }
            Err(clash) => {
                // The old segments were exclusively ours; restore them
                for resource in &resources {
                    self.occupancy
                        .occupy(resource, old_day, old_start, old_end, session_id);
                }
                Err(clash)
            }
        }
    }

    pub fn move_lab_session(
        &mut self,
        section: &SectionId,
        session_id: &SessionId,
        new_day: Day,
        new_start: TimeOfDay,
    ) -> Result<(), OccupancyClash> {
        let (resources, old_day, old_start, old_end, duration) = {
            let session = self
                .timetable(section)
                .and_then(|t| t.lab_session(session_id))
                .expect("session exists");
            (
                lab_resources(session),
                session.day,
                session.start,
                session.end,
                session.duration_minutes(),
            )
        };
        let new_end = new_start.plus_minutes(duration);

        for resource in &resources {
            self.occupancy
                .release(resource, old_day, old_start, old_end, session_id);
        }
        match self.reserve_all(&resources, new_day, new_start, new_end, session_id) {
            Ok(()) => {
                let table = self.timetable_mut(section).expect("section exists");
                let session = table
                    .lab_sessions
                    .iter_mut()
                    .find(|s| &s.id == session_id)
                    .expect("session exists");
                session.day = new_day;
                session.start = new_start;
                session.end = new_end;
                Ok(())
            }
            Err(clash) => {
                for resource in &resources {
                    self.occupancy
                        .occupy(resource, old_day, old_start, old_end, session_id);
                }
                Err(clash)
            }
        }
    }

    /// Retiming that tolerates conflicts in the target window.
    /// Refiner working copies use this; the index keeps counting
    /// overlaps so fitness stays truthful.
    pub fn force_move_theory_session(
        &mut self,
        section: &SectionId,
        session_id: &SessionId,
        new_day: Day,
        new_start: TimeOfDay,
    ) {
        let (resources, old_day, old_start, old_end, duration) = {
            let session = self
                .timetable(section)
                .and_then(|t| t.theory_session(session_id))
                .expect("session exists");
            (
                theory_resources(session),
                session.day,
                session.start,
                session.end,
                session.duration_minutes(),
            )
        };
        let new_end = new_start.plus_minutes(duration);
        for resource in &resources {
            self.occupancy
                .release(resource, old_day, old_start, old_end, session_id);
            self.occupancy
                .occupy(resource, new_day, new_start, new_end, session_id);
        }
        let table = self.timetable_mut(section).expect("section exists");
        let session = table
            .theory_sessions
            .iter_mut()
            .find(|s| &s.id == session_id)
            .expect("session exists");
        session.day = new_day;
        session.start = new_start;
        session.end = new_end;
    }

    pub fn force_move_lab_session(
        &mut self,
        section: &SectionId,
        session_id: &SessionId,
        new_day: Day,
        new_start: TimeOfDay,
    ) {
        let (resources, old_day, old_start, old_end, duration) = {
            let session = self
                .timetable(section)
                .and_then(|t| t.lab_session(session_id))
                .expect("session exists");
            (
                lab_resources(session),
                session.day,
                session.start,
                session.end,
                session.duration_minutes(),
            )
        };
        let new_end = new_start.plus_minutes(duration);
        for resource in &resources {
            self.occupancy
                .release(resource, old_day, old_start, old_end, session_id);
            self.occupancy
                .occupy(resource, new_day, new_start, new_end, session_id);
        }
        let table = self.timetable_mut(section).expect("section exists");
        let session = table
            .lab_sessions
            .iter_mut()
            .find(|s| &s.id == session_id)
            .expect("session exists");
        session.day = new_day;
        session.start = new_start;
        session.end = new_end;
    }

    /// Reconstruct the occupancy index from the sessions. Conflicting
    /// schedules index every occupant; nothing is dropped.
    pub fn rebuild_occupancy(&mut self) {
        self.occupancy.clear();
        for table in &self.timetables {
            for session in &table.theory_sessions {
                for resource in theory_resources(session) {
                    self.occupancy.occupy(
                        &resource,
                        session.day,
                        session.start,
                        session.end,
                        &session.id,
                    );
                }
            }
            for session in &table.lab_sessions {
                for resource in lab_resources(session) {
                    self.occupancy.occupy(
                        &resource,
                        session.day,
                        session.start,
                        session.end,
                        &session.id,
                    );
                }
            }
        }
    }

    /// All theory sessions across sections, in store order
    pub fn all_theory_sessions(&self) -> impl Iterator<Item = &TheorySession> {
        self.timetables.iter().flat_map(|t| t.theory_sessions.iter())
    }

    pub fn all_lab_sessions(&self) -> impl Iterator<Item = &LabSession> {
        self.timetables.iter().flat_map(|t| t.lab_sessions.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SubjectId, TeacherId};

    fn hm(h: u16, m: u16) -> TimeOfDay {
        TimeOfDay::from_hm(h, m)
    }

    fn store_with_section(name: &str) -> (ScheduleStore, SectionId) {
        let mut store = ScheduleStore::new(Term::Odd, "2025-26");
        let id = SectionId(format!("s-{name}"));
        store.insert_timetable(Timetable::new(id.clone(), name.into(), 3, "2025-26".into()));
        (store, id)
    }

    fn theory(store: &mut ScheduleStore, section: &SectionId, teacher: &str, day: Day, h: u16) -> TheorySession {
        TheorySession {
            id: store.next_session_id("3A", 'T'),
            section: section.clone(),
            subject: SubjectId("sub".into()),
            teacher: Some(TeacherId(teacher.into())),
            classroom: None,
            day,
            start: hm(h, 0),
            end: hm(h + 1, 0),
            is_fixed: false,
        }
    }

    #[test]
    fn add_rejects_teacher_double_booking() {
        let (mut store, section) = store_with_section("3A");
        let first = theory(&mut store, &section, "t1", Day::Monday, 9);
        store.add_theory_session(first).unwrap();

        let second = theory(&mut store, &section, "t1", Day::Monday, 9);
        assert!(store.add_theory_session(second).is_err());
        assert_eq!(store.timetable(&section).unwrap().theory_sessions.len(), 1);
    }

    #[test]
    fn move_rolls_back_on_clash() {
        let (mut store, section) = store_with_section("3A");
        let blocker = theory(&mut store, &section, "t1", Day::Tuesday, 10);
        let mover = theory(&mut store, &section, "t1", Day::Monday, 9);
        let mover_id = mover.id.clone();
        store.add_theory_session(blocker).unwrap();
        store.add_theory_session(mover).unwrap();

        // Target window clashes with the blocker's teacher booking
        let err = store.move_theory_session(&section, &mover_id, Day::Tuesday, hm(10, 0));
        assert!(err.is_err());

        // Session and occupancy unchanged
        let session = store
            .timetable(&section)
            .unwrap()
            .theory_session(&mover_id)
            .unwrap();
        assert_eq!(session.day, Day::Monday);
        assert_eq!(session.start, hm(9, 0));
        assert!(!store.occupancy.is_free(
            &Resource::Teacher(TeacherId("t1".into())),
            Day::Monday,
            hm(9, 0),
            hm(10, 0)
        ));
    }

    #[test]
    fn successful_move_frees_the_old_window() {
        let (mut store, section) = store_with_section("3A");
        let session = theory(&mut store, &section, "t1", Day::Monday, 9);
        let id = session.id.clone();
        store.add_theory_session(session).unwrap();

        store
            .move_theory_session(&section, &id, Day::Thursday, hm(14, 0))
            .unwrap();

        let teacher = Resource::Teacher(TeacherId("t1".into()));
        assert!(store.occupancy.is_free(&teacher, Day::Monday, hm(9, 0), hm(10, 0)));
        assert!(!store.occupancy.is_free(&teacher, Day::Thursday, hm(14, 0), hm(15, 0)));
    }

    #[test]
    fn rebuild_matches_incremental_index() {
        let (mut store, section) = store_with_section("3A");
        let a = theory(&mut store, &section, "t1", Day::Monday, 9);
        let b = theory(&mut store, &section, "t2", Day::Monday, 9);
        store.add_theory_session(a).unwrap();
        store.add_theory_session(b).unwrap();

        let before = store.occupancy.overlap_pairs();
        store.rebuild_occupancy();
        assert_eq!(store.occupancy.overlap_pairs(), before);
        assert!(!store.occupancy.is_free(
            &Resource::Teacher(TeacherId("t2".into())),
            Day::Monday,
            hm(9, 0),
            hm(10, 0)
        ));
    }
}
